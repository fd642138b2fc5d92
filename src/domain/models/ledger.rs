//! Query budget ledger.
//!
//! Tracks how much of a task's query budget has been consumed. Real queries
//! are counted by the oracle and reconciled here from its cumulative total;
//! timeouts are charged locally as failed queries. `queries_used` is the sum
//! of both and never exceeds `total_queries`.

use serde::{Deserialize, Serialize};

use crate::domain::errors::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLedger {
    total_queries: u32,
    query_batch_size: u32,
    /// Real queries, as confirmed by the oracle
    confirmed: u32,
    /// Queries charged by round timeouts
    failed: u32,
}

impl QueryLedger {
    pub fn new(total_queries: u32, query_batch_size: u32) -> Self {
        Self {
            total_queries,
            query_batch_size,
            confirmed: 0,
            failed: 0,
        }
    }

    pub fn total_queries(&self) -> u32 {
        self.total_queries
    }

    pub fn query_batch_size(&self) -> u32 {
        self.query_batch_size
    }

    pub fn queries_used(&self) -> u32 {
        self.confirmed + self.failed
    }

    pub fn failed_queries(&self) -> u32 {
        self.failed
    }

    pub fn remaining(&self) -> u32 {
        self.total_queries.saturating_sub(self.queries_used())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// True iff `0 < size <= min(query_batch_size, remaining)`.
    pub fn can_submit_batch(&self, size: u32) -> bool {
        size > 0 && size <= self.query_batch_size.min(self.remaining())
    }

    /// Like [`can_submit_batch`](Self::can_submit_batch), naming the violated limit.
    pub fn check_batch(&self, size: u32) -> Result<(), SessionError> {
        if size == 0 {
            return Err(SessionError::EmptyBatch);
        }
        if size > self.query_batch_size {
            return Err(SessionError::BatchTooLarge {
                size,
                limit: self.query_batch_size,
            });
        }
        self.check_budget(size)
    }

    fn check_budget(&self, n: u32) -> Result<(), SessionError> {
        if n > self.remaining() {
            return Err(SessionError::OutOfBudget {
                requested: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Charge `n` successful queries.
    pub fn record_batch(&mut self, n: u32) -> Result<(), SessionError> {
        self.check_budget(n)?;
        self.confirmed += n;
        Ok(())
    }

    /// Charge `n` failed queries.
    pub fn record_failed_batch(&mut self, n: u32) -> Result<(), SessionError> {
        self.check_budget(n)?;
        self.failed += n;
        Ok(())
    }

    /// Adopt the oracle's cumulative count of real queries.
    ///
    /// Returns how many queries the reconciliation added. A count that goes
    /// backwards or overdraws the budget leaves the ledger untouched.
    pub fn reconcile_confirmed(&mut self, reported: u32) -> Result<u32, SessionError> {
        if reported < self.confirmed {
            return Err(SessionError::InconsistentOracle(format!(
                "reported {reported} queries used, already confirmed {}",
                self.confirmed
            )));
        }
        let delta = reported - self.confirmed;
        if delta > self.remaining() {
            return Err(SessionError::InconsistentOracle(format!(
                "reported {reported} queries used, which overdraws the budget of {} ({} lost to timeouts)",
                self.total_queries, self.failed
            )));
        }
        self.confirmed = reported;
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_ledger() {
        let ledger = QueryLedger::new(10, 3);
        assert_eq!(ledger.queries_used(), 0);
        assert_eq!(ledger.failed_queries(), 0);
        assert_eq!(ledger.remaining(), 10);
        assert!(!ledger.is_exhausted());
    }

    #[test]
    fn test_can_submit_batch_bounds() {
        let mut ledger = QueryLedger::new(10, 3);
        assert!(!ledger.can_submit_batch(0));
        assert!(ledger.can_submit_batch(1));
        assert!(ledger.can_submit_batch(3));
        assert!(!ledger.can_submit_batch(4));

        ledger.record_batch(8).unwrap();
        assert!(ledger.can_submit_batch(2));
        assert!(!ledger.can_submit_batch(3));
    }

    #[test]
    fn test_check_batch_names_violation() {
        let mut ledger = QueryLedger::new(10, 3);
        assert!(matches!(ledger.check_batch(0), Err(SessionError::EmptyBatch)));
        assert!(matches!(
            ledger.check_batch(4),
            Err(SessionError::BatchTooLarge { size: 4, limit: 3 })
        ));
        ledger.record_failed_batch(9).unwrap();
        assert!(matches!(
            ledger.check_batch(2),
            Err(SessionError::OutOfBudget { requested: 2, remaining: 1 })
        ));
    }

    #[test]
    fn test_overdraw_is_rejected_not_clamped() {
        let mut ledger = QueryLedger::new(5, 3);
        ledger.record_batch(3).unwrap();
        let err = ledger.record_failed_batch(3).unwrap_err();
        assert!(matches!(err, SessionError::OutOfBudget { requested: 3, remaining: 2 }));
        assert_eq!(ledger.queries_used(), 3);
        assert_eq!(ledger.failed_queries(), 0);
    }

    #[test]
    fn test_reconcile_keeps_timeouts() {
        let mut ledger = QueryLedger::new(10, 3);
        assert_eq!(ledger.reconcile_confirmed(3).unwrap(), 3);
        ledger.record_failed_batch(3).unwrap();
        assert_eq!(ledger.reconcile_confirmed(5).unwrap(), 2);
        assert_eq!(ledger.queries_used(), 8);
        assert_eq!(ledger.failed_queries(), 3);

        // Retried call reporting the same total does not double count
        assert_eq!(ledger.reconcile_confirmed(5).unwrap(), 0);
        assert_eq!(ledger.queries_used(), 8);
    }

    #[test]
    fn test_reconcile_rejects_inconsistent_totals() {
        let mut ledger = QueryLedger::new(10, 3);
        ledger.reconcile_confirmed(4).unwrap();
        assert!(matches!(
            ledger.reconcile_confirmed(2),
            Err(SessionError::InconsistentOracle(_))
        ));
        ledger.record_failed_batch(3).unwrap();
        assert!(matches!(
            ledger.reconcile_confirmed(8),
            Err(SessionError::InconsistentOracle(_))
        ));
        assert_eq!(ledger.queries_used(), 7);
    }

    #[derive(Debug, Clone)]
    enum Charge {
        Query(u32),
        Timeout(u32),
    }

    fn charge() -> impl Strategy<Value = Charge> {
        prop_oneof![
            (0u32..6).prop_map(Charge::Query),
            (0u32..6).prop_map(Charge::Timeout),
        ]
    }

    proptest! {
        #[test]
        fn prop_used_is_sum_of_accepted_charges(
            total in 1u32..40,
            batch in 1u32..6,
            charges in proptest::collection::vec(charge(), 0..30),
        ) {
            let mut ledger = QueryLedger::new(total, batch);
            let mut accepted = 0u32;
            let mut accepted_failed = 0u32;
            let mut all_timeouts = true;

            for c in charges {
                match c {
                    Charge::Query(n) => {
                        if ledger.check_batch(n).is_ok() {
                            ledger.record_batch(n).unwrap();
                            accepted += n;
                            if n > 0 { all_timeouts = false; }
                        }
                    }
                    Charge::Timeout(n) => {
                        if ledger.record_failed_batch(n).is_ok() {
                            accepted += n;
                            accepted_failed += n;
                        }
                    }
                }
                prop_assert!(ledger.queries_used() <= total);
                prop_assert!(ledger.failed_queries() <= ledger.queries_used());
            }

            prop_assert_eq!(ledger.queries_used(), accepted);
            prop_assert_eq!(ledger.failed_queries(), accepted_failed);
            prop_assert_eq!(ledger.remaining(), total - accepted);
            if all_timeouts {
                prop_assert_eq!(ledger.failed_queries(), ledger.queries_used());
            }
        }
    }
}
