//! Per-round countdown.
//!
//! The timer only tracks the deadline; the session controller decides what
//! a fired deadline means and when to rearm.

use std::time::Duration;
use tokio::time::Instant;

/// State of the round countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Loading, or the session is no longer in progress.
    Idle,
    Running { deadline: Instant },
}

#[derive(Debug, Clone)]
pub struct RoundTimer {
    duration: Duration,
    state: TimerState,
}

impl RoundTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: TimerState::Idle,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    /// Start a fresh round from now. Also used to rearm a running timer.
    pub fn arm(&mut self) -> Instant {
        let deadline = Instant::now() + self.duration;
        self.state = TimerState::Running { deadline };
        deadline
    }

    /// Rearm after a query batch or a processed timeout.
    pub fn rearm(&mut self) -> Instant {
        self.arm()
    }

    pub fn disarm(&mut self) {
        self.state = TimerState::Idle;
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Running { deadline } => Some(deadline),
            TimerState::Idle => None,
        }
    }

    /// Time left in the round, zero once the deadline passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline().is_some_and(|d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_arm_and_expire() {
        let mut timer = RoundTimer::new(Duration::from_secs(60));
        assert_eq!(timer.state(), TimerState::Idle);
        assert!(!timer.is_expired());

        let deadline = timer.arm();
        assert_eq!(timer.deadline(), Some(deadline));
        assert_eq!(timer.remaining(), Some(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!timer.is_expired());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(timer.is_expired());
        assert_eq!(timer.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_moves_deadline() {
        let mut timer = RoundTimer::new(Duration::from_secs(180));
        let first = timer.arm();
        tokio::time::advance(Duration::from_secs(100)).await;
        let second = timer.rearm();
        assert_eq!(second - first, Duration::from_secs(100));

        timer.disarm();
        assert!(!timer.is_running());
        assert_eq!(timer.deadline(), None);
    }
}
