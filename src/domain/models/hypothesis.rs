//! Hypothesis submission gate and verdict taxonomy.

use serde::{Deserialize, Serialize};

use crate::domain::errors::SessionError;

/// Three-way classification of a judged hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
    /// Too vague or ambiguous for the oracle to judge
    Vague,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
            Self::Vague => "vague",
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Correct)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Markers in an oracle explanation that flag a hypothesis as too vague.
const VAGUE_MARKERS: [&str; 2] = ["vague", "ambiguous"];

/// Enforces one hypothesis per round and classifies oracle feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisGate {
    last_action_was_hypothesis: bool,
}

impl HypothesisGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_action_was_hypothesis(&self) -> bool {
        self.last_action_was_hypothesis
    }

    /// Whether `text` may be submitted with `remaining` queries left.
    ///
    /// A zero budget always permits the forced final attempt.
    pub fn can_submit(&self, text: &str, remaining: u32) -> bool {
        self.check(text, remaining).is_ok()
    }

    pub fn check(&self, text: &str, remaining: u32) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::BlankHypothesis);
        }
        if self.last_action_was_hypothesis && remaining > 0 {
            return Err(SessionError::HypothesisOutOfTurn);
        }
        Ok(())
    }

    /// Classify the oracle's judgment.
    ///
    /// The explanation is sniffed case-insensitively for [`VAGUE_MARKERS`];
    /// this is a contract with the oracle's wording, not semantic analysis.
    pub fn classify(success: bool, explanation: &str) -> Verdict {
        if success {
            return Verdict::Correct;
        }
        let lowered = explanation.to_lowercase();
        if VAGUE_MARKERS.iter().any(|m| lowered.contains(m)) {
            Verdict::Vague
        } else {
            Verdict::Incorrect
        }
    }

    pub fn record_hypothesis(&mut self) {
        self.last_action_was_hypothesis = true;
    }

    pub fn record_query(&mut self) {
        self.last_action_was_hypothesis = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            HypothesisGate::classify(false, "That's too vague to be a real rule"),
            Verdict::Vague
        );
        assert_eq!(
            HypothesisGate::classify(false, "Off by one on negative inputs"),
            Verdict::Incorrect
        );
        assert_eq!(
            HypothesisGate::classify(false, "NO. The hypothesis is AMBIGUOUS about zero."),
            Verdict::Vague
        );
        assert_eq!(
            HypothesisGate::classify(true, "vague but accepted"),
            Verdict::Correct
        );
        assert_eq!(HypothesisGate::classify(true, ""), Verdict::Correct);
    }

    #[test]
    fn test_alternation() {
        let mut gate = HypothesisGate::new();
        assert!(gate.can_submit("primes", 5));

        gate.record_hypothesis();
        assert!(matches!(
            gate.check("primes", 5),
            Err(SessionError::HypothesisOutOfTurn)
        ));
        // Forced final attempt on an exhausted budget
        assert!(gate.can_submit("primes", 0));

        gate.record_query();
        assert!(gate.can_submit("primes", 5));
    }

    #[test]
    fn test_blank_text_rejected() {
        let gate = HypothesisGate::new();
        assert!(matches!(gate.check("   \n", 5), Err(SessionError::BlankHypothesis)));
        assert!(!gate.can_submit("", 0));
    }
}
