//! Participant-facing task briefing.

use serde_json::Value;

use crate::domain::models::{SampleCases, TaskSession};

const TASK_TEXT: &str = "TASK:
Your goal is to discover the hidden rule by making strategic queries. The hidden rule can be numerical or string-based. None of the rules rely on meanings, semantics, or real world context. Numbers are to be interpreted mathematically, and strings are to be interpreted as a sequence of lexicographic characters.
You'll learn through observation - each query reveals the output for that input.";

const STRATEGY_GUIDELINES: &str = "STRATEGY GUIDELINES:
- Start by querying a wide set of examples to gather information about the function
- Convert observations into a set of hypotheses about the structure of the function
- Refine your hypotheses with strategic queries
- Actively seek disconfirming evidence
- When you think you know the rule, test corner cases that could break it
- Choose queries that maximally reduce uncertainty
- Prefer simpler explanations over complex ones";

/// Render an oracle output the way it is shown to participants.
///
/// Strings are shown bare, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The task prompt shown to the participant before the first query.
pub fn task_prompt(session: &TaskSession) -> String {
    format!(
        "Discover the hidden rule through strategic queries.\n\n\
         Input: {}\n\
         Output: {}\n\
         Query budget: {}\n\
         Batch limit: up to {} input(s) per query call. You must not exceed this limit.\n\n\
         {TASK_TEXT}\n\n\
         {STRATEGY_GUIDELINES}",
        session.input_spec,
        session.output_spec,
        session.total_queries(),
        session.query_batch_size(),
    )
}

/// The "Sample pairs" block, in the order the oracle supplied them.
pub fn sample_pairs(samples: &SampleCases) -> String {
    if samples.is_empty() {
        return "No sample cases provided.".to_string();
    }
    let pairs: Vec<String> = samples
        .iter()
        .map(|(input, output)| format!("{input} → {}", display_value(output)))
        .collect();
    format!("Sample pairs:\n{}", pairs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{TaskCategory, TaskDescriptor};
    use crate::domain::ports::StartTaskResponse;
    use serde_json::json;

    #[test]
    fn test_sample_pairs_keep_order() {
        let mut samples = SampleCases::new();
        samples.insert("9".into(), json!(1));
        samples.insert("2".into(), json!(0));
        samples.insert("abc".into(), json!("cba"));

        assert_eq!(sample_pairs(&samples), "Sample pairs:\n9 → 1\n2 → 0\nabc → cba");
        assert_eq!(sample_pairs(&SampleCases::new()), "No sample cases provided.");
    }

    #[test]
    fn test_task_prompt_header() {
        let descriptor = TaskDescriptor::new("rev", TaskCategory::Lexical, 12, 4);
        let session = TaskSession::from_start(
            &descriptor,
            StartTaskResponse {
                session_id: "s".into(),
                input_spec: "A lowercase word".into(),
                output_spec: "A lowercase word".into(),
                sample_cases: SampleCases::new(),
                test_cases_count: 0,
                total_queries: 12,
                query_batch_size: 4,
                rule_description: String::new(),
            },
        );

        let prompt = task_prompt(&session);
        assert!(prompt.starts_with("Discover the hidden rule through strategic queries.\n\nInput: A lowercase word\n"));
        assert!(prompt.contains("Query budget: 12\n"));
        assert!(prompt.contains("Batch limit: up to 4 input(s) per query call."));
        assert!(prompt.ends_with("- Prefer simpler explanations over complex ones"));
    }
}
