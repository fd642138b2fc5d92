//! Implementation of the `blackbox progress` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::commands::open_progress_store;
use crate::cli::output::{budget, list_table, output, styled_status, CommandOutput};
use crate::cli::types::ProgressArgs;
use crate::domain::models::{progress_user_key, Config, ProgressRecord};

#[derive(Debug, Serialize)]
pub struct ProgressOutput {
    pub user_key: String,
    pub records: Vec<ProgressRecord>,
}

impl CommandOutput for ProgressOutput {
    fn to_human(&self) -> String {
        if self.records.is_empty() {
            return "No progress recorded yet.".to_string();
        }

        let mut table = list_table(&["task", "result", "queries"]);
        for record in &self.records {
            let result = if record.success { "solved" } else { "failed" };
            table.add_row(vec![
                record.task_id.clone(),
                styled_status(result).to_string(),
                budget(record.queries_used, record.total_queries),
            ]);
        }
        let solved = self.records.iter().filter(|r| r.success).count();
        format!("{solved} of {} attempted tasks solved\n{table}", self.records.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ProgressArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = open_progress_store(config).await?;
    let user_key = progress_user_key(&args.user.user);

    let mut records: Vec<ProgressRecord> = store.get(&user_key).await?.into_values().collect();
    records.sort_by(|a, b| a.task_id.cmp(&b.task_id));

    output(&ProgressOutput { user_key, records }, json_mode);
    Ok(())
}
