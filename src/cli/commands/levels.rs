//! Implementation of the `blackbox levels` command.

use anyhow::{bail, Result};
use console::style;
use serde::Serialize;

use crate::cli::commands::{load_catalog, open_progress_store};
use crate::cli::output::{budget, list_table, output, styled_status, CommandOutput};
use crate::cli::types::LevelsArgs;
use crate::domain::models::{Config, TaskCategory, TaskDescriptor};
use crate::services::{CatalogListing, CatalogService, TaskListing};

#[derive(Debug, Serialize)]
pub struct LevelsOutput {
    #[serde(flatten)]
    pub listing: CatalogListing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
}

impl CommandOutput for LevelsOutput {
    fn to_human(&self) -> String {
        let header = format!(
            "{} / {} tasks completed ({} remaining)",
            style(self.listing.completed).green().bold(),
            self.listing.total,
            self.listing.remaining()
        );

        let mut lines = vec![header];
        for category in TaskCategory::all() {
            if self.category.is_some_and(|c| c != category) {
                continue;
            }
            let tasks: Vec<&TaskListing> = self
                .listing
                .tasks
                .iter()
                .filter(|t| t.task.category == category)
                .collect();
            if tasks.is_empty() {
                continue;
            }

            let mut table = list_table(&["id", "budget", "batch", "status", "queries"]);
            for listing in tasks {
                let status = if listing.completed { "completed" } else { "open" };
                let queries = listing
                    .progress
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |p| budget(p.queries_used, p.total_queries));
                table.add_row(vec![
                    listing.task.id.clone(),
                    listing.task.total_queries.to_string(),
                    listing.task.query_batch_size.to_string(),
                    styled_status(status).to_string(),
                    queries,
                ]);
            }
            lines.push(format!("\n{}\n{table}", style(category.as_str().to_uppercase()).bold()));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct RandomTaskOutput {
    pub task: Option<TaskDescriptor>,
}

impl CommandOutput for RandomTaskOutput {
    fn to_human(&self) -> String {
        match &self.task {
            Some(task) => format!(
                "Try {} ({}): blackbox play {}",
                style(&task.id).cyan().bold(),
                task.category,
                task.id
            ),
            None => "You have completed all tasks!".to_string(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: LevelsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let category = match args.category.as_deref() {
        Some(raw) => match TaskCategory::from_str(raw) {
            Some(c) => Some(c),
            None => bail!("Unknown category '{raw}'. Expected numerical or lexical"),
        },
        None => None,
    };

    let service = CatalogService::new(load_catalog(config)?, open_progress_store(config).await?);

    if args.random {
        let task = service.random_incomplete(&args.user.user).await?;
        output(&RandomTaskOutput { task }, json_mode);
        return Ok(());
    }

    let listing = service.list(&args.user.user).await?;
    output(&LevelsOutput { listing, category }, json_mode);
    Ok(())
}
