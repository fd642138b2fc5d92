//! Implementation of the `blackbox play` command.
//!
//! Runs one task session in the terminal. Input lines race the round timer,
//! which keeps running in a background task while oracle calls are pending.

use anyhow::{anyhow, Context, Result};
use console::style;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::adapters::HttpOracle;
use crate::cli::commands::{load_catalog, open_progress_store};
use crate::cli::output::{budget, output, styled_status, CommandOutput};
use crate::cli::types::PlayArgs;
use crate::domain::errors::SessionError;
use crate::domain::models::{Config, SessionStatus, Verdict};
use crate::domain::ports::Oracle;
use crate::services::briefing::{display_value, sample_pairs, task_prompt};
use crate::services::{
    CatalogService, HypothesisOutcome, QueryOutcome, TaskSessionController, TimeoutOutcome,
};

const HELP: &str = "Commands:
  q <input>, <input>, ...   query a batch of inputs
  h <hypothesis>            submit a hypothesis
  status                    show budget and time left
  help                      show this help
  quit                      end the session";

/// One parsed line of participant input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayCommand {
    Query(Vec<String>),
    Hypothesis(String),
    Status,
    Help,
    Quit,
    Unknown(String),
}

impl PlayCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        match word.to_lowercase().as_str() {
            "q" | "query" => Self::Query(rest.split(',').map(|s| s.trim().to_string()).collect()),
            "h" | "hypothesis" => Self::Hypothesis(rest.to_string()),
            "status" | "s" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlayOutput {
    pub task_id: String,
    pub status: SessionStatus,
    pub success: bool,
    pub queries_used: u32,
    pub failed_queries: u32,
    pub total_queries: u32,
    pub hypotheses: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_description: Option<String>,
}

impl CommandOutput for PlayOutput {
    fn to_human(&self) -> String {
        let result = match (self.status, self.success) {
            (SessionStatus::Completed, true) => "solved",
            (SessionStatus::Completed, false) => "failed",
            _ => "abandoned",
        };
        let mut lines = vec![format!(
            "Task {}: {} with {} queries ({} lost to timeouts), {} hypotheses",
            self.task_id,
            styled_status(result),
            budget(self.queries_used, self.total_queries),
            self.failed_queries,
            self.hypotheses
        )];
        if let Some(rule) = &self.rule_description {
            lines.push(format!("The rule was: {rule}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: PlayArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = open_progress_store(config).await?;
    let catalog = CatalogService::new(load_catalog(config)?, store.clone());
    let user = args.user.user.trim().to_string();

    let descriptor = match args.task_id.as_deref() {
        Some(id) => catalog.resolve(id)?,
        None => catalog
            .random_incomplete(&user)
            .await?
            .ok_or_else(|| anyhow!("You have completed all tasks!"))?,
    };

    let oracle: Arc<dyn Oracle> =
        Arc::new(HttpOracle::new(&config.oracle).context("Failed to create oracle client")?);
    let round = Duration::from_secs(args.round_seconds.unwrap_or(config.timer.round_seconds));

    let controller = TaskSessionController::start(oracle, store, &user, &descriptor, round).await?;

    let snapshot = controller.snapshot().await;
    println!("{}", style(format!("Task {}", descriptor.id)).bold());
    println!("{}\n", task_prompt(&snapshot.session));
    println!("{}\n", sample_pairs(&snapshot.session.sample_cases));
    println!("{HELP}\n");

    let (tx, mut timeouts) = mpsc::unbounded_channel();
    let timer = tokio::spawn(controller.clone().run_timer(tx));

    let result = play_loop(&controller, &mut timeouts).await;

    if let Err(e) = controller.end_task().await {
        eprintln!("{} {e}", style("warning:").yellow());
    }
    timer.abort();
    result?;

    let session = controller.snapshot().await.session;
    output(
        &PlayOutput {
            task_id: session.task_id.clone(),
            status: session.status(),
            success: session.succeeded(),
            queries_used: session.queries_used(),
            failed_queries: session.failed_queries(),
            total_queries: session.total_queries(),
            hypotheses: session.submission_history().len(),
            rule_description: session.rule_description().map(str::to_string),
        },
        json_mode,
    );
    Ok(())
}

async fn play_loop(
    controller: &TaskSessionController,
    timeouts: &mut mpsc::UnboundedReceiver<TimeoutOutcome>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(event) = timeouts.recv() => render_timeout(event),
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    return Ok(());
                };
                match PlayCommand::parse(&line) {
                    PlayCommand::Query(inputs) => match controller.submit_query(inputs).await {
                        Ok(outcome) => render_query(&outcome),
                        Err(e) => render_error(&e),
                    },
                    PlayCommand::Hypothesis(text) => match controller.submit_hypothesis(&text).await {
                        Ok(outcome) => render_hypothesis(&outcome),
                        Err(e) => render_error(&e),
                    },
                    PlayCommand::Status => render_status(controller).await,
                    PlayCommand::Help => println!("{HELP}"),
                    PlayCommand::Quit => return Ok(()),
                    PlayCommand::Unknown(text) if text.is_empty() => {}
                    PlayCommand::Unknown(text) => {
                        println!("Unknown command '{text}'. Type help for commands.");
                    }
                }
            }
        }

        if controller.snapshot().await.session.status().is_terminal() {
            return Ok(());
        }
    }
}

fn render_query(outcome: &QueryOutcome) {
    for record in &outcome.results {
        println!("  {} → {}", record.input, display_value(&record.output));
    }
    println!("  {} queries left", outcome.remaining);
}

fn render_timeout(event: TimeoutOutcome) {
    match event {
        TimeoutOutcome::Charged { charged: 0, .. } => println!(
            "{} round timed out. No queries left, submit your final hypothesis.",
            style("⏱").yellow()
        ),
        TimeoutOutcome::Charged { charged, remaining, .. } => println!(
            "{} round timed out, {charged} queries lost, {remaining} left",
            style("⏱").yellow()
        ),
        TimeoutOutcome::Stale | TimeoutOutcome::Inactive => {}
    }
}

fn render_hypothesis(outcome: &HypothesisOutcome) {
    match outcome.verdict {
        Verdict::Correct => println!("{}", styled_status("correct")),
        Verdict::Vague => println!(
            "{}: your hypothesis is too vague. {}",
            styled_status("vague"),
            outcome.explanation
        ),
        Verdict::Incorrect => println!(
            "{}: {}",
            styled_status("incorrect"),
            outcome.explanation
        ),
    }
    if let Some(err) = &outcome.progress_error {
        eprintln!("{} progress not saved yet: {err}", style("warning:").yellow());
    }
    if !outcome.completed && outcome.remaining > 0 {
        println!("  Run another query before your next hypothesis.");
    }
}

async fn render_status(controller: &TaskSessionController) {
    let snapshot = controller.snapshot().await;
    let session = &snapshot.session;
    let seconds = snapshot.round_remaining.map_or(0, |d| d.as_secs());
    println!(
        "  {} queries used, {} left, batch limit {}, {seconds}s left this round",
        budget(session.queries_used(), session.total_queries()),
        session.remaining(),
        session.query_batch_size()
    );
}

fn render_error(err: &SessionError) {
    if err.is_precondition() {
        println!("  {}", style(err).yellow());
    } else {
        eprintln!("{} {err}", style("error:").red().bold());
    }
}
