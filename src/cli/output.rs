//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::{style, StyledObject};
use serde::Serialize;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Create a borderless list table with the given headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Color a completion or verdict label.
pub fn styled_status(label: &str) -> StyledObject<&str> {
    match label {
        "completed" | "correct" | "solved" => style(label).green().bold(),
        "incorrect" | "failed" | "abandoned" => style(label).red(),
        "vague" | "in_progress" => style(label).yellow(),
        _ => style(label).dim(),
    }
}

/// Render `used/total` for a query budget.
pub fn budget(used: u32, total: u32) -> String {
    format!("{used}/{total}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_table_headers() {
        let mut table = list_table(&["id", "status"]);
        table.add_row(vec!["is_prime", "completed"]);
        let rendered = table.to_string();
        assert!(rendered.contains("ID"));
        assert!(rendered.contains("STATUS"));
        assert!(rendered.contains("is_prime"));
    }

    #[test]
    fn test_budget() {
        assert_eq!(budget(7, 10), "7/10");
    }
}
