//! Table builder wrapper around comfy-table for consistent list display.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::{style, StyledObject};

/// Create a standard list table with the given headers.
///
/// Uses the NOTHING preset (no borders) for a clean CLI aesthetic.
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

/// Render the table to string with a count header.
pub fn render_list(entity_name: &str, table: &Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let noun = if total == 1 {
        entity_name.to_string()
    } else {
        format!("{entity_name}s")
    };
    format!("{} {noun}:\n{table}", style(total).bold())
}

/// Color a run status. `console` drops styling when stdout is not a terminal.
pub fn colorize_status(status: &str) -> StyledObject<&str> {
    match status {
        "converged" => style(status).green().bold(),
        "running" => style(status).yellow(),
        "max_iterations_reached" => style(status).cyan(),
        "failed" => style(status).red().bold(),
        "cancelled" => style(status).dim(),
        _ => style(status),
    }
}

/// Right-aligned score with one decimal.
pub fn score_cell(score: f64) -> Cell {
    Cell::new(format!("{score:.1}")).set_alignment(CellAlignment::Right)
}
