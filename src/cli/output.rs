// Output formatting utilities

use crate::board::{Board, BoardColumn};
use crate::models::{Movement, Priority, Record, Stage};
use crate::pipeline::PipelineStats;
use crate::utils::date::{format_time_ago, format_timestamp};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";
const ANSI_FG_BRIGHT_BLACK: &str = "\x1b[90m";

/// Narrowest board column worth drawing
const MIN_BOARD_COLUMN_WIDTH: usize = 22;
const BOARD_COLUMN_GAP: usize = 2;

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    // Fallback to COLUMNS environment variable (set by most shells)
    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

/// Apply bold formatting if in TTY mode
fn bold_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

fn priority_colored(priority: Priority, is_tty: bool) -> String {
    let label = priority.as_str();
    if !is_tty {
        return label.to_string();
    }
    let color = match priority {
        Priority::High => ANSI_FG_RED,
        Priority::Medium => ANSI_FG_YELLOW,
        Priority::Low => ANSI_FG_BRIGHT_BLACK,
    };
    format!("{}{}{}", color, label, ANSI_RESET)
}

/// Cut `text` to at most `width` characters, marking the cut with `~`
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(width - 1).collect();
    cut.push('~');
    cut
}

/// Format a budget amount with thousands separators
pub fn format_budget(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${}.{:02}", grouped, cents % 100)
}

fn or_none(value: Option<String>) -> String {
    value.unwrap_or_else(|| "(none)".to_string())
}

/// Stage table with optional record counts
pub fn format_stage_table(stages: &[Stage], counts: &HashMap<i64, usize>) -> String {
    if stages.is_empty() {
        return "No stages found. Run 'pipeboard init' to create the default pipeline.\n".to_string();
    }

    let name_width = stages
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(4)
        .clamp(4, 40);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<6} {:<4} {:<name_width$} {:>7}  {}\n",
        "ID", "Pos", "Name", "Records", "Description"
    ));
    output.push_str(&"-".repeat(6 + 1 + 4 + 1 + name_width + 1 + 7 + 2 + 11));
    output.push('\n');
    for stage in stages {
        output.push_str(&format!(
            "{:<6} {:<4} {:<name_width$} {:>7}  {}\n",
            stage.id,
            stage.position,
            truncate(&stage.name, name_width),
            counts.get(&stage.id).copied().unwrap_or(0),
            stage.description.as_deref().unwrap_or("")
        ));
    }
    output
}

/// Record table; `stage_names` maps stage ids to display names
pub fn format_record_table(records: &[Record], stage_names: &HashMap<i64, String>) -> String {
    if records.is_empty() {
        return "No records found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<6} {:<28} {:<20} {:<22} {:<8} {:>12} {:<10}\n",
        "ID", "Project", "Customer", "Stage", "Priority", "Budget", "Due"
    ));
    output.push_str(&"-".repeat(112));
    output.push('\n');
    for record in records {
        let stage = stage_names
            .get(&record.stage_id)
            .cloned()
            .unwrap_or_else(|| format!("[{}]", record.stage_id));
        output.push_str(&format!(
            "{:<6} {:<28} {:<20} {:<22} {:<8} {:>12} {:<10}\n",
            record.id,
            truncate(&record.project_name, 28),
            truncate(&record.customer_name, 20),
            truncate(&stage, 22),
            record.priority.as_str(),
            record.budget.map(format_budget).unwrap_or_default(),
            record.due_date.map(|d| d.to_string()).unwrap_or_default()
        ));
    }
    output
}

/// Detailed view of one record with its stage history
pub fn format_record_summary(
    record: &Record,
    stage_name: &str,
    movements: &[Movement],
    now: DateTime<Utc>,
    is_tty: bool,
) -> String {
    let mut output = String::new();

    let header = format!("Record {}: {}", record.id, record.project_name);
    output.push_str(&bold_if_tty(&header, is_tty));
    output.push('\n');
    output.push_str(&"=".repeat(header.chars().count().max(60)));
    output.push_str("\n\n");

    output.push_str(&format!("Stage:       {}\n", stage_name));
    output.push_str(&format!("Priority:    {}\n", priority_colored(record.priority, is_tty)));
    output.push_str(&format!("Created:     {}\n", format_timestamp(record.created_at)));
    output.push_str(&format!("Modified:    {}\n\n", format_timestamp(record.updated_at)));

    output.push_str("Customer:\n");
    output.push_str(&format!("  Name:      {}\n", record.customer_name));
    output.push_str(&format!("  Email:     {}\n", or_none(record.email.clone())));
    output.push_str(&format!("  Phone:     {}\n", or_none(record.phone.clone())));
    output.push_str(&format!("  Address:   {}\n\n", or_none(record.address.clone())));

    output.push_str("Project:\n");
    output.push_str(&format!("  Budget:    {}\n", or_none(record.budget.map(format_budget))));
    output.push_str(&format!("  Start:     {}\n", or_none(record.start_date.map(|d| d.to_string()))));
    output.push_str(&format!("  Due:       {}\n", or_none(record.due_date.map(|d| d.to_string()))));
    if let Some(description) = &record.description {
        output.push_str(&format!("  Description:\n    {}\n", description));
    }
    if let Some(notes) = &record.notes {
        output.push_str(&format!("  Notes:\n    {}\n", notes));
    }

    output.push_str("\nHistory:\n");
    if movements.is_empty() {
        output.push_str("  (none)\n");
    }
    for movement in movements {
        output.push_str(&format!(
            "  {:<10} {} ({})\n",
            format_time_ago(movement.moved_at, now),
            describe_transition(movement),
            movement.moved_by
        ));
    }
    output
}

fn describe_transition(movement: &Movement) -> String {
    match &movement.from_stage_name {
        Some(from) => format!("{} -> {}", from, movement.to_stage_name),
        None => format!("Created in {}", movement.to_stage_name),
    }
}

/// Movement log, newest first
pub fn format_movement_table(movements: &[Movement], now: DateTime<Utc>) -> String {
    if movements.is_empty() {
        return "No movements recorded.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<10} {:<7} {:<24} {:<44} {}\n",
        "When", "Record", "Project", "Transition", "By"
    ));
    output.push_str(&"-".repeat(100));
    output.push('\n');
    for movement in movements {
        output.push_str(&format!(
            "{:<10} {:<7} {:<24} {:<44} {}\n",
            format_time_ago(movement.moved_at, now),
            movement.record_id,
            truncate(&movement.project_name, 24),
            truncate(&describe_transition(movement), 44),
            movement.moved_by
        ));
    }
    output
}

/// Render the board as side-by-side columns fitted to `width`.
///
/// Columns that do not fit on one band wrap to the next band.
pub fn format_board(board: &Board, width: usize, is_tty: bool) -> String {
    if board.columns.is_empty() {
        return "No stages found. Run 'pipeboard init' to create the default pipeline.\n".to_string();
    }

    let per_band = ((width + BOARD_COLUMN_GAP) / (MIN_BOARD_COLUMN_WIDTH + BOARD_COLUMN_GAP))
        .clamp(1, board.columns.len());
    let column_width = ((width + BOARD_COLUMN_GAP) / per_band)
        .saturating_sub(BOARD_COLUMN_GAP)
        .max(MIN_BOARD_COLUMN_WIDTH);

    let mut output = String::new();
    for (band_index, band) in board.columns.chunks(per_band).enumerate() {
        if band_index > 0 {
            output.push('\n');
        }
        let cells: Vec<Vec<String>> = band.iter().map(|c| column_lines(c, column_width)).collect();
        let height = cells.iter().map(Vec::len).max().unwrap_or(0);

        for row in 0..height {
            let mut line = String::new();
            for (i, cell) in cells.iter().enumerate() {
                let text = cell.get(row).map(String::as_str).unwrap_or("");
                let padded = format!("{:<column_width$}", text);
                // Header row is bolded after padding so escapes don't skew alignment
                if row == 0 {
                    line.push_str(&bold_if_tty(&padded, is_tty));
                } else {
                    line.push_str(&padded);
                }
                if i + 1 < cells.len() {
                    line.push_str(&" ".repeat(BOARD_COLUMN_GAP));
                }
            }
            output.push_str(line.trim_end());
            output.push('\n');
        }
    }

    output.push_str(&format!(
        "\n{} stage(s), {} record(s)\n",
        board.total_stages, board.total_records
    ));
    output
}

fn column_lines(column: &BoardColumn, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(truncate(&format!("{} ({})", column.stage.name, column.count), width));
    lines.push("-".repeat(width));
    if column.records.is_empty() {
        lines.push("(empty)".to_string());
    }
    for record in &column.records {
        lines.push(truncate(&format!("#{} {}", record.id, record.project_name), width));
        lines.push(truncate(
            &format!("  {} [{}]", record.customer_name, record.priority.as_str()),
            width,
        ));
    }
    if column.truncated {
        lines.push(format!("... {} more", column.count - column.records.len()));
    }
    lines
}

/// Pipeline statistics report
pub fn format_stats(stats: &PipelineStats) -> String {
    let mut output = String::new();
    output.push_str(&format!("Stages:    {}\n", stats.total_stages));
    output.push_str(&format!("Records:   {}\n", stats.total_records));
    output.push_str(&format!("Movements: {}\n", stats.total_movements));
    if !stats.stages.is_empty() {
        output.push_str("\nRecords per stage:\n");
        for stage in &stats.stages {
            output.push_str(&format!("  {:>3}. {:<32} {:>5}\n", stage.position, truncate(&stage.name, 32), stage.record_count));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::date::from_millis;

    fn stage(id: i64, position: i64, name: &str) -> Stage {
        Stage {
            id,
            name: name.to_string(),
            position,
            description: None,
            created_at: from_millis(0),
            updated_at: from_millis(0),
        }
    }

    fn record(id: i64, stage_id: i64, project: &str) -> Record {
        Record {
            id,
            stage_id,
            project_name: project.to_string(),
            customer_name: "Jane Roe".to_string(),
            email: None,
            phone: None,
            address: None,
            priority: Priority::High,
            budget: Some(12500.0),
            start_date: None,
            due_date: None,
            description: None,
            notes: None,
            created_at: from_millis(id * 1000),
            updated_at: from_millis(id * 1000),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Approved – Ready to Schedule", 10), "Approved ~");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_format_budget() {
        assert_eq!(format_budget(0.0), "$0.00");
        assert_eq!(format_budget(999.5), "$999.50");
        assert_eq!(format_budget(1234567.891), "$1,234,567.89");
    }

    #[test]
    fn test_board_columns_side_by_side() {
        let stages = vec![stage(1, 1, "Intake"), stage(2, 2, "Bidding")];
        let records = vec![record(1, 1, "Kitchen"), record(2, 2, "Roof")];
        let board = Board::project(&stages, &records, None);

        let text = format_board(&board, 80, false);
        let first_line = text.lines().next().unwrap();
        assert!(first_line.starts_with("Intake (1)"));
        assert!(first_line.contains("Bidding (1)"));
        assert!(text.contains("#1 Kitchen"));
        assert!(text.contains("#2 Roof"));
        assert!(text.contains("2 stage(s), 2 record(s)"));
    }

    #[test]
    fn test_board_wraps_narrow_terminal() {
        let stages = vec![stage(1, 1, "A"), stage(2, 2, "B"), stage(3, 3, "C")];
        let board = Board::project(&stages, &[], None);

        let text = format_board(&board, 30, false);
        let headers: Vec<&str> = text.lines().filter(|l| l.ends_with("(0)")).collect();
        assert_eq!(headers, vec!["A (0)", "B (0)", "C (0)"]);
    }

    #[test]
    fn test_board_truncation_note() {
        let stages = vec![stage(1, 1, "Intake")];
        let records = vec![record(1, 1, "One"), record(2, 1, "Two"), record(3, 1, "Three")];
        let board = Board::project(&stages, &records, Some(1));
        let text = format_board(&board, 80, false);
        assert!(text.contains("#3 Three"));
        assert!(!text.contains("#1 One"));
        assert!(text.contains("... 2 more"));
    }

    #[test]
    fn test_stage_table() {
        let stages = vec![stage(4, 1, "Intake")];
        let mut counts = HashMap::new();
        counts.insert(4, 3);
        let text = format_stage_table(&stages, &counts);
        assert!(text.lines().nth(2).unwrap().starts_with("4      1    Intake"));
        assert!(text.contains("  3  "));
    }

    #[test]
    fn test_movement_table() {
        let movement = Movement {
            id: 1,
            record_id: 7,
            project_name: "Roof".into(),
            from_stage_id: Some(1),
            from_stage_name: Some("Intake".into()),
            to_stage_id: 2,
            to_stage_name: "Bidding".into(),
            moved_by: "Admin".into(),
            moved_at: from_millis(0),
        };
        let text = format_movement_table(&[movement], from_millis(120_000));
        assert!(text.contains("2m ago"));
        assert!(text.contains("Intake -> Bidding"));
    }
}
