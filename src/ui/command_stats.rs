use chrono::Local;
use hacktype::history::CommandSummary;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::{App, SortBy};

pub struct CommandRowData<'a> {
    pub summary: &'a CommandSummary,
    pub last_seen: String,
}

/// Pure presenter for a single command stats row
pub fn present_row(data: &CommandRowData) -> Row<'static> {
    let summary = data.summary;
    let secs = summary.avg_duration_ms / 1000.0;

    let time_color = if secs < 3.0 {
        Color::Green
    } else if secs < 6.0 {
        Color::Yellow
    } else {
        Color::Red
    };

    let error_rate = summary.error_rate();
    let error_color = if error_rate == 0.0 {
        Color::Green
    } else if error_rate < 1.0 {
        Color::Yellow
    } else {
        Color::Red
    };

    Row::new(vec![
        Cell::from(summary.command.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(summary.attempts.to_string()),
        Cell::from(format!("{secs:.2}")).style(Style::default().fg(time_color)),
        Cell::from(format!("{} ({error_rate:.1})", summary.total_errors))
            .style(Style::default().fg(error_color)),
        Cell::from(data.last_seen.clone()),
    ])
}

/// Sort in place by the given column.
pub fn sort_summary(summary: &mut [CommandSummary], sort_by: &SortBy, ascending: bool) {
    summary.sort_by(|a, b| {
        let cmp = match sort_by {
            SortBy::Command => a.command.cmp(&b.command),
            SortBy::Attempts => a.attempts.cmp(&b.attempts),
            SortBy::AvgTime => a
                .avg_duration_ms
                .partial_cmp(&b.avg_duration_ms)
                .unwrap_or(std::cmp::Ordering::Equal),
            SortBy::ErrorRate => a
                .error_rate()
                .partial_cmp(&b.error_rate())
                .unwrap_or(std::cmp::Ordering::Equal),
        };
        if ascending {
            cmp
        } else {
            cmp.reverse()
        }
    });
}

/// Render the Command Statistics screen
pub fn render_command_stats(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let now = Local::now();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Stats table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let sort_direction = if app.stats_view.sort_ascending {
        "↑"
    } else {
        "↓"
    };
    let title_text = format!(
        "Command Statistics (Sort: {} {sort_direction})",
        app.stats_view.sort_by
    );

    let title = Paragraph::new(title_text)
        .block(Block::default().borders(Borders::ALL).title("Stats"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let mut summary = app.game.command_stats().to_vec();
    if summary.is_empty() {
        let no_data = Paragraph::new("No command history yet. Finish a run to collect data.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        sort_summary(
            &mut summary,
            &app.stats_view.sort_by,
            app.stats_view.sort_ascending,
        );

        // borders + header
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let max_scroll = summary.len().saturating_sub(table_height);
        if app.stats_view.scroll_offset > max_scroll {
            app.stats_view.scroll_offset = max_scroll;
        }

        let indicator = |column: SortBy| {
            if app.stats_view.sort_by == column {
                sort_direction
            } else {
                ""
            }
        };

        let header = Row::new(vec![
            Cell::from(format!("Command {}", indicator(SortBy::Command))),
            Cell::from(format!("Attempts {}", indicator(SortBy::Attempts))),
            Cell::from(format!("Avg Time (s) {}", indicator(SortBy::AvgTime))),
            Cell::from(format!("Errors (per try) {}", indicator(SortBy::ErrorRate))),
            Cell::from("Last Typed"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let visible_rows: Vec<Row> = summary
            .iter()
            .skip(app.stats_view.scroll_offset)
            .take(table_height)
            .map(|row| {
                present_row(&CommandRowData {
                    summary: row,
                    last_seen: row.last_seen_text(now),
                })
            })
            .collect();

        let widths = [
            Constraint::Min(20),    // Command
            Constraint::Length(10), // Attempts
            Constraint::Length(14), // Avg Time
            Constraint::Length(18), // Errors
            Constraint::Length(16), // Last Typed
        ];

        let table = Table::new(visible_rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Commands"))
            .column_spacing(2);

        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new(
        "(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (1-4) sort  (space) reverse  (b/esc) back",
    )
    .alignment(Alignment::Center)
    .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn summary(command: &str, attempts: u64, avg_ms: f64, errors: u64) -> CommandSummary {
        CommandSummary {
            command: command.into(),
            attempts,
            avg_duration_ms: avg_ms,
            total_errors: errors,
            last_seen: Local::now() - Duration::minutes(3),
        }
    }

    #[test]
    fn test_sort_summary_by_each_column() {
        let mut rows = vec![
            summary("pwd", 2, 1500.0, 4),
            summary("ls", 5, 900.0, 0),
            summary("nmap -sV", 1, 7000.0, 3),
        ];

        sort_summary(&mut rows, &SortBy::Command, true);
        assert_eq!(rows[0].command, "ls");

        sort_summary(&mut rows, &SortBy::Attempts, false);
        assert_eq!(rows[0].command, "ls");

        sort_summary(&mut rows, &SortBy::AvgTime, false);
        assert_eq!(rows[0].command, "nmap -sV");

        sort_summary(&mut rows, &SortBy::ErrorRate, false);
        assert_eq!(rows[0].command, "nmap -sV");
        assert_eq!(rows[2].command, "ls");
    }
}
