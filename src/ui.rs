pub mod charting;
pub mod command_stats;
pub mod screen;

use hacktype::{
    cues::Cue,
    game::{Game, Screen as GameScreen},
    pack::CommandEntry,
    typing::{Mismatch, ProgressDisplay},
    util::{format_clock, format_number},
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn legend(text: &str) -> Paragraph<'_> {
    Paragraph::new(Span::styled(text, italic())).alignment(Alignment::Center)
}

fn flash_color(cue: Option<Cue>) -> Color {
    match cue {
        Some(Cue::Correct) => Color::Green,
        Some(Cue::Error) => Color::Red,
        Some(Cue::LevelUp) => Color::Yellow,
        None => Color::DarkGray,
    }
}

/// Matched text green, the first mismatch red, the rest dimmed.
pub fn progress_line(display: &ProgressDisplay) -> Line<'static> {
    let mut spans = vec![Span::styled(
        display.matched.clone(),
        bold().fg(Color::Green),
    )];
    match display.mismatch {
        Some(Mismatch::Expected(c)) => spans.push(Span::styled(
            match c {
                ' ' => "·".to_owned(),
                c => c.to_string(),
            },
            bold().fg(Color::White).bg(Color::Red),
        )),
        Some(Mismatch::PastEnd) => {
            spans.push(Span::styled("⏎", bold().fg(Color::White).bg(Color::Red)))
        }
        None => {}
    }
    if let Some(first) = display
        .remainder
        .chars()
        .next()
        .filter(|_| display.mismatch.is_none())
    {
        // next expected char
        spans.push(Span::styled(
            first.to_string(),
            bold().add_modifier(Modifier::DIM | Modifier::UNDERLINED),
        ));
        spans.push(Span::styled(
            display.remainder[first.len_utf8()..].to_string(),
            bold().add_modifier(Modifier::DIM),
        ));
    } else {
        spans.push(Span::styled(
            display.remainder.clone(),
            bold().add_modifier(Modifier::DIM),
        ));
    }
    Line::from(spans)
}

fn render_loading(area: Rect, buf: &mut Buffer) {
    Paragraph::new(Span::styled(
        "Loading command pack…",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(centered_row(area), buf);
}

fn centered_row(area: Rect) -> Rect {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Length(1),
            Constraint::Percentage(50),
        ])
        .split(area)[1]
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}

fn render_start(game: &Game, area: Rect, buf: &mut Buffer) {
    let Some(pack) = game.pack() else {
        return render_loading(area, buf);
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Min(6),    // pack card
            Constraint::Length(3), // profile
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(
        "H A C K T Y P E",
        bold().fg(Color::Green),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let mut lines = vec![
        Line::from(Span::styled(pack.title.clone(), bold().fg(Color::Cyan))),
        Line::from(Span::styled(
            format!("{} commands · {}", pack.len(), pack.difficulty),
            dim(),
        )),
        Line::from(""),
        Line::from(pack.summary.clone()),
    ];
    if game.pack_fell_back() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Pack could not be loaded, using the built-in command list.",
            Style::default().fg(Color::Yellow),
        )));
    }
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(pack.pack_id.as_str()))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);

    let mut profile = vec![Line::from(Span::styled(
        format!("High score {}", format_number(game.high_score())),
        bold(),
    ))];
    if let Some(stats) = game.pack_stats().filter(|s| s.attempts > 0) {
        profile.push(Line::from(format!(
            "{} runs · {} clears · best {}",
            stats.attempts,
            stats.clears,
            format_number(stats.best_score)
        )));
    }
    profile.push(Line::from(Span::styled(
        format!(
            "Tutorial {} · Effects {} · Music {}",
            if game.tutorial_completed() { "done" } else { "not played" },
            on_off(game.effects_enabled()),
            on_off(game.music_enabled())
        ),
        dim(),
    )));
    Paragraph::new(profile)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    legend("(enter) start / (t)utorial / (a) effects / (m)usic / (M)ute all / (q)uit").render(chunks[3], buf);
}

fn command_card(command: &CommandEntry, tutorial: bool) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        command.description.clone(),
        Style::default().fg(Color::Gray),
    ))];
    if !command.tags.is_empty() {
        lines.push(Line::from(Span::styled(
            command
                .tags
                .iter()
                .map(|t| format!("#{t}"))
                .collect::<Vec<_>>()
                .join(" "),
            Style::default().fg(Color::Magenta),
        )));
    }
    if tutorial {
        if let Some(hint) = &command.description_long {
            lines.push(Line::from(Span::styled(hint.clone(), italic().fg(Color::Yellow))));
        }
    }
    lines
}

fn render_typing(game: &Game, area: Rect, buf: &mut Buffer) {
    let (Some(command), Some(evaluation), Some(stats)) =
        (game.current_command(), game.evaluation(), game.stats())
    else {
        return;
    };
    let tutorial = game.screen() == GameScreen::Tutorial;

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_lines = ((evaluation.target.width() as f64 / max_chars_per_line as f64).ceil()
        as u16)
        .max(1);
    let output_lines = command.mock_output.lines().count() as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([
            Constraint::Length(1),                // status bar
            Constraint::Length(1),                // padding
            Constraint::Length(3),                // command card
            Constraint::Length(prompt_lines + 2), // target
            Constraint::Length(3),                // input
            Constraint::Min(0),                   // mock output
            Constraint::Length(1),                // legend
        ])
        .split(area);

    let mut status = vec![
        Span::styled(format_clock(game.remaining_seconds()), bold().fg(Color::Cyan)),
        Span::raw("   "),
    ];
    if let Some((step, total)) = game.tutorial_step() {
        status.push(Span::styled(format!("step {step}/{total}"), bold()));
    } else {
        status.push(Span::styled(
            format!("{} cmds", format_number(u64::from(stats.completed_commands))),
            bold(),
        ));
    }
    status.push(Span::raw("   "));
    status.push(Span::raw(format!("{} wpm", game.live_wpm())));
    status.push(Span::raw("   "));
    status.push(Span::raw(format!("{}% acc", stats.accuracy())));
    if game.is_paused() {
        status.push(Span::raw("   "));
        status.push(Span::styled(
            "PAUSED",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }
    Paragraph::new(Line::from(status))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Paragraph::new(command_card(command, tutorial))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);

    let flash = game.flash();
    Paragraph::new(progress_line(&evaluation.display))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(flash_color(flash))),
        )
        .alignment(if prompt_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false })
        .render(chunks[3], buf);

    let input_style = if game.has_error() {
        bold().fg(Color::Red)
    } else {
        bold()
    };
    Paragraph::new(Line::from(vec![
        Span::styled("$ ", dim()),
        Span::styled(game.input().to_string(), input_style),
        Span::styled("█", dim()),
    ]))
    .block(Block::default().borders(Borders::ALL).title("input"))
    .render(chunks[4], buf);

    if output_lines > 0 && chunks[5].height > 2 {
        Paragraph::new(command.mock_output.clone())
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::TOP).title("output"))
            .render(chunks[5], buf);
    }

    legend(if tutorial {
        "(tab) hint / (ctrl+u) clear / (esc) skip tutorial"
    } else {
        "(tab) hint / (ctrl+u) clear / (esc) end run"
    })
    .render(chunks[6], buf);
}

fn render_results(game: &Game, area: Rect, buf: &mut Buffer) {
    let Some(result) = game.last_result() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // score
            Constraint::Length(1), // breakdown
            Constraint::Length(1), // stats
            Constraint::Length(1), // pack stats
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let (overall_duration, highest_wpm) =
        charting::compute_chart_params(&result.samples, result.elapsed_seconds);
    let tuples: Vec<(f64, f64)> = result.samples.iter().copied().map(Into::into).collect();
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&tuples)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, overall_duration])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(overall_duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(highest_wpm), bold()),
                ]),
        )
        .render(chunks[0], buf);

    let mut score = vec![
        Span::styled(
            format!("Score {}", format_number(result.score.total)),
            bold().fg(Color::Green),
        ),
        Span::raw("   "),
        Span::styled(format!("high {}", format_number(result.high_score)), bold()),
    ];
    if result.new_high_score {
        score.push(Span::raw("   "));
        score.push(Span::styled(
            "NEW HIGH SCORE",
            bold().fg(Color::Yellow).add_modifier(Modifier::SLOW_BLINK),
        ));
    }
    Paragraph::new(Line::from(score))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let penalties = &result.score.penalties;
    let mut breakdown = format!(
        "base {} + time bonus {} - errors {}",
        format_number(result.score.base.round() as u64),
        format_number(result.score.time_bonus.round() as u64),
        format_number(penalties.errors.round() as u64),
    );
    if let Some(hints) = penalties.hints.filter(|h| *h > 0.0) {
        breakdown.push_str(&format!(" - hints {}", format_number(hints.round() as u64)));
    }
    Paragraph::new(Span::styled(breakdown, dim()))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let mut stats = format!(
        "{} wpm   {}% acc   {} commands   {} errors",
        result.wpm, result.accuracy, result.completed_commands, result.errors
    );
    if let Some(consistency) = result.consistency {
        stats.push_str(&format!("   {consistency:.0}% consistency"));
    }
    Paragraph::new(Span::styled(stats, bold()))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    if let Some(pack) = result.pack_stats {
        Paragraph::new(Span::styled(
            format!(
                "{}: {} runs · {} clears · best {}",
                result.pack_id,
                pack.attempts,
                pack.clears,
                format_number(pack.best_score)
            ),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    legend("(r)etry / (b)ack / (s)tats / (q)uit").render(chunks[6], buf);
}

fn render_tutorial_summary(game: &Game, area: Rect, buf: &mut Buffer) {
    let Some(result) = game.tutorial_result() else {
        return;
    };
    let title = if result.completed_steps >= result.total_steps {
        "Tutorial complete. You are ready to play."
    } else {
        "Time is up. The tutorial still counts as done."
    };
    let lines = vec![
        Line::from(Span::styled(title, bold().fg(Color::Green))),
        Line::from(""),
        Line::from(format!(
            "{}/{} steps   {}% acc   {} wpm",
            result.completed_steps, result.total_steps, result.accuracy, result.wpm
        )),
        Line::from(""),
        Line::from(Span::styled(
            "(enter) continue / (r)etry tutorial",
            italic(),
        )),
    ];
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(5),
            Constraint::Min(0),
        ])
        .split(area);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let game = &self.game;
        match game.screen() {
            GameScreen::Loading => render_loading(area, buf),
            GameScreen::Start => render_start(game, area, buf),
            GameScreen::Play | GameScreen::Tutorial => render_typing(game, area, buf),
            GameScreen::Results => render_results(game, area, buf),
            GameScreen::TutorialSummary => render_tutorial_summary(game, area, buf),
            // drawn by ui::command_stats
            GameScreen::CommandStats => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hacktype::typing::split_progress;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_progress_line_marks_mismatch() {
        let line = progress_line(&split_progress("ls -la", "ls -x"));
        assert_eq!(text(&line), "ls -la");
        assert_eq!(line.spans[1].content, "l");
        assert_eq!(line.spans[1].style.bg, Some(Color::Red));
    }

    #[test]
    fn test_progress_line_past_end() {
        let line = progress_line(&split_progress("ls", "lss"));
        assert_eq!(text(&line), "ls⏎");
    }

    #[test]
    fn test_progress_line_underlines_next_char() {
        let line = progress_line(&split_progress("pwd", "p"));
        assert_eq!(text(&line), "pwd");
        assert_eq!(line.spans[1].content, "w");
    }
}
