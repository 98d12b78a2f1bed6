use super::content::{bullet_owned, heading};
use crate::lessons::LimitsView;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

fn label(text: &'static str) -> Span<'static> {
    Span::styled(text, Style::default().fg(Color::Gray))
}

pub fn draw_limits(area: Rect, f: &mut Frame, view: &LimitsView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Lesson 2: license limits");
    if view.types.is_empty() {
        let msg = if view.types_loaded {
            "No limit types available. Press r to retry."
        } else {
            "Loading limit types..."
        };
        f.render_widget(
            Paragraph::new(msg).style(Style::default().fg(Color::Gray)).block(block),
            area,
        );
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);
    let tabs = Tabs::new(
        view.types
            .iter()
            .map(|t| Line::from(t.name.clone()))
            .collect::<Vec<_>>(),
    )
    .select(view.current)
    .block(block)
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[1]);
    draw_description(cols[0], f, view);
    draw_simulation(cols[1], f, view);
}

fn draw_description(area: Rect, f: &mut Frame, view: &LimitsView) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    if let Some(t) = view.current_type() {
        lines.push(Line::from(t.description.clone()));
        lines.push(Line::from(""));
        lines.push(Line::from(vec![label("SDK call: "), Span::raw(t.sdk_api.clone())]));
        lines.push(Line::from(vec![label("Tracked by: "), Span::raw(t.who_tracks.clone())]));
        lines.push(Line::from(vec![label("Window: "), Span::raw(t.time_dimension.clone())]));
        if !t.use_cases.is_empty() {
            lines.push(Line::from(""));
            lines.push(heading("Use cases"));
            lines.extend(t.use_cases.iter().map(|u| bullet_owned(u.clone())));
        }
    }
    match view.example.as_ref() {
        Some(example) => {
            if !example.key_points.is_empty() {
                lines.push(Line::from(""));
                lines.push(heading("Key points"));
                lines.extend(example.key_points.iter().map(|p| bullet_owned(p.clone())));
            }
            if !example.code_example.is_empty() {
                lines.push(Line::from(""));
                lines.push(heading("Example"));
                lines.extend(example.code_example.lines().map(|l| {
                    Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Cyan)))
                }));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "Loading example...",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    let title = view
        .current_type()
        .map(|t| t.name.clone())
        .unwrap_or_default();
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

fn draw_simulation(area: Rect, f: &mut Frame, view: &LimitsView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)].as_ref())
        .split(area);

    let status = if view.simulating {
        Span::styled("running...", Style::default().fg(Color::Yellow))
    } else {
        Span::styled("Enter to run", Style::default().fg(Color::Magenta))
    };
    let summary = view
        .simulation
        .as_ref()
        .map(|s| s.summary.clone())
        .unwrap_or_default();
    let header = Paragraph::new(vec![
        Line::from(vec![
            label("Iterations:"),
            Span::raw(format!(" {}  ", view.iterations)),
            Span::styled("+/-", Style::default().fg(Color::Magenta)),
            Span::raw("   "),
            status,
        ]),
        Line::from(summary),
    ])
    .block(Block::default().borders(Borders::ALL).title("Simulate"));
    f.render_widget(header, rows[0]);

    let block = Block::default().borders(Borders::ALL).title("Calls");
    let Some(sim) = view.simulation.as_ref() else {
        f.render_widget(
            Paragraph::new("No simulation run yet")
                .style(Style::default().fg(Color::Gray))
                .block(block),
            rows[1],
        );
        return;
    };
    let items: Vec<ListItem> = sim
        .results
        .iter()
        .map(|r| {
            let (mark, color) = if r.allowed {
                ("✓", Color::Green)
            } else {
                ("✗", Color::Red)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("#{:<4}", r.iteration), Style::default().fg(Color::Gray)),
                Span::styled(mark, Style::default().fg(color)),
                Span::raw(format!(" {:<10} ", r.remaining)),
                Span::styled(
                    format!("{:<12}", r.reason),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(r.details.clone().unwrap_or_default()),
            ]))
        })
        .collect();
    f.render_widget(List::new(items).block(block), rows[1]);
}
