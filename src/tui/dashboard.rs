use super::state::push_wrapped_status_kv;
use crate::model::SimStatus;
use crate::simulation::{Alert, DashboardView, SimState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::collections::BTreeMap;

fn state_color(state: SimState) -> Color {
    match state {
        SimState::Idle => Color::DarkGray,
        SimState::Ready => Color::Cyan,
        SimState::Running => Color::Green,
        SimState::Paused => Color::Yellow,
        SimState::Stopped => Color::Red,
    }
}

fn status_color(status: SimStatus) -> Color {
    match status {
        SimStatus::Running => Color::Green,
        SimStatus::Completed => Color::Cyan,
        SimStatus::Paused => Color::Yellow,
        SimStatus::Stopped | SimStatus::Error => Color::Red,
        SimStatus::Idle | SimStatus::Unknown => Color::Gray,
    }
}

fn kv(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}:"), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn map_line<V: std::fmt::Display>(
    label: &str,
    map: &Option<BTreeMap<String, V>>,
) -> Option<Line<'static>> {
    let map = map.as_ref().filter(|m| !m.is_empty())?;
    let joined = map
        .iter()
        .map(|(k, v)| format!("{k} {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    Some(kv(label, joined, Color::White))
}

pub fn draw_dashboard(area: Rect, f: &mut Frame, view: &DashboardView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(0)].as_ref())
        .split(area);

    draw_instances(cols[0], f, view);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),  // progress
                Constraint::Length(10), // metrics
                Constraint::Min(0),     // events
            ]
            .as_ref(),
        )
        .split(cols[1]);

    draw_progress(right[0], f, view);
    draw_metrics(right[1], f, view);
    draw_events(right[2], f, view);
}

fn draw_instances(area: Rect, f: &mut Frame, view: &DashboardView) {
    let title = Line::from(vec![
        Span::raw("Instances ("),
        Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
        Span::raw(" "),
        Span::styled("Enter", Style::default().fg(Color::Magenta)),
        Span::raw(")"),
    ]);
    let block = Block::default().borders(Borders::ALL).title(title);

    if view.instances.is_empty() {
        let msg = if view.instances_loaded {
            "No registered instances. Start an SDK client, then press r."
        } else {
            "Loading instances..."
        };
        f.render_widget(
            Paragraph::new(msg)
                .style(Style::default().fg(Color::Gray))
                .wrap(Wrap { trim: true })
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = view
        .instances
        .iter()
        .map(|inst| {
            let selected = view.selected.as_deref() == Some(inst.instance_id.as_str());
            let marker = if selected { "● " } else { "  " };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(Color::Green)),
                    Span::raw(inst.instance_id.clone()),
                ]),
                Line::from(Span::styled(
                    format!("  {} {}", inst.product_id, inst.version),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    let mut list_state = ListState::default();
    list_state.select(Some(view.cursor));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_progress(area: Rect, f: &mut Frame, view: &DashboardView) {
    let pct = view.progress_percent().clamp(0.0, 100.0);
    let label = format!(
        "{}/{} ({:.1}%)",
        view.metrics.completed_iterations, view.metrics.total_iterations, pct
    );
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(state_color(view.state)))
        .ratio(pct / 100.0)
        .label(label);
    f.render_widget(gauge, area);
}

fn draw_metrics(area: Rect, f: &mut Frame, view: &DashboardView) {
    let m = &view.metrics;
    let mut lines: Vec<Line<'static>> = Vec::new();

    lines.push(Line::from(vec![
        Span::styled("State:", Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            view.state.label(),
            Style::default()
                .fg(state_color(view.state))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled("Server:", Style::default().fg(Color::Gray)),
        Span::raw(" "),
        match view.status {
            Some(status) => Span::styled(status.label(), Style::default().fg(status_color(status))),
            None => Span::styled("-", Style::default().fg(Color::DarkGray)),
        },
    ]));
    lines.push(Line::from(vec![
        Span::styled("Success rate:", Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(view.success_rate_text(), Style::default().fg(Color::Green)),
        Span::raw(format!(
            "  ({} allowed / {} denied)",
            m.success_count, m.failure_count
        )),
    ]));
    lines.push(Line::from(vec![
        Span::styled("Elapsed:", Style::default().fg(Color::Gray)),
        Span::raw(format!(" {}   ", view.elapsed_text())),
        Span::styled("Remaining:", Style::default().fg(Color::Gray)),
        Span::raw(format!(" {}", view.remaining_text())),
    ]));
    lines.extend(map_line("Feature calls", &m.feature_calls));
    lines.extend(map_line("Quota left", &m.quota_remaining));
    if let Some(tps) = m.current_tps.as_ref().filter(|t| !t.is_empty()) {
        let joined = tps
            .iter()
            .map(|(k, v)| format!("{k} {v:.1}"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(kv("TPS", joined, Color::White));
    }
    if let Some(path) = view.last_export.as_ref() {
        push_wrapped_status_kv(&mut lines, "Export", &path.display().to_string(), area.width);
    }

    let title = match view.selected.as_deref() {
        Some(id) => format!("Simulation: {id}"),
        None => "Simulation (select an instance)".to_string(),
    };
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

fn draw_events(area: Rect, f: &mut Frame, view: &DashboardView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Recent events (newest first)");
    let entries = view.events.entries();
    if entries.is_empty() {
        f.render_widget(
            Paragraph::new("No events yet").style(Style::default().fg(Color::Gray)).block(block),
            area,
        );
        return;
    }
    let items: Vec<ListItem> = entries
        .iter()
        .map(|ev| {
            let (verdict, color) = if ev.allowed {
                ("ALLOW", Color::Green)
            } else {
                ("DENY ", Color::Red)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("#{:<5}", ev.iteration), Style::default().fg(Color::Gray)),
                Span::styled(verdict, Style::default().fg(color)),
                Span::raw(format!(" {:<18} ", ev.feature_id)),
                Span::styled(ev.reason.clone(), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();
    f.render_widget(List::new(items).block(block), area);
}

/// Single-line alert for the bottom bar.
pub fn alert_line(alert: &Alert) -> Line<'static> {
    let (label, color) = match alert {
        Alert::Success(_) => ("OK", Color::Green),
        Alert::Error(_) => ("Error", Color::Red),
    };
    Line::from(vec![
        Span::styled(format!("{label}:"), Style::default().fg(color)),
        Span::raw(" "),
        Span::raw(alert.message().to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SimulationMetrics;
    use ratatui::{backend::TestBackend, Terminal};

    fn halfway() -> DashboardView {
        DashboardView {
            state: SimState::Running,
            metrics: SimulationMetrics {
                total_iterations: 50,
                completed_iterations: 25,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn progress_gauge_fills_half_at_25_of_50() {
        let view = halfway();
        let mut terminal = Terminal::new(TestBackend::new(42, 3)).unwrap();
        terminal
            .draw(|f| draw_progress(f.area(), f, &view))
            .unwrap();
        let buffer = terminal.backend().buffer();

        // Inner row of the bordered block: x 1..=40, y 1.
        let filled: Vec<bool> = (1u16..41)
            .map(|x| {
                let cell = &buffer[(x, 1u16)];
                cell.symbol() == "█" || cell.bg == Color::Green
            })
            .collect();
        assert_eq!(filled.iter().filter(|f| **f).count(), 20);
        assert!(filled[..20].iter().all(|f| *f));
        assert!(filled[20..].iter().all(|f| !*f));

        let row: String = (1u16..41)
            .map(|x| buffer[(x, 1u16)].symbol().to_string())
            .collect();
        assert!(row.contains("25/50 (50.0%)"));
    }

    #[test]
    fn dashboard_lists_instances_and_empty_events() {
        let mut view = halfway();
        view.instances_loaded = true;
        view.instances = vec![crate::model::Instance {
            instance_id: "abc123".into(),
            product_id: "demo-app".into(),
            version: "1.0.0".into(),
            registered_at: None,
        }];
        view.selected = Some("abc123".into());

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| draw_dashboard(f.area(), f, &view))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("● abc123"));
        assert!(text.contains("Simulation: abc123"));
        assert!(text.contains("No events yet"));
    }
}
