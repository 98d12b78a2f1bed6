use super::content::heading;
use crate::lessons::{SetupFocus, SetupView};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

fn list_block(title: &'static str, focused: bool) -> Block<'static> {
    let border = if focused { Color::Yellow } else { Color::Gray };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
}

fn placeholder(msg: &'static str, block: Block<'static>) -> Paragraph<'static> {
    Paragraph::new(msg)
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true })
        .block(block)
}

pub fn draw_setup(area: Rect, f: &mut Frame, view: &SetupView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(4),
                Constraint::Min(0),
                Constraint::Length(5),
            ]
            .as_ref(),
        )
        .split(area);

    let intro = Paragraph::new(vec![
        heading("Lesson 3: SDK setup"),
        Line::from(
            "Register an SDK instance for a product, then check features against its \
             license. Registered instances drive the Runtime step.",
        ),
    ])
    .wrap(Wrap { trim: true });
    f.render_widget(intro, rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(rows[1]);
    draw_products(cols[0], f, view);
    draw_instances(cols[1], f, view);
    draw_check(rows[2], f, view);
}

fn draw_products(area: Rect, f: &mut Frame, view: &SetupView) {
    let focused = view.focus == SetupFocus::Products;
    let block = list_block("Products (g register)", focused);
    if view.products.is_empty() {
        let msg = if view.products_loaded {
            "No products available"
        } else {
            "Loading products..."
        };
        f.render_widget(placeholder(msg, block), area);
        return;
    }
    let items: Vec<ListItem> = view
        .products
        .iter()
        .map(|p| {
            let mut spans = vec![Span::raw(p.display_name().to_string())];
            if p.display_name() != p.id {
                spans.push(Span::styled(
                    format!("  {}", p.id),
                    Style::default().fg(Color::Gray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let mut list = List::new(items).block(block).highlight_symbol("> ");
    if focused {
        list = list.highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    }
    let mut state = ListState::default();
    state.select(Some(view.product_cursor));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_instances(area: Rect, f: &mut Frame, view: &SetupView) {
    let focused = view.focus == SetupFocus::Instances;
    let block = list_block("Registered instances (t test, d delete)", focused);
    if view.instances.is_empty() {
        let msg = if view.instances_loaded {
            "No instances yet. Pick a product and press g."
        } else {
            "Loading instances..."
        };
        f.render_widget(placeholder(msg, block), area);
        return;
    }
    let items: Vec<ListItem> = view
        .instances
        .iter()
        .map(|inst| {
            ListItem::new(vec![
                Line::from(inst.instance_id.clone()),
                Line::from(Span::styled(
                    format!(
                        "  {} {}  {}",
                        inst.product_id,
                        inst.version,
                        inst.registered_at.as_deref().unwrap_or("")
                    ),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();
    let mut list = List::new(items).block(block).highlight_symbol("> ");
    if focused {
        list = list.highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    }
    let mut state = ListState::default();
    state.select(Some(view.instance_cursor));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_check(area: Rect, f: &mut Frame, view: &SetupView) {
    let mut lines = vec![Line::from(vec![
        Span::styled("Feature:", Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(view.feature_id(), Style::default().fg(Color::Cyan)),
        Span::styled("  (f next)", Style::default().fg(Color::DarkGray)),
    ])];
    match view.last_check.as_ref() {
        Some(check) => {
            let (verdict, color) = if check.enabled {
                ("ALLOW", Color::Green)
            } else {
                ("DENY", Color::Red)
            };
            lines.push(Line::from(vec![
                Span::styled(verdict, Style::default().fg(color)),
                Span::raw(format!(" {} on {}", check.feature_id, check.instance_id)),
                Span::styled(format!("  {}", check.reason), Style::default().fg(Color::Gray)),
            ]));
        }
        None => lines.push(Line::from(Span::styled(
            "No feature checked yet",
            Style::default().fg(Color::Gray),
        ))),
    }
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Feature check")),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeatureCheck, Instance, Product};
    use ratatui::{backend::TestBackend, Terminal};

    fn render(view: &SetupView) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| draw_setup(f.area(), f, view)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn shows_products_instances_and_last_check() {
        let view = SetupView {
            products: vec![Product {
                id: "demo-app".into(),
                name: Some("Demo App".into()),
            }],
            products_loaded: true,
            instances: vec![Instance {
                instance_id: "demo-app-1".into(),
                product_id: "demo-app".into(),
                version: "1.0.0".into(),
                registered_at: None,
            }],
            instances_loaded: true,
            last_check: Some(FeatureCheck {
                instance_id: "demo-app-1".into(),
                feature_id: "pdf_export".into(),
                enabled: false,
                reason: "tier_required".into(),
            }),
            ..Default::default()
        };
        let text = render(&view);
        assert!(text.contains("> Demo App  demo-app"));
        assert!(text.contains("demo-app-1"));
        assert!(text.contains("DENY pdf_export on demo-app-1"));
        assert!(text.contains("Feature: basic_reports"));
    }

    #[test]
    fn empty_lists_explain_what_to_do() {
        let view = SetupView {
            products_loaded: true,
            instances_loaded: true,
            ..Default::default()
        };
        let text = render(&view);
        assert!(text.contains("No products available"));
        assert!(text.contains("No instances yet"));
    }
}
