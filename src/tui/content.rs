//! Static lesson pages. The setup, limits and runtime steps are drawn from their own state.

use crate::router::Page;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub(super) fn heading(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ))
}

fn bullet(text: &'static str) -> Line<'static> {
    Line::from(vec![Span::raw("  • "), Span::raw(text)])
}

pub(super) fn bullet_owned(text: String) -> Line<'static> {
    Line::from(vec![Span::raw("  • "), Span::raw(text)])
}

fn tier_row(feature: &'static str, basic: bool, pro: bool, enterprise: bool) -> Line<'static> {
    let mark = |on: bool| {
        if on {
            Span::styled(format!("{:<14}", "yes"), Style::default().fg(Color::Green))
        } else {
            Span::styled(format!("{:<14}", "-"), Style::default().fg(Color::DarkGray))
        }
    };
    Line::from(vec![
        Span::raw(format!("  {feature:<18}")),
        mark(basic),
        mark(pro),
        mark(enterprise),
    ])
}

fn welcome_lines(base_url: &str) -> Vec<Line<'static>> {
    vec![
        heading("Welcome to the LCC SDK tutorial"),
        Line::from(""),
        Line::from(
            "This walkthrough covers license tiers, limit types, SDK integration and \
             live runtime behaviour observed against a running simulation.",
        ),
        Line::from(""),
        Line::from(vec![
            Span::styled("Server:", Style::default().fg(Color::Gray)),
            Span::raw(" "),
            Span::styled(base_url.to_string(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(""),
        heading("What you'll learn"),
        bullet("How licenses control feature availability (tiers)"),
        bullet("How limits control usage amounts (quota, TPS, capacity, concurrency)"),
        bullet("How to integrate the SDK into an application"),
        bullet("How to handle license checks and denials gracefully"),
    ]
}

fn tiers_lines() -> Vec<Line<'static>> {
    vec![
        heading("Lesson 1: license tiers"),
        Line::from(""),
        Line::from(
            "Each tier is a license for the same product. Features outside the tier \
             are denied at runtime with a reason naming the tier that unlocks them.",
        ),
        Line::from(""),
        Line::from(vec![
            Span::raw(format!("  {:<18}", "")),
            Span::styled(format!("{:<14}", "Basic"), Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:<14}", "Professional"),
                Style::default().fg(Color::Gray),
            ),
            Span::styled(
                format!("{:<14}", "Enterprise"),
                Style::default().fg(Color::Gray),
            ),
        ]),
        tier_row("Basic Reports", true, true, true),
        tier_row("ML Analytics", false, true, true),
        tier_row("PDF Export", false, true, true),
        tier_row("API Access", false, true, true),
        tier_row("Excel Export", false, false, true),
        tier_row("Custom Dashboard", false, false, true),
        Line::from(""),
        Line::from(vec![
            Span::styled("Pricing:", Style::default().fg(Color::Gray)),
            Span::raw(" Basic free or $9/month, Professional $49/month, Enterprise $299/month"),
        ]),
    ]
}

/// Draw one of the stateless lesson steps.
pub fn draw_static_page(page: Page, area: Rect, f: &mut Frame, base_url: &str) {
    let lines = match page {
        Page::Welcome => welcome_lines(base_url),
        Page::Tiers => tiers_lines(),
        Page::Limits | Page::Setup | Page::Runtime => Vec::new(),
    };
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(page.title()));
    f.render_widget(p, area);
}
