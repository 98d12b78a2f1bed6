use crate::router::Page;
use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

fn arrows_line(what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
        Span::raw(" or "),
        Span::styled("j/k", Style::default().fg(Color::Magenta)),
        Span::raw("  "),
        Span::raw(what),
    ])
}

fn step_lines(page: Page) -> Vec<Line<'static>> {
    match page {
        Page::Welcome | Page::Tiers => Vec::new(),
        Page::Limits => vec![
            Line::from("Limits step:"),
            arrows_line("Previous / next limit type"),
            key_line("Enter/s", 5, "Run simulation"),
            key_line("+/-", 9, "More / fewer iterations"),
            key_line("r", 11, "Reload limit types"),
        ],
        Page::Setup => vec![
            Line::from("Setup step:"),
            key_line("Tab", 9, "Switch between products and instances"),
            arrows_line("Move in the focused list"),
            key_line("Enter", 7, "Register product / test instance"),
            key_line("g", 11, "Register an instance of the product"),
            key_line("f", 11, "Next feature to test"),
            key_line("t", 11, "Test feature on the instance"),
            key_line("d", 11, "Delete the instance"),
            key_line("r", 11, "Reload products and instances"),
        ],
        Page::Runtime => vec![
            Line::from("Runtime step:"),
            arrows_line("Choose instance"),
            key_line("Enter", 7, "Select instance"),
            key_line("r", 11, "Reload instances"),
            key_line("s", 11, "Start simulation"),
            key_line("p", 11, "Pause (start again to rerun)"),
            key_line("x", 11, "Stop simulation"),
            key_line("e", 11, "Export snapshot as JSON"),
            key_line("y", 11, "Copy exported path to clipboard"),
        ],
    }
}

pub fn draw_help(area: Rect, f: &mut Frame, page: Page) {
    let mut lines = vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("←/h", Style::default().fg(Color::Magenta)),
            Span::raw(" "),
            Span::styled("→/l", Style::default().fg(Color::Magenta)),
            Span::raw("     Previous / next step"),
        ]),
        key_line("1-5", 9, "Jump to step"),
        key_line("b", 11, "Back through visited steps"),
        key_line("Esc", 9, "Dismiss message"),
        key_line("?", 11, "Show this help"),
    ];
    let step = step_lines(page);
    if !step.is_empty() {
        lines.push(Line::from(""));
        lines.extend(step);
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
