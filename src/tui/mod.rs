mod content;
mod dashboard;
mod export;
mod help;
mod limits;
mod pages;
mod setup;
mod state;

use crate::api::TutorialApi;
use crate::cli::AppConfig;
use crate::router::{Location, Page, Router, PAGE_ORDER};
use crate::simulation::{ControlAction, SimUpdate};
use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use crate::lessons::SetupFocus;
use pages::{PageState, Pages, UiMessage};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame, Terminal,
};
use state::UiState;
use std::{io, sync::Arc, time::Duration};
use tokio::sync::mpsc::{self, UnboundedReceiver};

pub async fn run(cfg: AppConfig) -> Result<()> {
    let api = Arc::new(cfg.connect()?);
    // Unbounded channels keep poll tasks and request tasks from ever waiting on the UI.
    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel::<SimUpdate>();
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<UiMessage>();

    let mut pages = Pages::new(
        api,
        cfg.simulation.clone(),
        cfg.instance.clone(),
        updates_tx,
        msg_tx,
    )
    .with_registration(cfg.registration.clone());
    let mut router = Router::new(Location::new(&cfg.initial_page));
    let mut state = UiState {
        base_url: cfg.base_url.clone(),
        ..Default::default()
    };

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let res = event_loop(
        &mut terminal,
        &mut router,
        &mut pages,
        &mut state,
        &mut updates_rx,
        &mut msg_rx,
    )
    .await;

    pages.shutdown();
    disable_raw_mode().ok();
    execute!(io::stdout(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    res
}

async fn event_loop<B, A>(
    terminal: &mut Terminal<B>,
    router: &mut Router,
    pages: &mut Pages<A>,
    state: &mut UiState,
    updates_rx: &mut UnboundedReceiver<SimUpdate>,
    msg_rx: &mut UnboundedReceiver<UiMessage>,
) -> Result<()>
where
    B: Backend,
    A: TutorialApi,
{
    let mut keys = EventStream::new();
    let mut redraw = tokio::time::interval(Duration::from_millis(100));
    redraw.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        router.process_events(pages).await?;
        terminal
            .draw(|f| draw(f.area(), f, router, pages, state))
            .context("draw frame")?;

        tokio::select! {
            maybe_event = keys.next() => match maybe_event {
                Some(Ok(Event::Key(k))) if k.kind == KeyEventKind::Press => {
                    if handle_key(k, router, pages, state) == KeyOutcome::Quit {
                        break Ok(());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e).context("read terminal event"),
                None => break Ok(()),
            },
            Some(update) = updates_rx.recv() => {
                pages.apply_update(update);
                // Coalesce bursts into one redraw.
                while let Ok(update) = updates_rx.try_recv() {
                    pages.apply_update(update);
                }
            }
            Some(msg) = msg_rx.recv() => pages.apply_message(msg),
            _ = redraw.tick() => {}
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn handle_key<A: TutorialApi>(
    k: KeyEvent,
    router: &mut Router,
    pages: &mut Pages<A>,
    state: &mut UiState,
) -> KeyOutcome {
    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            return KeyOutcome::Quit;
        }
        (_, KeyCode::Char('?')) => state.show_help = !state.show_help,
        (_, KeyCode::Esc) => {
            state.show_help = false;
            state.info.clear();
            pages.clear_alert();
        }
        (_, KeyCode::Left) | (_, KeyCode::Char('h')) => router.go_back(),
        (_, KeyCode::Right) | (_, KeyCode::Char('l')) => router.go_next(),
        (_, KeyCode::Char(c @ '1'..='5')) => {
            let idx = (c as usize) - ('1' as usize);
            router.navigate_to(PAGE_ORDER[idx]);
        }
        (_, KeyCode::Char('b')) => {
            if !router.history_back() {
                state.info = "No earlier step in history".into();
            }
        }
        (_, code) => match router.current_page() {
            Page::Setup => handle_setup_key(code, pages, state),
            Page::Limits => handle_limits_key(code, pages, state),
            Page::Runtime => handle_runtime_key(code, pages, state),
            Page::Welcome | Page::Tiers => {}
        },
    }
    KeyOutcome::Continue
}

fn handle_setup_key<A: TutorialApi>(code: KeyCode, pages: &mut Pages<A>, state: &mut UiState) {
    match code {
        KeyCode::Tab => {
            if let Some(ctrl) = pages.setup_mut() {
                ctrl.toggle_focus();
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            if let Some(ctrl) = pages.setup_mut() {
                ctrl.move_cursor(-1);
            }
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if let Some(ctrl) = pages.setup_mut() {
                ctrl.move_cursor(1);
            }
        }
        KeyCode::Char('f') => {
            if let Some(ctrl) = pages.setup_mut() {
                ctrl.cycle_feature();
            }
        }
        KeyCode::Enter => pages.setup_action(|c| {
            let focus = c.view().focus;
            match focus {
                SetupFocus::Products => c.register_request(),
                SetupFocus::Instances => c.test_request(),
            }
        }),
        KeyCode::Char('g') => pages.setup_action(|c| c.register_request()),
        KeyCode::Char('t') => pages.setup_action(|c| c.test_request()),
        KeyCode::Char('d') => pages.setup_action(|c| c.clear_request()),
        KeyCode::Char('r') => {
            state.info = "Reloading products and instances...".into();
            pages.reload();
        }
        _ => {}
    }
}

fn handle_limits_key<A: TutorialApi>(code: KeyCode, pages: &mut Pages<A>, state: &mut UiState) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => pages.limits_action(|c| c.select(-1)),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => pages.limits_action(|c| c.select(1)),
        KeyCode::Enter | KeyCode::Char('s') => pages.limits_action(|c| c.simulate_request()),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            if let Some(ctrl) = pages.limits_mut() {
                ctrl.adjust_iterations(5);
            }
        }
        KeyCode::Char('-') => {
            if let Some(ctrl) = pages.limits_mut() {
                ctrl.adjust_iterations(-5);
            }
        }
        KeyCode::Char('r') => {
            state.info = "Reloading limit types...".into();
            pages.reload();
        }
        _ => {}
    }
}

fn handle_runtime_key<A: TutorialApi>(code: KeyCode, pages: &mut Pages<A>, state: &mut UiState) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => {
            if let Some(ctrl) = pages.runtime_mut() {
                ctrl.move_cursor(-1);
            }
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if let Some(ctrl) = pages.runtime_mut() {
                ctrl.move_cursor(1);
            }
        }
        KeyCode::Enter => {
            if let Some(ctrl) = pages.runtime_mut() {
                ctrl.select_at_cursor();
            }
        }
        KeyCode::Char('r') => {
            state.info = "Reloading instances...".into();
            pages.reload();
        }
        KeyCode::Char('s') => pages.control(ControlAction::Start),
        KeyCode::Char('p') => pages.control(ControlAction::Pause),
        KeyCode::Char('x') => pages.control(ControlAction::Stop),
        KeyCode::Char('e') => pages.control(ControlAction::Export),
        KeyCode::Char('y') => {
            if let Some(ctrl) = pages.runtime() {
                export::copy_export_path(ctrl.view(), state);
            }
        }
        _ => {}
    }
}

fn draw<A: TutorialApi>(
    area: Rect,
    f: &mut Frame,
    router: &Router,
    pages: &Pages<A>,
    state: &UiState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let current = router.current_page();
    let tabs = Tabs::new(
        PAGE_ORDER
            .iter()
            .enumerate()
            .map(|(i, p)| Line::from(format!("{} {}", i + 1, p.title())))
            .collect::<Vec<_>>(),
    )
    .select(current.index())
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("lcc-tutorial #{}", router.location().fragment())),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match (current, pages.state()) {
        (Page::Setup, PageState::Setup(ctrl)) => setup::draw_setup(chunks[1], f, ctrl.view()),
        (Page::Limits, PageState::Limits(ctrl)) => limits::draw_limits(chunks[1], f, ctrl.view()),
        (Page::Runtime, PageState::Runtime(ctrl)) => {
            dashboard::draw_dashboard(chunks[1], f, ctrl.view())
        }
        (page @ (Page::Welcome | Page::Tiers), _) => {
            content::draw_static_page(page, chunks[1], f, &state.base_url)
        }
        // Step state not built yet; the next render fills it in.
        _ => {}
    }

    draw_nav_bar(chunks[2], f, router, pages, state);

    if state.show_help {
        let popup = centered(area, 60, 24);
        help::draw_help(popup, f, current);
    }
}

fn draw_nav_bar<A: TutorialApi>(
    area: Rect,
    f: &mut Frame,
    router: &Router,
    pages: &Pages<A>,
    state: &UiState,
) {
    let buttons = router.nav_buttons();
    let mut spans = Vec::new();
    if buttons.back.visible {
        spans.push(Span::styled("← Back", Style::default().fg(Color::Magenta)));
        spans.push(Span::raw("  "));
    }
    if buttons.next.visible {
        spans.push(Span::styled("Next →", Style::default().fg(Color::Magenta)));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled("?", Style::default().fg(Color::Magenta)));
    spans.push(Span::raw(" help  "));

    let alert = match pages.state() {
        PageState::Lesson => None,
        PageState::Setup(ctrl) => ctrl.view().alert.as_ref(),
        PageState::Limits(ctrl) => ctrl.view().alert.as_ref(),
        PageState::Runtime(ctrl) => ctrl.view().alert.as_ref(),
    };
    let mut line = Line::from(spans);
    if let Some(alert) = alert {
        line.spans.extend(dashboard::alert_line(alert).spans);
    } else if !state.info.is_empty() {
        line.spans.push(Span::raw(state.info.clone()));
    }

    f.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::model::SimulationSettings;
    use ratatui::backend::TestBackend;

    fn pages() -> (
        Pages<FakeApi>,
        UnboundedReceiver<UiMessage>,
        UnboundedReceiver<SimUpdate>,
    ) {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let api = Arc::new(FakeApi::with_instances(&["abc123"]));
        (
            Pages::new(api, SimulationSettings::default(), None, updates_tx, msg_tx),
            msg_rx,
            updates_rx,
        )
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn number_keys_jump_and_b_walks_history() {
        let (mut pages, _msgs, _updates) = pages();
        let mut router = Router::new(Location::new("welcome"));
        let mut state = UiState::default();
        router.process_events(&mut pages).await.unwrap();

        handle_key(press(KeyCode::Char('3')), &mut router, &mut pages, &mut state);
        router.process_events(&mut pages).await.unwrap();
        assert_eq!(router.current_page(), Page::Limits);

        handle_key(press(KeyCode::Char('b')), &mut router, &mut pages, &mut state);
        router.process_events(&mut pages).await.unwrap();
        assert_eq!(router.current_page(), Page::Welcome);

        handle_key(press(KeyCode::Char('b')), &mut router, &mut pages, &mut state);
        assert_eq!(state.info, "No earlier step in history");
    }

    #[tokio::test(start_paused = true)]
    async fn setup_keys_delete_the_focused_instance() {
        let (mut pages, mut msgs, _updates) = pages();
        let mut router = Router::new(Location::new("setup"));
        let mut state = UiState::default();
        router.process_events(&mut pages).await.unwrap();
        for _ in 0..2 {
            let msg = msgs.recv().await.unwrap();
            pages.apply_message(msg);
        }

        handle_key(press(KeyCode::Tab), &mut router, &mut pages, &mut state);
        handle_key(press(KeyCode::Char('d')), &mut router, &mut pages, &mut state);
        let msg = msgs.recv().await.unwrap();
        pages.apply_message(msg);

        let view = pages.setup_mut().unwrap().view();
        assert!(view.instances.is_empty());
        assert_eq!(view.focus, SetupFocus::Instances);

        handle_key(press(KeyCode::Esc), &mut router, &mut pages, &mut state);
        assert!(pages.setup_mut().unwrap().view().alert.is_none());
    }

    #[tokio::test]
    async fn quit_keys() {
        let (mut pages, _msgs, _updates) = pages();
        let mut router = Router::new(Location::new(""));
        let mut state = UiState::default();
        assert_eq!(
            handle_key(press(KeyCode::Char('q')), &mut router, &mut pages, &mut state),
            KeyOutcome::Quit
        );
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(
            handle_key(ctrl_c, &mut router, &mut pages, &mut state),
            KeyOutcome::Quit
        );
    }

    #[tokio::test]
    async fn frame_shows_current_step_and_nav() {
        let (mut pages, _msgs, _updates) = pages();
        let mut router = Router::new(Location::new("tiers"));
        let state = UiState::default();
        router.process_events(&mut pages).await.unwrap();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| draw(f.area(), f, &router, &pages, &state))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Lesson 1: license tiers"));
        assert!(text.contains("← Back"));
        assert!(text.contains("Next →"));
    }

    #[test]
    fn centered_popup_fits_small_terminals() {
        let area = Rect::new(0, 0, 40, 10);
        let popup = centered(area, 60, 24);
        assert_eq!(popup, Rect::new(0, 0, 40, 10));
        let popup = centered(Rect::new(0, 0, 100, 40), 60, 24);
        assert_eq!(popup, Rect::new(20, 8, 60, 24));
    }
}
