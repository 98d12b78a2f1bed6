//! Step navigation for the tutorial.
//!
//! The current page is always re-derived from the location fragment. Every
//! location notification (initial load, fragment change, history pop) goes
//! through [`Router::render_current_page`], so the two never drift apart.

use async_trait::async_trait;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Welcome,
    Tiers,
    Limits,
    Setup,
    Runtime,
}

pub const PAGE_ORDER: [Page; 5] = [
    Page::Welcome,
    Page::Tiers,
    Page::Limits,
    Page::Setup,
    Page::Runtime,
];

impl Page {
    pub fn fragment(self) -> &'static str {
        match self {
            Page::Welcome => "welcome",
            Page::Tiers => "tiers",
            Page::Limits => "limits",
            Page::Setup => "setup",
            Page::Runtime => "runtime",
        }
    }

    /// Accepts the fragment with or without its leading `#`.
    pub fn from_fragment(fragment: &str) -> Option<Page> {
        let name = fragment.strip_prefix('#').unwrap_or(fragment);
        PAGE_ORDER.iter().copied().find(|p| p.fragment() == name)
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Welcome => "Welcome",
            Page::Tiers => "Tiers",
            Page::Limits => "Limits",
            Page::Setup => "Setup",
            Page::Runtime => "Runtime",
        }
    }

    pub fn index(self) -> usize {
        PAGE_ORDER
            .iter()
            .position(|p| *p == self)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationEvent {
    Load,
    HashChange,
    PopState,
}

/// Addressable location: the `#page` fragment plus a back history.
#[derive(Debug)]
pub struct Location {
    fragment: String,
    history: Vec<String>,
    pending: VecDeque<LocationEvent>,
}

impl Location {
    pub fn new(initial: &str) -> Self {
        Self {
            fragment: initial.trim_start_matches('#').to_string(),
            history: Vec::new(),
            pending: VecDeque::from([LocationEvent::Load]),
        }
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Assigning the current fragment again is not a change and notifies nobody.
    pub fn set_fragment(&mut self, fragment: &str) {
        let fragment = fragment.trim_start_matches('#');
        if fragment == self.fragment {
            return;
        }
        let previous = std::mem::replace(&mut self.fragment, fragment.to_string());
        self.history.push(previous);
        self.pending.push_back(LocationEvent::HashChange);
    }

    /// Rewrite the current fragment in place. Leaves history alone and queues no
    /// notification; the caller renders the new page itself.
    pub fn replace_fragment(&mut self, fragment: &str) {
        self.fragment = fragment.trim_start_matches('#').to_string();
    }

    /// Browser-style back: restore the previous fragment. False when there is none.
    pub fn back(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.fragment = previous;
                self.pending.push_back(LocationEvent::PopState);
                true
            }
            None => false,
        }
    }

    pub fn next_event(&mut self) -> Option<LocationEvent> {
        self.pending.pop_front()
    }
}

/// A page's render contract. Implementations replace their whole render target.
#[async_trait]
pub trait PageRenderer: Send {
    async fn render(&mut self, page: Page) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    pub enabled: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavButtons {
    pub back: ButtonState,
    pub next: ButtonState,
}

#[derive(Debug)]
pub struct Router {
    location: Location,
    current: Page,
}

impl Router {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            current: PAGE_ORDER[0],
        }
    }

    pub fn current_page(&self) -> Page {
        self.current
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Resolve the page from the fragment and render it. Unknown or empty
    /// fragments are redirected to the first page. Render failures belong to the
    /// page and are returned as-is.
    pub async fn render_current_page<R>(&mut self, pages: &mut R) -> anyhow::Result<()>
    where
        R: PageRenderer + ?Sized,
    {
        let page = match Page::from_fragment(self.location.fragment()) {
            Some(page) => page,
            None => {
                let first = PAGE_ORDER[0];
                tracing::debug!(
                    fragment = %self.location.fragment(),
                    "unknown page, redirecting to {}",
                    first.fragment()
                );
                self.location.replace_fragment(first.fragment());
                first
            }
        };
        self.current = page;
        pages.render(page).await
    }

    /// Render once per pending location notification. Returns how many were handled.
    pub async fn process_events<R>(&mut self, pages: &mut R) -> anyhow::Result<usize>
    where
        R: PageRenderer + ?Sized,
    {
        let mut handled = 0;
        while let Some(event) = self.location.next_event() {
            tracing::trace!(?event, fragment = %self.location.fragment(), "location event");
            self.render_current_page(pages).await?;
            handled += 1;
        }
        Ok(handled)
    }

    pub fn navigate_to(&mut self, page: Page) {
        self.location.set_fragment(page.fragment());
    }

    /// Navigate by name; names that are not pages are ignored.
    pub fn navigate_to_name(&mut self, name: &str) {
        if let Some(page) = Page::from_fragment(name) {
            self.navigate_to(page);
        }
    }

    pub fn go_back(&mut self) {
        let index = self.current.index();
        if index > 0 {
            self.navigate_to(PAGE_ORDER[index - 1]);
        }
    }

    pub fn go_next(&mut self) {
        let index = self.current.index();
        if index + 1 < PAGE_ORDER.len() {
            self.navigate_to(PAGE_ORDER[index + 1]);
        }
    }

    /// History pop, as opposed to stepping back through the page order.
    pub fn history_back(&mut self) -> bool {
        self.location.back()
    }

    pub fn nav_buttons(&self) -> NavButtons {
        let index = self.current.index();
        let back = index > 0;
        let next = index + 1 < PAGE_ORDER.len();
        NavButtons {
            back: ButtonState {
                enabled: back,
                visible: back,
            },
            next: ButtonState {
                enabled: next,
                visible: next,
            },
        }
    }
}
