//! Scripted [`PageDom`] fakes for unit tests. No browser involved.

use crate::dom::{AnchorRef, ClickStrategy, Interaction, PageDom};
use crate::session::SessionError;
use async_trait::async_trait;
use std::sync::Mutex;

// ── FakeGrid: an expandable grid with one pager ─────────────────────────────

#[derive(Debug, Default)]
struct GridState {
    rows: usize,
    total: usize,
    page: usize,
    clicks: usize,
    native_blocked: bool,
    growth_frozen: bool,
    pager_text: Option<String>,
}

/// A grid of `rows` out of `total`, growing by `page` per pager click.
/// The pager is visible exactly while rows remain unloaded.
pub struct FakeGrid {
    state: Mutex<GridState>,
}

impl FakeGrid {
    pub const ROWS: &'static str = "#grid div.row";
    pub const PAGER: &'static str = "#grid a.load-more";

    pub fn new(rows: usize, total: usize, page: usize) -> Self {
        Self {
            state: Mutex::new(GridState {
                rows,
                total,
                page,
                ..GridState::default()
            }),
        }
    }

    /// A grid with nothing to expand.
    pub fn exhausted() -> Self {
        Self::new(0, 0, 0)
    }

    /// Native clicks bounce off (a sticky header covers the pager).
    pub fn with_native_click_blocked(self) -> Self {
        self.state.lock().unwrap().native_blocked = true;
        self
    }

    /// Clicks land but never add rows.
    pub fn with_growth_frozen(self) -> Self {
        self.state.lock().unwrap().growth_frozen = true;
        self
    }

    /// The pager carries no class and is only findable by its text.
    pub fn with_text_pager(self, text: &str) -> Self {
        self.state.lock().unwrap().pager_text = Some(text.to_string());
        self
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().clicks
    }

    fn pager_active(state: &GridState) -> bool {
        state.total > 0 && state.rows < state.total
    }
}

#[async_trait]
impl PageDom for FakeGrid {
    async fn count(&self, css: &str) -> Result<usize, SessionError> {
        let state = self.state.lock().unwrap();
        if css == Self::ROWS {
            Ok(state.rows)
        } else {
            Ok(0)
        }
    }

    async fn first_visible(&self, css: &str) -> Result<Option<usize>, SessionError> {
        let state = self.state.lock().unwrap();
        if css == Self::PAGER && Self::pager_active(&state) && state.pager_text.is_none() {
            Ok(Some(0))
        } else {
            Ok(None)
        }
    }

    async fn first_visible_with_text(
        &self,
        css: &str,
        texts: &[String],
    ) -> Result<Option<usize>, SessionError> {
        let state = self.state.lock().unwrap();
        let matches = state
            .pager_text
            .as_ref()
            .is_some_and(|t| texts.contains(t));
        if css == Self::PAGER && Self::pager_active(&state) && matches {
            Ok(Some(0))
        } else {
            Ok(None)
        }
    }

    async fn text_within(
        &self,
        _css: &str,
        _index: usize,
        _inner: &str,
    ) -> Result<Option<String>, SessionError> {
        Ok(None)
    }

    async fn anchors(&self, _css: &str) -> Result<Vec<AnchorRef>, SessionError> {
        Ok(Vec::new())
    }

    async fn anchors_within(
        &self,
        _css: &str,
        _index: usize,
        _inner: &str,
    ) -> Result<Option<Vec<AnchorRef>>, SessionError> {
        Ok(None)
    }

    async fn hover(&self, _css: &str, _index: usize) -> Result<Interaction, SessionError> {
        Ok(Interaction::NotFound)
    }

    async fn click(
        &self,
        css: &str,
        index: usize,
        strategy: ClickStrategy,
    ) -> Result<Interaction, SessionError> {
        let mut state = self.state.lock().unwrap();
        if css != Self::PAGER || !Self::pager_active(&state) {
            return Ok(Interaction::NotFound);
        }
        if index > 0 {
            return Ok(Interaction::Stale);
        }
        if strategy == ClickStrategy::Native && state.native_blocked {
            return Ok(Interaction::Rejected);
        }
        state.clicks += 1;
        if !state.growth_frozen {
            state.rows = (state.rows + state.page).min(state.total);
        }
        Ok(Interaction::Applied)
    }

    async fn click_by_text(
        &self,
        _css: &str,
        _texts: &[String],
    ) -> Result<Interaction, SessionError> {
        Ok(Interaction::NotFound)
    }

    async fn click_close_within(
        &self,
        _scope: &str,
        _control: &str,
        _labels: &[String],
    ) -> Result<Interaction, SessionError> {
        Ok(Interaction::NotFound)
    }

    async fn suppress_frames(
        &self,
        _frame_css: &str,
        _control: &str,
        _labels: &[String],
    ) -> Result<usize, SessionError> {
        Ok(0)
    }

    async fn hide_all_visible(&self, _css: &str) -> Result<usize, SessionError> {
        Ok(0)
    }

    async fn scroll_into_view(
        &self,
        css: &str,
        index: usize,
    ) -> Result<Interaction, SessionError> {
        let state = self.state.lock().unwrap();
        if css == Self::PAGER && Self::pager_active(&state) && index == 0 {
            Ok(Interaction::Applied)
        } else {
            Ok(Interaction::NotFound)
        }
    }

    async fn scroll_by(&self, _dy: i64) -> Result<(), SessionError> {
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

// ── FakeMenu: a hover-revealed brand menu ───────────────────────────────────

/// One category in the fake menu.
#[derive(Debug, Clone)]
pub struct FakeCategory {
    pub name: String,
    /// Anchors revealed by the primary structural selector.
    pub primary: Vec<AnchorRef>,
    /// Anchors only the generic fallback selector finds.
    pub fallback: Vec<AnchorRef>,
    /// Simulates a node invalidated by a DOM mutation mid-traversal.
    pub stale: bool,
}

#[derive(Debug, Default)]
struct MenuState {
    root_hovered: bool,
    revealed: Vec<bool>,
}

/// A nav menu whose categories reveal brand anchors on hover.
pub struct FakeMenu {
    categories: Vec<FakeCategory>,
    state: Mutex<MenuState>,
}

impl FakeMenu {
    pub const TRIGGER: &'static str = "nav > ul > li:nth-child(1) > span";
    pub const CATEGORIES: &'static str = "nav li.category";
    pub const LABEL: &'static str = "span";
    pub const PRIMARY: &'static str = "li.expanded > div > ul > li > a";
    pub const FALLBACK: &'static str = "div > ul > li > a";

    pub fn new(categories: Vec<FakeCategory>) -> Self {
        let revealed = vec![false; categories.len()];
        Self {
            categories,
            state: Mutex::new(MenuState {
                root_hovered: false,
                revealed,
            }),
        }
    }
}

#[async_trait]
impl PageDom for FakeMenu {
    async fn count(&self, css: &str) -> Result<usize, SessionError> {
        let state = self.state.lock().unwrap();
        if css == Self::CATEGORIES && state.root_hovered {
            Ok(self.categories.len())
        } else {
            Ok(0)
        }
    }

    async fn first_visible(&self, _css: &str) -> Result<Option<usize>, SessionError> {
        Ok(None)
    }

    async fn first_visible_with_text(
        &self,
        _css: &str,
        _texts: &[String],
    ) -> Result<Option<usize>, SessionError> {
        Ok(None)
    }

    async fn text_within(
        &self,
        css: &str,
        index: usize,
        inner: &str,
    ) -> Result<Option<String>, SessionError> {
        if css != Self::CATEGORIES || inner != Self::LABEL {
            return Ok(None);
        }
        Ok(self.categories.get(index).map(|c| c.name.clone()))
    }

    async fn anchors(&self, _css: &str) -> Result<Vec<AnchorRef>, SessionError> {
        Ok(Vec::new())
    }

    async fn anchors_within(
        &self,
        css: &str,
        index: usize,
        inner: &str,
    ) -> Result<Option<Vec<AnchorRef>>, SessionError> {
        if css != Self::CATEGORIES {
            return Ok(None);
        }
        let Some(cat) = self.categories.get(index) else {
            return Ok(None);
        };
        if cat.stale {
            return Ok(None);
        }
        let revealed = self.state.lock().unwrap().revealed[index];
        if !revealed {
            return Ok(Some(Vec::new()));
        }
        match inner {
            Self::PRIMARY => Ok(Some(cat.primary.clone())),
            Self::FALLBACK => Ok(Some(cat.fallback.clone())),
            _ => Ok(Some(Vec::new())),
        }
    }

    async fn hover(&self, css: &str, index: usize) -> Result<Interaction, SessionError> {
        let mut state = self.state.lock().unwrap();
        if css == Self::TRIGGER {
            state.root_hovered = true;
            return Ok(Interaction::Applied);
        }
        if css == Self::CATEGORIES {
            if !state.root_hovered {
                return Ok(Interaction::NotFound);
            }
            match self.categories.get(index) {
                Some(cat) if cat.stale => Ok(Interaction::Stale),
                Some(_) => {
                    state.revealed[index] = true;
                    Ok(Interaction::Applied)
                }
                None => Ok(Interaction::Stale),
            }
        } else {
            Ok(Interaction::NotFound)
        }
    }

    async fn click(
        &self,
        _css: &str,
        _index: usize,
        _strategy: ClickStrategy,
    ) -> Result<Interaction, SessionError> {
        Ok(Interaction::NotFound)
    }

    async fn click_by_text(
        &self,
        _css: &str,
        _texts: &[String],
    ) -> Result<Interaction, SessionError> {
        Ok(Interaction::NotFound)
    }

    async fn click_close_within(
        &self,
        _scope: &str,
        _control: &str,
        _labels: &[String],
    ) -> Result<Interaction, SessionError> {
        Ok(Interaction::NotFound)
    }

    async fn suppress_frames(
        &self,
        _frame_css: &str,
        _control: &str,
        _labels: &[String],
    ) -> Result<usize, SessionError> {
        Ok(0)
    }

    async fn hide_all_visible(&self, _css: &str) -> Result<usize, SessionError> {
        Ok(0)
    }

    async fn scroll_into_view(
        &self,
        _css: &str,
        _index: usize,
    ) -> Result<Interaction, SessionError> {
        Ok(Interaction::NotFound)
    }

    async fn scroll_by(&self, _dy: i64) -> Result<(), SessionError> {
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<(), SessionError> {
        Ok(())
    }
}
