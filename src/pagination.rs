//! Pagination expansion: repeatedly trigger a "load more" affordance until
//! the visible item count stops growing.
//!
//! One algorithm, parameterized by an [`ExpansionProfile`]: the brand
//! product grid and the recipe/article listing pages differ only in their
//! selector tables. The run is a small state machine:
//!
//! ```text
//! Scanning ──(no visible pager)──▶ Exhausted
//!    │ pager found
//!    ▼
//! Expanding ──(click)──▶ WaitingForGrowth ──▶ Scanning
//! ```
//!
//! A failed click or a stalled growth wait re-enters `Scanning`; only a
//! missing pager or the round cap terminates the run.

use crate::dom::PageDom;
use crate::interact::{self, OverlayRule, Timing};
use crate::session::SessionError;
use std::time::Duration;
use tracing::{debug, info};

/// Text-match fallback for pagers that carry no stable class.
#[derive(Debug, Clone)]
pub struct PagerTextRule {
    pub css: String,
    pub texts: Vec<String>,
}

/// Selector profile for one expandable grid or listing.
#[derive(Debug, Clone)]
pub struct ExpansionProfile {
    /// Short name used in logs.
    pub name: &'static str,
    /// Container that must exist for the run to make sense (grids only).
    pub container: Option<String>,
    /// Candidate pager selectors, ordered; first visible match wins.
    pub pagers: Vec<String>,
    /// Fallback pager located by exact text.
    pub pager_text: Option<PagerTextRule>,
    /// Row/card selector used to detect growth.
    pub rows: String,
    /// Scroll to the document bottom before each scan (listing pages).
    pub bottom_scroll: bool,
    /// Overlays to dismiss right before each pager click.
    pub overlays: Vec<OverlayRule>,
}

/// Caps and waits bounding one expansion run.
#[derive(Debug, Clone)]
pub struct ExpansionBudget {
    /// Global cap on scan/click rounds.
    pub round_cap: usize,
    /// Growth-wait polls after a click.
    pub growth_polls: usize,
    /// Interval between growth polls.
    pub poll_interval: Duration,
    /// Incremental scroll steps used to reveal the next pager.
    pub reveal_steps: usize,
    /// Pixels per reveal step.
    pub reveal_step_px: i64,
    /// Interaction waits.
    pub timing: Timing,
}

impl Default for ExpansionBudget {
    fn default() -> Self {
        Self {
            round_cap: 25,
            growth_polls: 10,
            poll_interval: Duration::from_millis(1000),
            reveal_steps: 10,
            reveal_step_px: 400,
            timing: Timing::default(),
        }
    }
}

impl ExpansionBudget {
    /// Zero-wait budget for scripted fakes.
    pub fn instant() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            timing: Timing::instant(),
            ..Self::default()
        }
    }
}

/// Why an expansion run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// No visible pager remained; the grid is fully expanded.
    NoPager,
    /// The round cap was reached first.
    RoundCap,
}

/// Result of one expansion run.
#[derive(Debug, Clone)]
pub struct ExpansionOutcome {
    pub rounds: usize,
    pub clicks: usize,
    /// Final rendered row count.
    pub rows: usize,
    pub exhausted: Exhaustion,
}

/// Progress owned by a single run; never shared across pages.
#[derive(Debug, Clone, Default)]
struct PaginationState {
    rounds: usize,
    last_count: usize,
    exhausted: bool,
}

/// A located pager control.
#[derive(Debug, Clone)]
struct PagerLoc {
    css: String,
    index: usize,
}

enum Phase {
    Scanning,
    Expanding(PagerLoc),
    WaitingForGrowth { before: usize },
    Exhausted(Exhaustion),
}

/// Expand a grid or listing until no further content appears.
///
/// DOM-level misses are tolerated and re-scanned; only session transport
/// failures propagate.
pub async fn expand(
    dom: &dyn PageDom,
    profile: &ExpansionProfile,
    budget: &ExpansionBudget,
) -> Result<ExpansionOutcome, SessionError> {
    let mut state = PaginationState::default();
    let mut clicks = 0usize;
    let mut phase = Phase::Scanning;

    loop {
        match phase {
            Phase::Scanning => {
                if state.rounds >= budget.round_cap {
                    phase = Phase::Exhausted(Exhaustion::RoundCap);
                    continue;
                }
                state.rounds += 1;

                if profile.bottom_scroll {
                    dom.scroll_to_bottom().await?;
                    sleep(budget.poll_interval).await;
                }

                phase = match scan_pager(dom, profile).await? {
                    Some(loc) => Phase::Expanding(loc),
                    None => {
                        debug!(profile = profile.name, "no visible pager");
                        Phase::Exhausted(Exhaustion::NoPager)
                    }
                };
            }

            Phase::Expanding(loc) => {
                state.last_count = dom.count(&profile.rows).await?;
                let _ = dom.scroll_into_view(&loc.css, loc.index).await;
                interact::dismiss_overlays(dom, &profile.overlays, &budget.timing).await;

                let outcome =
                    interact::resilient_click(dom, &loc.css, loc.index, &budget.timing).await;
                if outcome.clicked() {
                    clicks += 1;
                    phase = Phase::WaitingForGrowth {
                        before: state.last_count,
                    };
                } else {
                    // The pager moved or refused the click; locate it again.
                    debug!(profile = profile.name, ?outcome, "pager click missed, rescanning");
                    phase = Phase::Scanning;
                }
            }

            Phase::WaitingForGrowth { before } => {
                let mut grew = false;
                for _ in 0..budget.growth_polls {
                    let now = dom.count(&profile.rows).await?;
                    if now > before {
                        debug!(
                            profile = profile.name,
                            round = state.rounds,
                            "rows {before} -> {now}"
                        );
                        state.last_count = now;
                        grew = true;
                        break;
                    }
                    sleep(budget.poll_interval).await;
                }

                if grew {
                    reveal_next_pager(dom, profile, budget).await?;
                } else {
                    // Transient stall, not failure; the outer loop re-scans.
                    debug!(profile = profile.name, "growth wait stalled");
                }
                phase = Phase::Scanning;
            }

            Phase::Exhausted(kind) => {
                state.exhausted = true;
                let rows = dom.count(&profile.rows).await?;
                info!(
                    profile = profile.name,
                    rounds = state.rounds,
                    clicks,
                    rows,
                    ?kind,
                    "expansion complete"
                );
                return Ok(ExpansionOutcome {
                    rounds: state.rounds,
                    clicks,
                    rows,
                    exhausted: kind,
                });
            }
        }
    }
}

/// Locate a visible pager: structural candidates in order, then the text
/// fallback.
async fn scan_pager(
    dom: &dyn PageDom,
    profile: &ExpansionProfile,
) -> Result<Option<PagerLoc>, SessionError> {
    for css in &profile.pagers {
        if let Some(index) = dom.first_visible(css).await? {
            return Ok(Some(PagerLoc {
                css: css.clone(),
                index,
            }));
        }
    }
    if let Some(rule) = &profile.pager_text {
        if let Some(index) = dom.first_visible_with_text(&rule.css, &rule.texts).await? {
            return Ok(Some(PagerLoc {
                css: rule.css.clone(),
                index,
            }));
        }
    }
    Ok(None)
}

/// After growth, nudge the viewport in small steps until the next pager
/// renders; virtualized layouts only mount it once nearby.
async fn reveal_next_pager(
    dom: &dyn PageDom,
    profile: &ExpansionProfile,
    budget: &ExpansionBudget,
) -> Result<(), SessionError> {
    for _ in 0..budget.reveal_steps {
        if scan_pager(dom, profile).await?.is_some() {
            break;
        }
        dom.scroll_by(budget.reveal_step_px).await?;
        sleep(budget.poll_interval / 2).await;
    }
    Ok(())
}

async fn sleep(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeGrid;

    fn profile() -> ExpansionProfile {
        ExpansionProfile {
            name: "test-grid",
            container: Some("#grid".into()),
            pagers: vec![FakeGrid::PAGER.to_string()],
            pager_text: None,
            rows: FakeGrid::ROWS.to_string(),
            bottom_scroll: false,
            overlays: Vec::new(),
        }
    }

    #[tokio::test]
    async fn one_click_reveals_remaining_rows() {
        // 2 rows visible, one More control adding 2 more, then no pager.
        let dom = FakeGrid::new(2, 4, 2);
        let outcome = expand(&dom, &profile(), &ExpansionBudget::instant())
            .await
            .unwrap();
        assert_eq!(outcome.clicks, 1);
        assert_eq!(outcome.rows, 4);
        assert_eq!(outcome.exhausted, Exhaustion::NoPager);
        assert_eq!(dom.clicks(), 1);
    }

    #[tokio::test]
    async fn expands_across_many_pages() {
        let dom = FakeGrid::new(10, 100, 10);
        let outcome = expand(&dom, &profile(), &ExpansionBudget::instant())
            .await
            .unwrap();
        assert_eq!(outcome.rows, 100);
        assert_eq!(outcome.clicks, 9);
        assert_eq!(outcome.exhausted, Exhaustion::NoPager);
    }

    #[tokio::test]
    async fn empty_grid_exhausts_immediately() {
        let dom = FakeGrid::exhausted();
        let outcome = expand(&dom, &profile(), &ExpansionBudget::instant())
            .await
            .unwrap();
        assert_eq!(outcome.clicks, 0);
        assert_eq!(outcome.exhausted, Exhaustion::NoPager);
        assert_eq!(outcome.rounds, 1);
    }

    #[tokio::test]
    async fn stalled_growth_terminates_at_round_cap() {
        // Pager stays visible but clicks never add rows.
        let dom = FakeGrid::new(2, 100, 2).with_growth_frozen();
        let budget = ExpansionBudget::instant();
        let outcome = expand(&dom, &profile(), &budget).await.unwrap();
        assert_eq!(outcome.exhausted, Exhaustion::RoundCap);
        assert_eq!(outcome.rounds, budget.round_cap);
        assert_eq!(outcome.rows, 2);
    }

    #[tokio::test]
    async fn text_fallback_finds_unclassed_pager() {
        let dom = FakeGrid::new(2, 4, 2).with_text_pager("more");
        let profile = ExpansionProfile {
            pagers: Vec::new(),
            pager_text: Some(PagerTextRule {
                css: FakeGrid::PAGER.to_string(),
                texts: vec!["more".to_string()],
            }),
            ..profile()
        };
        let outcome = expand(&dom, &profile, &ExpansionBudget::instant())
            .await
            .unwrap();
        assert_eq!(outcome.rows, 4);
        assert_eq!(outcome.clicks, 1);
    }
}
