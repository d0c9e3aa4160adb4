//! Interaction primitives: overlay suppression and the layered click.
//!
//! Overlays (consent banners, survey popups) are best-effort obstructions;
//! dismissal never fails the caller. Clicking falls through three strategies
//! because sticky headers and animated menus routinely intercept the first
//! two on this class of site.

use crate::dom::{ClickStrategy, Interaction, PageDom};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fixed waits used by the primitives. Tests zero these out.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Pause after an overlay closes, letting the DOM settle.
    pub settle: Duration,
    /// Budget for the wait-until-clickable phase of a native click.
    pub click_wait: Duration,
    /// Interval between clickability polls.
    pub poll: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(1500),
            click_wait: Duration::from_secs(3),
            poll: Duration::from_millis(200),
        }
    }
}

impl Timing {
    /// All-zero waits, for scripted fakes.
    pub fn instant() -> Self {
        Self {
            settle: Duration::ZERO,
            click_wait: Duration::ZERO,
            poll: Duration::ZERO,
        }
    }
}

/// One overlay variant and how to close it.
#[derive(Debug, Clone)]
pub enum OverlayRule {
    /// Cookie consent: exact-text accept button, then a vendor button id.
    CookieBanner {
        controls: String,
        accept_texts: Vec<String>,
        consent_button: String,
    },
    /// Survey iframe: same-origin close attempt, then hide the frame.
    SurveyFrame {
        frames: String,
        close_controls: String,
        close_labels: Vec<String>,
    },
    /// Survey dialog: labeled close control, hide the container as fallback.
    SurveyDialog {
        container: String,
        close_controls: String,
        close_labels: Vec<String>,
    },
}

impl OverlayRule {
    pub fn kind(&self) -> &'static str {
        match self {
            OverlayRule::CookieBanner { .. } => "cookie-banner",
            OverlayRule::SurveyFrame { .. } => "survey-frame",
            OverlayRule::SurveyDialog { .. } => "survey-dialog",
        }
    }
}

/// Dismiss one overlay variant. Silent on absence; transport failures are
/// logged and swallowed; an overlay is never a blocking precondition.
pub async fn dismiss_overlay(dom: &dyn PageDom, rule: &OverlayRule, timing: &Timing) {
    let closed = match rule {
        OverlayRule::CookieBanner {
            controls,
            accept_texts,
            consent_button,
        } => match dom.click_by_text(controls, accept_texts).await {
            Ok(Interaction::Applied) => {
                debug!("cookie banner dismissed");
                true
            }
            Ok(_) => match dom.click(consent_button, 0, ClickStrategy::Native).await {
                Ok(Interaction::Applied) => {
                    debug!("cookie banner dismissed (vendor button)");
                    true
                }
                Ok(_) => false,
                Err(e) => {
                    warn!(kind = rule.kind(), "overlay dismissal error: {e}");
                    false
                }
            },
            Err(e) => {
                warn!(kind = rule.kind(), "overlay dismissal error: {e}");
                false
            }
        },
        OverlayRule::SurveyFrame {
            frames,
            close_controls,
            close_labels,
        } => match dom.suppress_frames(frames, close_controls, close_labels).await {
            Ok(n) if n > 0 => {
                debug!(hidden = n, "survey frames suppressed");
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(kind = rule.kind(), "overlay dismissal error: {e}");
                false
            }
        },
        OverlayRule::SurveyDialog {
            container,
            close_controls,
            close_labels,
        } => match dom
            .click_close_within(container, close_controls, close_labels)
            .await
        {
            Ok(Interaction::Applied) => {
                debug!("survey dialog closed");
                true
            }
            // The dialog is present but has no recognizable close control:
            // hide it outright.
            Ok(Interaction::Rejected) => match dom.hide_all_visible(container).await {
                Ok(n) => {
                    debug!(hidden = n, "survey dialog hidden");
                    n > 0
                }
                Err(e) => {
                    warn!(kind = rule.kind(), "overlay dismissal error: {e}");
                    false
                }
            },
            Ok(_) => false,
            Err(e) => {
                warn!(kind = rule.kind(), "overlay dismissal error: {e}");
                false
            }
        },
    };

    if closed && !timing.settle.is_zero() {
        tokio::time::sleep(timing.settle).await;
    }
}

/// Dismiss every overlay rule in order.
pub async fn dismiss_overlays(dom: &dyn PageDom, rules: &[OverlayRule], timing: &Timing) {
    for rule in rules {
        dismiss_overlay(dom, rule, timing).await;
    }
}

/// Result of a resilient click attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click landed; records which strategy finally worked.
    Clicked(ClickStrategy),
    /// The target never existed.
    NotFound,
    /// Every strategy failed.
    Failed,
}

impl ClickOutcome {
    pub fn clicked(self) -> bool {
        matches!(self, ClickOutcome::Clicked(_))
    }
}

/// Click the nth match of `css`, falling through three strategies:
/// scroll-into-view + wait-until-clickable + native click, then a forced
/// scripted click, then a synthesized pointer sequence. Never raises;
/// transport errors degrade to [`ClickOutcome::Failed`].
pub async fn resilient_click(
    dom: &dyn PageDom,
    css: &str,
    index: usize,
    timing: &Timing,
) -> ClickOutcome {
    match dom.scroll_into_view(css, index).await {
        Ok(Interaction::NotFound) => return ClickOutcome::NotFound,
        Ok(_) => {}
        Err(e) => {
            warn!("scroll_into_view failed: {e}");
            return ClickOutcome::Failed;
        }
    }

    // Strategy 1: native click once the element is clickable.
    let deadline = Instant::now() + timing.click_wait;
    loop {
        match dom.click(css, index, ClickStrategy::Native).await {
            Ok(Interaction::Applied) => return ClickOutcome::Clicked(ClickStrategy::Native),
            Ok(Interaction::NotFound) => return ClickOutcome::NotFound,
            // Rejected (covered/hidden) or Stale: poll until the budget runs out.
            Ok(_) => {}
            Err(e) => {
                warn!("native click errored: {e}");
                break;
            }
        }
        if Instant::now() >= deadline {
            break;
        }
        if !timing.poll.is_zero() {
            tokio::time::sleep(timing.poll).await;
        }
    }

    // Strategy 2: forced scripted click.
    match dom.click(css, index, ClickStrategy::Scripted).await {
        Ok(Interaction::Applied) => return ClickOutcome::Clicked(ClickStrategy::Scripted),
        Ok(_) | Err(_) => {}
    }

    // Strategy 3: simulated pointer move-and-click.
    match dom.click(css, index, ClickStrategy::Pointer).await {
        Ok(Interaction::Applied) => ClickOutcome::Clicked(ClickStrategy::Pointer),
        Ok(_) => ClickOutcome::Failed,
        Err(e) => {
            warn!("pointer click errored: {e}");
            ClickOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeGrid;

    fn timing() -> Timing {
        Timing::instant()
    }

    #[tokio::test]
    async fn resilient_click_reports_not_found() {
        let dom = FakeGrid::exhausted();
        let outcome = resilient_click(&dom, "#missing", 0, &timing()).await;
        assert_eq!(outcome, ClickOutcome::NotFound);
    }

    #[tokio::test]
    async fn resilient_click_falls_back_to_scripted() {
        // A grid whose pager rejects native clicks (covered by a header).
        let dom = FakeGrid::new(2, 4, 2).with_native_click_blocked();
        let outcome = resilient_click(&dom, FakeGrid::PAGER, 0, &timing()).await;
        assert_eq!(outcome, ClickOutcome::Clicked(ClickStrategy::Scripted));
        assert_eq!(dom.clicks(), 1);
    }

    #[tokio::test]
    async fn overlay_dismissal_is_silent_on_absence() {
        let dom = FakeGrid::exhausted();
        let rule = OverlayRule::SurveyDialog {
            container: "div.survey".into(),
            close_controls: "button".into(),
            close_labels: vec!["close".into()],
        };
        // Nothing to assert beyond "does not panic / does not error".
        dismiss_overlay(&dom, &rule, &timing()).await;
    }
}
