//! Typed DOM facade over injected JavaScript.
//!
//! Every observation and interaction the pipeline performs goes through the
//! [`PageDom`] trait: selector-addressed, atomic per call, returning explicit
//! outcome values instead of raising. "Element not found" and "the DOM moved
//! under us" are ordinary [`Interaction`] variants; only transport failures
//! surface as [`SessionError`].
//!
//! [`JsDom`] implements the trait for any [`PageContext`] by building small
//! JavaScript IIFEs that return JSON. Selector strings are sanitized before
//! injection and only ever placed inside JS string literals.

use crate::session::{PageContext, SessionError};
use async_trait::async_trait;
use serde_json::Value;

/// Outcome of a single DOM interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// The target was located and the action ran.
    Applied,
    /// Nothing matched the selector.
    NotFound,
    /// The selector matched, but the requested index was gone: the DOM
    /// mutated between probe and act.
    Stale,
    /// The target exists but refused the action (covered, disabled, hidden).
    Rejected,
}

impl Interaction {
    pub fn applied(self) -> bool {
        matches!(self, Interaction::Applied)
    }
}

/// How to trigger a click on a located element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickStrategy {
    /// Visibility + occlusion checked, then a native `click()`.
    Native,
    /// Forced scripted `click()`, no checks.
    Scripted,
    /// Synthesized pointer event sequence at the element's center.
    Pointer,
}

/// An anchor collected from the live DOM. `href` is the browser-resolved
/// absolute URL, matching what the address bar would show after a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRef {
    pub text: String,
    pub href: String,
}

/// Selector-addressed DOM operations.
#[async_trait]
pub trait PageDom: Send + Sync {
    /// Number of nodes matching `css`.
    async fn count(&self, css: &str) -> Result<usize, SessionError>;

    /// Index of the first visible match, if any.
    async fn first_visible(&self, css: &str) -> Result<Option<usize>, SessionError>;

    /// Index of the first visible match whose trimmed, lowercased text
    /// equals one of `texts`.
    async fn first_visible_with_text(
        &self,
        css: &str,
        texts: &[String],
    ) -> Result<Option<usize>, SessionError>;

    /// Trimmed text of the first `inner` match under the nth `css` match
    /// (the node's own text when `inner` is absent). `None` when the nth
    /// match no longer exists.
    async fn text_within(
        &self,
        css: &str,
        index: usize,
        inner: &str,
    ) -> Result<Option<String>, SessionError>;

    /// Every anchor matching `css` (the selector addresses the `<a>` nodes).
    async fn anchors(&self, css: &str) -> Result<Vec<AnchorRef>, SessionError>;

    /// Anchors matching `inner` inside the nth match of `css`.
    /// `None` when the nth match no longer exists.
    async fn anchors_within(
        &self,
        css: &str,
        index: usize,
        inner: &str,
    ) -> Result<Option<Vec<AnchorRef>>, SessionError>;

    /// Dispatch a hover event sequence at the nth match.
    async fn hover(&self, css: &str, index: usize) -> Result<Interaction, SessionError>;

    /// Apply one click strategy to the nth match.
    async fn click(
        &self,
        css: &str,
        index: usize,
        strategy: ClickStrategy,
    ) -> Result<Interaction, SessionError>;

    /// Click the first visible match whose trimmed, lowercased text equals
    /// one of `texts`.
    async fn click_by_text(
        &self,
        css: &str,
        texts: &[String],
    ) -> Result<Interaction, SessionError>;

    /// Inside the first visible match of `scope`, click a close-style control
    /// matching `control`: aria-label or text equal to one of `labels`
    /// (case-insensitive), or a class containing "close".
    async fn click_close_within(
        &self,
        scope: &str,
        control: &str,
        labels: &[String],
    ) -> Result<Interaction, SessionError>;

    /// Suppress visible frames matching `frame_css`: try a same-origin
    /// close-control click inside each, then hide the frame via style.
    /// Returns the number of frames hidden.
    async fn suppress_frames(
        &self,
        frame_css: &str,
        control: &str,
        labels: &[String],
    ) -> Result<usize, SessionError>;

    /// Hide every visible match via `display: none`. Returns count hidden.
    async fn hide_all_visible(&self, css: &str) -> Result<usize, SessionError>;

    /// Center-scroll the nth match into the viewport.
    async fn scroll_into_view(&self, css: &str, index: usize)
        -> Result<Interaction, SessionError>;

    /// Scroll the window by `dy` pixels.
    async fn scroll_by(&self, dy: i64) -> Result<(), SessionError>;

    /// Scroll to the bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<(), SessionError>;
}

/// JS helpers shared by every injected snippet.
const PRELUDE: &str = r#"
const q = (css) => Array.from(document.querySelectorAll(css));
const vis = (el) => {
    const r = el.getBoundingClientRect();
    const s = window.getComputedStyle(el);
    return r.width > 0 && r.height > 0 && s.display !== 'none' && s.visibility !== 'hidden';
};
const nth = (css, i) => {
    const els = q(css);
    if (els.length === 0) return { miss: 'notfound' };
    if (i >= els.length) return { miss: 'stale' };
    return { el: els[i] };
};
"#;

/// [`PageDom`] over any [`PageContext`], via injected JavaScript.
pub struct JsDom<'a, C: PageContext + ?Sized> {
    ctx: &'a C,
}

impl<'a, C: PageContext + ?Sized> JsDom<'a, C> {
    pub fn new(ctx: &'a C) -> Self {
        Self { ctx }
    }

    async fn eval(&self, body: &str) -> Result<Value, SessionError> {
        let script = format!("(() => {{{PRELUDE}\n{body}}})()");
        self.ctx.eval(&script).await
    }
}

fn interaction_from(value: &Value) -> Interaction {
    match value.get("status").and_then(|s| s.as_str()) {
        Some("applied") => Interaction::Applied,
        Some("stale") => Interaction::Stale,
        Some("rejected") => Interaction::Rejected,
        _ => Interaction::NotFound,
    }
}

fn anchors_from(value: &Value) -> Vec<AnchorRef> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let href = item.get("href")?.as_str()?.to_string();
                    let text = item
                        .get("text")
                        .and_then(|t| t.as_str())
                        .unwrap_or("")
                        .to_string();
                    if href.is_empty() {
                        None
                    } else {
                        Some(AnchorRef { text, href })
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// JS fragment mapping an element list to `{text, href}` pairs.
const ANCHOR_MAP: &str =
    "(a) => ({ text: (a.innerText || a.textContent || '').trim(), href: a.href || '' })";

/// JS fragment dispatching a hover event sequence on `el`.
const HOVER_SEQ: &str = r#"
for (const type of ['pointerover', 'pointermove', 'mouseover', 'mousemove', 'mouseenter']) {
    const r = el.getBoundingClientRect();
    el.dispatchEvent(new MouseEvent(type, {
        bubbles: type !== 'mouseenter',
        clientX: r.left + r.width / 2,
        clientY: r.top + r.height / 2,
    }));
}
"#;

#[async_trait]
impl<C: PageContext + ?Sized> PageDom for JsDom<'_, C> {
    async fn count(&self, css: &str) -> Result<usize, SessionError> {
        let body = format!("return q('{}').length;", js_str(css));
        let v = self.eval(&body).await?;
        Ok(v.as_u64().unwrap_or(0) as usize)
    }

    async fn first_visible(&self, css: &str) -> Result<Option<usize>, SessionError> {
        let body = format!("return q('{}').findIndex(vis);", js_str(css));
        let v = self.eval(&body).await?;
        Ok(v.as_i64().filter(|i| *i >= 0).map(|i| i as usize))
    }

    async fn first_visible_with_text(
        &self,
        css: &str,
        texts: &[String],
    ) -> Result<Option<usize>, SessionError> {
        let body = format!(
            "const texts = {};\n\
             return q('{}').findIndex(e => vis(e) &&\n\
                 texts.includes((e.innerText || e.textContent || '').trim().toLowerCase()));",
            js_array(texts),
            js_str(css)
        );
        let v = self.eval(&body).await?;
        Ok(v.as_i64().filter(|i| *i >= 0).map(|i| i as usize))
    }

    async fn text_within(
        &self,
        css: &str,
        index: usize,
        inner: &str,
    ) -> Result<Option<String>, SessionError> {
        let body = format!(
            "const r = nth('{}', {index});\n\
             if (r.miss) return null;\n\
             const t = r.el.querySelector('{}') || r.el;\n\
             return (t.innerText || t.textContent || '').trim();",
            js_str(css),
            js_str(inner)
        );
        let v = self.eval(&body).await?;
        Ok(v.as_str().map(|s| s.to_string()))
    }

    async fn anchors(&self, css: &str) -> Result<Vec<AnchorRef>, SessionError> {
        let body = format!("return q('{}').map({ANCHOR_MAP});", js_str(css));
        let v = self.eval(&body).await?;
        Ok(anchors_from(&v))
    }

    async fn anchors_within(
        &self,
        css: &str,
        index: usize,
        inner: &str,
    ) -> Result<Option<Vec<AnchorRef>>, SessionError> {
        let body = format!(
            "const r = nth('{}', {index});\n\
             if (r.miss) return null;\n\
             return Array.from(r.el.querySelectorAll('{}')).map({ANCHOR_MAP});",
            js_str(css),
            js_str(inner)
        );
        let v = self.eval(&body).await?;
        if v.is_null() {
            return Ok(None);
        }
        Ok(Some(anchors_from(&v)))
    }

    async fn hover(&self, css: &str, index: usize) -> Result<Interaction, SessionError> {
        let body = format!(
            "const r = nth('{}', {index});\n\
             if (r.miss) return {{ status: r.miss }};\n\
             const el = r.el;\n\
             {HOVER_SEQ}\n\
             return {{ status: 'applied' }};",
            js_str(css)
        );
        let v = self.eval(&body).await?;
        Ok(interaction_from(&v))
    }

    async fn click(
        &self,
        css: &str,
        index: usize,
        strategy: ClickStrategy,
    ) -> Result<Interaction, SessionError> {
        let action = match strategy {
            ClickStrategy::Native => {
                // Occlusion check at the element center: another node on top
                // that is neither ancestor nor descendant rejects the click.
                r#"
                if (!vis(el) || el.disabled) return { status: 'rejected' };
                const rect = el.getBoundingClientRect();
                const cx = rect.left + rect.width / 2, cy = rect.top + rect.height / 2;
                const top = document.elementFromPoint(cx, cy);
                if (top && top !== el && !el.contains(top) && !top.contains(el))
                    return { status: 'rejected' };
                el.click();
                return { status: 'applied' };
                "#
            }
            ClickStrategy::Scripted => {
                r#"
                el.click();
                return { status: 'applied' };
                "#
            }
            ClickStrategy::Pointer => {
                r#"
                const rect = el.getBoundingClientRect();
                const cx = rect.left + rect.width / 2, cy = rect.top + rect.height / 2;
                const opts = { bubbles: true, cancelable: true, clientX: cx, clientY: cy };
                for (const type of ['pointerover', 'pointermove', 'pointerdown', 'mousedown',
                                    'pointerup', 'mouseup', 'click']) {
                    el.dispatchEvent(new MouseEvent(type, opts));
                }
                return { status: 'applied' };
                "#
            }
        };
        let body = format!(
            "const r = nth('{}', {index});\n\
             if (r.miss) return {{ status: r.miss }};\n\
             const el = r.el;\n{action}",
            js_str(css)
        );
        let v = self.eval(&body).await?;
        Ok(interaction_from(&v))
    }

    async fn click_by_text(
        &self,
        css: &str,
        texts: &[String],
    ) -> Result<Interaction, SessionError> {
        let body = format!(
            "const texts = {};\n\
             const el = q('{}').find(e => vis(e) &&\n\
                 texts.includes((e.innerText || e.textContent || '').trim().toLowerCase()));\n\
             if (!el) return {{ status: 'notfound' }};\n\
             el.click();\n\
             return {{ status: 'applied' }};",
            js_array(texts),
            js_str(css)
        );
        let v = self.eval(&body).await?;
        Ok(interaction_from(&v))
    }

    async fn click_close_within(
        &self,
        scope: &str,
        control: &str,
        labels: &[String],
    ) -> Result<Interaction, SessionError> {
        let body = format!(
            "const labels = {};\n\
             const matches = (el) => {{\n\
                 const aria = (el.getAttribute('aria-label') || '').trim().toLowerCase();\n\
                 const text = (el.innerText || el.textContent || '').trim().toLowerCase();\n\
                 const cls = (el.className && el.className.toLowerCase) ? el.className.toLowerCase() : '';\n\
                 return labels.includes(aria) || labels.includes(text) || cls.includes('close');\n\
             }};\n\
             const box = q('{}').find(vis);\n\
             if (!box) return {{ status: 'notfound' }};\n\
             const btn = Array.from(box.querySelectorAll('{}')).find(b => vis(b) && matches(b));\n\
             if (!btn) return {{ status: 'rejected' }};\n\
             btn.click();\n\
             return {{ status: 'applied' }};",
            js_array(labels),
            js_str(scope),
            js_str(control)
        );
        let v = self.eval(&body).await?;
        Ok(interaction_from(&v))
    }

    async fn suppress_frames(
        &self,
        frame_css: &str,
        control: &str,
        labels: &[String],
    ) -> Result<usize, SessionError> {
        let body = format!(
            "const labels = {};\n\
             let hidden = 0;\n\
             for (const frame of q('{}')) {{\n\
                 if (!vis(frame)) continue;\n\
                 try {{\n\
                     const doc = frame.contentDocument;\n\
                     if (doc) {{\n\
                         const btn = Array.from(doc.querySelectorAll('{}')).find(b => {{\n\
                             const text = (b.innerText || b.textContent || '').trim().toLowerCase();\n\
                             const cls = (b.className && b.className.toLowerCase) ? b.className.toLowerCase() : '';\n\
                             return labels.includes(text) || cls.includes('close');\n\
                         }});\n\
                         if (btn) btn.click();\n\
                     }}\n\
                 }} catch (e) {{ /* cross-origin frame */ }}\n\
                 frame.style.display = 'none';\n\
                 hidden += 1;\n\
             }}\n\
             return hidden;",
            js_array(labels),
            js_str(frame_css),
            js_str(control)
        );
        let v = self.eval(&body).await?;
        Ok(v.as_u64().unwrap_or(0) as usize)
    }

    async fn hide_all_visible(&self, css: &str) -> Result<usize, SessionError> {
        let body = format!(
            "let hidden = 0;\n\
             for (const el of q('{}')) {{\n\
                 if (!vis(el)) continue;\n\
                 el.style.display = 'none';\n\
                 hidden += 1;\n\
             }}\n\
             return hidden;",
            js_str(css)
        );
        let v = self.eval(&body).await?;
        Ok(v.as_u64().unwrap_or(0) as usize)
    }

    async fn scroll_into_view(
        &self,
        css: &str,
        index: usize,
    ) -> Result<Interaction, SessionError> {
        let body = format!(
            "const r = nth('{}', {index});\n\
             if (r.miss) return {{ status: r.miss }};\n\
             r.el.scrollIntoView({{ block: 'center' }});\n\
             return {{ status: 'applied' }};",
            js_str(css)
        );
        let v = self.eval(&body).await?;
        Ok(interaction_from(&v))
    }

    async fn scroll_by(&self, dy: i64) -> Result<(), SessionError> {
        let body = format!("window.scrollBy(0, {dy}); return true;");
        self.eval(&body).await?;
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<(), SessionError> {
        self.eval("window.scrollTo(0, document.body.scrollHeight); return true;")
            .await?;
        Ok(())
    }
}

/// Sanitize a string for safe injection into a JavaScript string literal.
///
/// Escapes everything that could break out of the string context: quotes,
/// backslashes, newlines, and angle brackets (to block `</script>`).
fn js_str(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}

/// Encode a string slice list as a JS array literal (JSON is valid JS).
fn js_array(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_str_escapes_breakouts() {
        assert_eq!(js_str("div.card"), "div.card");
        assert_eq!(js_str("a[title='x']"), "a[title=\\'x\\']");
        let malicious = "</script><script>alert(1)</script>";
        let sanitized = js_str(malicious);
        assert!(!sanitized.contains("</script>"));
        assert!(sanitized.contains("\\x3c/script\\x3e"));
    }

    #[test]
    fn js_str_strips_null_bytes() {
        assert_eq!(js_str("ab\0cd"), "abcd");
    }

    #[test]
    fn js_array_is_json() {
        let items = vec!["accept all".to_string(), "it's fine".to_string()];
        assert_eq!(js_array(&items), r#"["accept all","it's fine"]"#);
    }

    #[test]
    fn interaction_parses_status() {
        let applied = serde_json::json!({ "status": "applied" });
        let stale = serde_json::json!({ "status": "stale" });
        let garbage = serde_json::json!({ "other": 1 });
        assert_eq!(interaction_from(&applied), Interaction::Applied);
        assert_eq!(interaction_from(&stale), Interaction::Stale);
        assert_eq!(interaction_from(&garbage), Interaction::NotFound);
    }

    #[test]
    fn anchors_skip_empty_hrefs() {
        let v = serde_json::json!([
            { "text": "Coco", "href": "https://x.ca/brand/coco" },
            { "text": "dead", "href": "" },
        ]);
        let anchors = anchors_from(&v);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].text, "Coco");
    }
}
