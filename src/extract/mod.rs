//! Content extraction: rendered page markup in, typed page structs out,
//! projected to a single [`HarvestRecord`] shape at the serialization
//! boundary.
//!
//! Extraction is total: a page missing every optional section yields a
//! record with empty content, never an error.

pub mod article;
pub mod product;
pub mod recipe;
pub mod rules;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// The page families the harvester understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Product,
    Recipe,
    Article,
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PageKind::Product => "product",
            PageKind::Recipe => "recipe",
            PageKind::Article => "article",
        };
        f.write_str(s)
    }
}

/// One scraped page, normalized and ready for indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestRecord {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: PageKind,
    pub title: String,
    pub content: String,
}

/// A typed page, tagged by kind. Collapses to [`HarvestRecord`] only when
/// it leaves the pipeline.
#[derive(Debug, Clone)]
pub enum PageContent {
    Recipe(recipe::RecipePage),
    Article(article::ArticlePage),
    Product(product::ProductPage),
}

impl PageContent {
    pub fn into_record(self) -> HarvestRecord {
        match self {
            PageContent::Recipe(page) => page.into_record(),
            PageContent::Article(page) => page.into_record(),
            PageContent::Product(page) => page.into_record(),
        }
    }
}

// ── shared markup helpers ───────────────────────────────────────────────────

/// Element text with whitespace runs collapsed to single spaces.
pub(crate) fn node_text(el: ElementRef<'_>) -> String {
    let joined: String = el.text().collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the page's first `<h1>`, or empty.
pub(crate) fn page_title(doc: &Html) -> String {
    match Selector::parse("h1") {
        Ok(sel) => doc.select(&sel).next().map(node_text).unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// First `<p>` following the `<h1>` in document order, excluding the h1's
/// own subtree.
pub(crate) fn first_paragraph_after_title(doc: &Html) -> Option<String> {
    let h1_sel = Selector::parse("h1").ok()?;
    let h1 = doc.select(&h1_sel).next()?;
    let h1_id = h1.id();

    let mut seen = false;
    for node in doc.root_element().descendants() {
        if node.id() == h1_id {
            seen = true;
            continue;
        }
        if !seen || node.ancestors().any(|a| a.id() == h1_id) {
            continue;
        }
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().name() == "p" {
                let text = node_text(el);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

/// Join non-empty sections with blank lines.
pub(crate) fn join_sections(sections: &[String]) -> String {
    sections
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `"Label:\nbody"`, or empty when the body is empty.
pub(crate) fn labeled(label: &str, body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!("{label}:\n{body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_lowercase_as_type() {
        let record = HarvestRecord {
            url: "https://x.ca/recipe/a".into(),
            kind: PageKind::Recipe,
            title: "A".into(),
            content: String::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "recipe");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn first_paragraph_skips_title_subtree() {
        let doc = Html::parse_document(
            "<div><h1>Title <p>inside</p></h1></div><div><p>  real   lead </p></div>",
        );
        assert_eq!(
            first_paragraph_after_title(&doc),
            Some("real lead".to_string())
        );
    }

    #[test]
    fn labeled_and_join_skip_empties() {
        let sections = vec![
            "lead".to_string(),
            labeled("Ingredients", ""),
            labeled("Tips", "rest well"),
        ];
        assert_eq!(join_sections(&sections), "lead\n\nTips:\nrest well");
    }
}
