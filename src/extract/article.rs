//! Article page extraction.

use super::rules::ArticleRules;
use super::{node_text, page_title, HarvestRecord, PageKind};
use scraper::{ElementRef, Html, Selector};

/// An article: a title and its body blocks, line by line.
#[derive(Debug, Clone, Default)]
pub struct ArticlePage {
    pub url: String,
    pub title: String,
    pub blocks: Vec<String>,
}

impl ArticlePage {
    pub fn into_record(self) -> HarvestRecord {
        HarvestRecord {
            url: self.url,
            kind: PageKind::Article,
            title: self.title,
            content: self.blocks.join("\n"),
        }
    }
}

/// Extract an article from rendered markup.
pub fn extract_article(html: &str, url: &str, rules: &ArticleRules) -> ArticlePage {
    let doc = Html::parse_document(html);

    let mut page = ArticlePage {
        url: url.to_string(),
        title: page_title(&doc),
        ..ArticlePage::default()
    };

    if let Some(container) = body_container(&doc, rules) {
        if let Ok(block_sel) = Selector::parse(&rules.blocks) {
            page.blocks = container
                .select(&block_sel)
                .map(node_text)
                .filter(|t| !t.is_empty())
                .collect();
        }
    }

    page
}

/// The preferred body container, or the largest-by-text candidate under the
/// article scope. Ties go to the first occurrence.
fn body_container<'a>(doc: &'a Html, rules: &ArticleRules) -> Option<ElementRef<'a>> {
    if let Ok(sel) = Selector::parse(&rules.preferred_container) {
        if let Some(el) = doc.select(&sel).next() {
            return Some(el);
        }
    }

    let scope_sel = Selector::parse(&rules.candidate_scope).ok()?;
    let cand_sel = Selector::parse(&rules.candidate_container).ok()?;
    let scope = doc.select(&scope_sel).next()?;

    let mut best: Option<(usize, ElementRef<'a>)> = None;
    for candidate in scope.select(&cand_sel) {
        let len = node_text(candidate).len();
        // Strictly greater keeps the first of equals.
        if best.as_ref().map_or(true, |(b, _)| len > *b) {
            best = Some((len, candidate));
        }
    }
    best.map(|(_, el)| el)
}
