//! Product page extraction.
//!
//! Unlike recipes and articles, product pages hide two sections behind tabs:
//! nutrition and ingredients only render after their tab is activated. The
//! extractor drives the tabs with the resilient click, re-reads the page
//! source after each activation, and parses with the pure helpers below. A
//! missing tab simply omits its section.

use super::rules::ProductRules;
use super::{
    first_paragraph_after_title, join_sections, labeled, node_text, page_title, HarvestRecord,
    PageKind,
};
use crate::dom::{Interaction, JsDom, PageDom};
use crate::interact::{self, ClickOutcome, Timing};
use crate::session::{PageContext, SessionError};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// One row of the nutrition table. Percent-daily-value is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NutritionRow {
    pub label: String,
    pub amount: String,
    pub percent: Option<String>,
}

impl NutritionRow {
    fn line(&self) -> String {
        match &self.percent {
            Some(p) => format!("{}: {} ({})", self.label, self.amount, p),
            None => format!("{}: {}", self.label, self.amount),
        }
    }
}

/// The sections a product page may carry. All optional.
#[derive(Debug, Clone, Default)]
pub struct ProductPage {
    pub url: String,
    pub title: String,
    pub description: String,
    pub features: Vec<String>,
    pub nutrition: Vec<NutritionRow>,
    pub ingredients: Vec<String>,
}

impl ProductPage {
    pub fn into_record(self) -> HarvestRecord {
        let nutrition_lines: Vec<String> = self.nutrition.iter().map(NutritionRow::line).collect();
        let content = join_sections(&[
            self.description,
            labeled("Features", &self.features.join("\n")),
            labeled("Nutrition", &nutrition_lines.join("\n")),
            labeled("Ingredients", &self.ingredients.join("\n")),
        ]);
        HarvestRecord {
            url: self.url,
            kind: PageKind::Product,
            title: self.title,
            content,
        }
    }
}

/// Extract a product page, activating the nutrition and ingredients tabs.
pub async fn extract_product<C>(
    ctx: &C,
    url: &str,
    rules: &ProductRules,
    timing: &Timing,
) -> Result<ProductPage, SessionError>
where
    C: PageContext + ?Sized,
{
    let base_html = ctx.page_source().await?;
    let mut page = parse_product_base(&base_html, url, rules);

    let dom = JsDom::new(ctx);

    if activate_tab(&dom, &rules.nutrition_tab, &rules.nutrition_tab_texts, rules, timing).await {
        let html = ctx.page_source().await?;
        page.nutrition = parse_nutrition(&html, rules);
    } else {
        debug!(url, "no nutrition tab");
    }

    if activate_tab(
        &dom,
        &rules.ingredients_tab,
        &rules.ingredients_tab_texts,
        rules,
        timing,
    )
    .await
    {
        let html = ctx.page_source().await?;
        page.ingredients = parse_ingredients(&html, rules);
    } else {
        debug!(url, "no ingredients tab");
    }

    Ok(page)
}

/// Click a tab by selector, then by its text. Absence is tolerated.
async fn activate_tab<C>(
    dom: &JsDom<'_, C>,
    tab_css: &str,
    tab_texts: &[String],
    rules: &ProductRules,
    timing: &Timing,
) -> bool
where
    C: PageContext + ?Sized,
{
    let outcome = interact::resilient_click(dom, tab_css, 0, timing).await;
    let clicked = match outcome {
        ClickOutcome::Clicked(_) => true,
        _ => matches!(
            dom.click_by_text(&rules.tab_controls, tab_texts).await,
            Ok(Interaction::Applied)
        ),
    };
    if clicked && !timing.settle.is_zero() {
        tokio::time::sleep(timing.settle).await;
    }
    clicked
}

/// Title, description, and features: the sections visible without tabs.
pub fn parse_product_base(html: &str, url: &str, rules: &ProductRules) -> ProductPage {
    let doc = Html::parse_document(html);

    let description = Selector::parse(&rules.description_field)
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .map(node_text)
        .filter(|t| !t.is_empty())
        .or_else(|| first_paragraph_after_title(&doc))
        .unwrap_or_default();

    let mut page = ProductPage {
        url: url.to_string(),
        title: page_title(&doc),
        description,
        ..ProductPage::default()
    };

    if let Some(heading) = find_heading(&doc, &rules.headings, &rules.features_heading) {
        page.features = items_after_heading(heading, &rules.feature_items);
    }

    page
}

/// `[label, amount, percent?]` triples from the nutrients container.
pub fn parse_nutrition(html: &str, rules: &ProductRules) -> Vec<NutritionRow> {
    let doc = Html::parse_document(html);
    let (Ok(container_sel), Ok(row_sel), Ok(label_sel), Ok(amount_sel), Ok(percent_sel)) = (
        Selector::parse(&rules.nutrition_container),
        Selector::parse(&rules.nutrition_row),
        Selector::parse(&rules.nutrition_label),
        Selector::parse(&rules.nutrition_amount),
        Selector::parse(&rules.nutrition_percent),
    ) else {
        return Vec::new();
    };

    let Some(container) = doc.select(&container_sel).next() else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for row in container.select(&row_sel) {
        let label = row.select(&label_sel).next().map(node_text).unwrap_or_default();
        let amount = row.select(&amount_sel).next().map(node_text).unwrap_or_default();
        if label.is_empty() || amount.is_empty() {
            continue;
        }
        let percent = row
            .select(&percent_sel)
            .next()
            .map(node_text)
            .filter(|p| !p.is_empty());
        rows.push(NutritionRow {
            label,
            amount,
            percent,
        });
    }
    rows
}

/// Distinct text blocks under the first sibling of the ingredients heading,
/// order preserved, duplicates suppressed.
pub fn parse_ingredients(html: &str, rules: &ProductRules) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Some(heading) = find_heading(&doc, &rules.headings, &rules.ingredients_heading) else {
        return Vec::new();
    };
    let Some(sibling) = next_element(heading) else {
        return Vec::new();
    };

    let blocks = match Selector::parse("p, li, div") {
        Ok(sel) => {
            let nested: Vec<String> = sibling
                .select(&sel)
                // Leaf blocks only; a wrapper div would repeat its children.
                .filter(|el| el.children().all(|c| ElementRef::wrap(c).is_none()))
                .map(node_text)
                .filter(|t| !t.is_empty())
                .collect();
            if nested.is_empty() {
                vec![node_text(sibling)]
            } else {
                nested
            }
        }
        Err(_) => vec![node_text(sibling)],
    };

    let mut seen = HashSet::new();
    blocks
        .into_iter()
        .filter(|b| !b.is_empty() && seen.insert(b.clone()))
        .collect()
}

/// First heading whose text contains the needle, case-insensitively.
fn find_heading<'a>(doc: &'a Html, headings: &str, needle: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(headings).ok()?;
    let needle = needle.to_lowercase();
    doc.select(&sel)
        .find(|h| node_text(*h).to_lowercase().contains(&needle))
}

/// The heading's next element sibling.
fn next_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// Item texts from the sibling elements following a heading, stopping at
/// the next heading.
fn items_after_heading(heading: ElementRef<'_>, item_css: &str) -> Vec<String> {
    let Ok(item_sel) = Selector::parse(item_css) else {
        return Vec::new();
    };
    let mut items = Vec::new();
    for node in heading.next_siblings() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if matches!(el.value().name(), "h1" | "h2" | "h3" | "h4") {
            break;
        }
        items.extend(
            el.select(&item_sel)
                .map(node_text)
                .filter(|t| !t.is_empty()),
        );
    }
    items
}
