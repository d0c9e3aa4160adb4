//! Brand discovery through the hover menu, and per-brand product discovery
//! through the expanded product grid.

use super::{BrandLink, BrandProducts};
use crate::config::{MenuProfile, SiteProfile};
use crate::dom::{AnchorRef, ClickStrategy, JsDom, PageDom};
use crate::pagination::{self, ExpansionBudget};
use crate::session::{PageContext, SessionError};
use crate::urls::SiteOrigin;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Waits between hover steps while the menu animates open.
#[derive(Debug, Clone)]
pub struct HoverTiming {
    /// After hovering the top-level trigger.
    pub open: Duration,
    /// Before re-hovering the trigger for the next category.
    pub rehover: Duration,
    /// After hovering a category, while its submenu renders.
    pub reveal: Duration,
}

impl Default for HoverTiming {
    fn default() -> Self {
        Self {
            open: Duration::from_millis(1000),
            rehover: Duration::from_millis(500),
            reveal: Duration::from_millis(1200),
        }
    }
}

impl HoverTiming {
    pub fn instant() -> Self {
        Self {
            open: Duration::ZERO,
            rehover: Duration::ZERO,
            reveal: Duration::ZERO,
        }
    }
}

async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

/// Enumerate brand links from the hover menu on the current page.
///
/// Each category is processed independently: a node that goes missing or
/// stale is logged and skipped, and whatever was already collected stays.
pub async fn collect_brand_links(
    dom: &dyn PageDom,
    menu: &MenuProfile,
    origin: &SiteOrigin,
    timing: &HoverTiming,
) -> Result<Vec<BrandLink>, SessionError> {
    if !dom.hover(&menu.brands_trigger, 0).await?.applied() {
        warn!("brand menu trigger not found");
        return Ok(Vec::new());
    }
    pause(timing.open).await;

    let category_count = dom.count(&menu.categories).await?;
    info!(categories = category_count, "brand menu opened");

    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for index in 0..category_count {
        // The submenu collapses between iterations; re-hover the trigger
        // and the category every time.
        let _ = dom.hover(&menu.brands_trigger, 0).await?;
        pause(timing.rehover).await;

        let name = match dom
            .text_within(&menu.categories, index, &menu.category_label)
            .await?
        {
            Some(name) => name,
            None => {
                warn!(index, "category node went away, skipping");
                continue;
            }
        };

        if !dom.hover(&menu.categories, index).await?.applied() {
            warn!(category = %name, "category hover failed, skipping");
            continue;
        }
        pause(timing.reveal).await;

        let anchors = match dom
            .anchors_within(&menu.categories, index, &menu.brand_anchors)
            .await?
        {
            Some(anchors) => anchors,
            None => {
                warn!(category = %name, "category node stale, skipping");
                continue;
            }
        };
        // Minor markup variations hide brands from the structural selector;
        // fall back to any anchor in a submenu list under this category.
        let anchors = if anchors.is_empty() {
            dom.anchors_within(&menu.categories, index, &menu.brand_anchors_fallback)
                .await?
                .unwrap_or_default()
        } else {
            anchors
        };

        let mut found = 0usize;
        for AnchorRef { text, href } in anchors {
            let Some(url) = origin.normalize(&href) else {
                continue;
            };
            if text.is_empty() || seen.contains(&url) {
                continue;
            }
            seen.insert(url.clone());
            links.push(BrandLink { name: text, url });
            found += 1;
        }
        if found == 0 {
            debug!(category = %name, "no brands under category");
        } else {
            debug!(category = %name, found, "brands collected");
        }
    }

    Ok(links)
}

/// Keep grid anchors that are internal and not the brand page itself.
pub fn filter_product_anchors(
    anchors: &[AnchorRef],
    origin: &SiteOrigin,
    brand_url: &str,
) -> BTreeSet<String> {
    let brand = origin.normalize(brand_url).unwrap_or_else(|| brand_url.to_string());
    anchors
        .iter()
        .filter_map(|a| origin.normalize(&a.href))
        .filter(|url| origin.is_internal(url))
        .filter(|url| !SiteOrigin::is_same_page(url, &brand))
        .collect()
}

/// Discover product URLs under one brand page.
///
/// Off-origin brand URLs are skipped outright. A brand page with no product
/// grid yields an empty set; that is data, not an error.
pub async fn collect_brand_products<C>(
    ctx: &mut C,
    profile: &SiteProfile,
    origin: &SiteOrigin,
    brand_url: &str,
    nav_timeout_ms: u64,
    budget: &ExpansionBudget,
) -> Result<BrandProducts, SessionError>
where
    C: PageContext + ?Sized,
{
    let empty = |brand_url: &str| BrandProducts {
        brand_url: brand_url.to_string(),
        products: Vec::new(),
    };

    if !origin.is_internal(brand_url) {
        info!(url = brand_url, "external brand, skipped");
        return Ok(empty(brand_url));
    }

    ctx.navigate(brand_url, nav_timeout_ms).await?;
    let dom = JsDom::new(&*ctx);

    // The grid often lives behind a "Products" tab; opening it is optional.
    let _ = dom
        .click(&profile.menu.products_tab, 0, ClickStrategy::Scripted)
        .await?;
    pause(budget.poll_interval).await;

    let Some(container) = profile.product_grid.container.as_deref() else {
        return Ok(empty(brand_url));
    };
    if dom.count(container).await? == 0 {
        debug!(url = brand_url, "no product grid");
        return Ok(empty(brand_url));
    }

    // Nudge once so the first pager renders before scanning starts.
    let _ = dom.scroll_into_view(container, 0).await?;
    dom.scroll_by(200).await?;
    pause(budget.poll_interval).await;

    pagination::expand(&dom, &profile.product_grid, budget).await?;

    let anchors = dom.anchors(&format!("{container} a")).await?;
    let products = filter_product_anchors(&anchors, origin, brand_url);
    info!(url = brand_url, products = products.len(), "brand products collected");

    Ok(BrandProducts {
        brand_url: brand_url.to_string(),
        products: products.into_iter().collect(),
    })
}
