//! Recipe and article discovery: expand the listing pages, then harvest
//! matching anchors from the fully grown page source.

use super::ListingUrls;
use crate::config::SiteProfile;
use crate::dom::JsDom;
use crate::interact;
use crate::pagination::{self, ExpansionBudget};
use crate::session::{PageContext, SessionError};
use crate::urls::SiteOrigin;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::info;

/// Recipe URLs follow a fixed path convention under the site root.
pub fn parse_recipe_links(html: &str, origin: &SiteOrigin) -> BTreeSet<String> {
    let Some(prefix) = origin.normalize("/recipe/") else {
        return BTreeSet::new();
    };
    collect_hrefs(html, origin)
        .into_iter()
        .filter(|url| url.starts_with(&prefix))
        .collect()
}

/// Article URLs are recognized by a path segment, wherever they point.
pub fn parse_article_links(html: &str, origin: &SiteOrigin) -> BTreeSet<String> {
    collect_hrefs(html, origin)
        .into_iter()
        .filter(|url| url.contains("/blog/") || url.contains("/news/"))
        .collect()
}

fn collect_hrefs(html: &str, origin: &SiteOrigin) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let mut urls = BTreeSet::new();
    if let Ok(sel) = Selector::parse("a[href]") {
        for element in document.select(&sel) {
            if let Some(href) = element.value().attr("href") {
                if let Some(url) = origin.normalize(href) {
                    urls.insert(url);
                }
            }
        }
    }
    urls
}

/// Expand one listing page and return its page source.
async fn expand_listing<C>(
    ctx: &mut C,
    profile: &SiteProfile,
    listing_url: &str,
    kind: &'static str,
    nav_timeout_ms: u64,
    budget: &ExpansionBudget,
) -> Result<String, SessionError>
where
    C: PageContext + ?Sized,
{
    ctx.navigate(listing_url, nav_timeout_ms).await?;
    let dom = JsDom::new(&*ctx);
    interact::dismiss_overlays(&dom, &profile.overlays, &budget.timing).await;

    let expansion = match kind {
        "recipes" => &profile.recipe_listing,
        _ => &profile.article_listing,
    };
    let outcome = pagination::expand(&dom, expansion, budget).await?;
    info!(kind, rows = outcome.rows, clicks = outcome.clicks, "listing expanded");

    ctx.page_source().await
}

/// Discover recipe and article URLs from the two listing pages.
pub async fn collect_listing_urls<C>(
    ctx: &mut C,
    profile: &SiteProfile,
    origin: &SiteOrigin,
    recipes_url: &str,
    articles_url: &str,
    nav_timeout_ms: u64,
    budget: &ExpansionBudget,
) -> Result<ListingUrls, SessionError>
where
    C: PageContext + ?Sized,
{
    let recipe_html = expand_listing(
        ctx,
        profile,
        recipes_url,
        "recipes",
        nav_timeout_ms,
        budget,
    )
    .await?;
    let recipes: Vec<String> = parse_recipe_links(&recipe_html, origin).into_iter().collect();
    info!(count = recipes.len(), "recipes discovered");

    let article_html = expand_listing(
        ctx,
        profile,
        articles_url,
        "articles",
        nav_timeout_ms,
        budget,
    )
    .await?;
    let articles: Vec<String> = parse_article_links(&article_html, origin)
        .into_iter()
        .collect();
    info!(count = articles.len(), "articles discovered");

    Ok(ListingUrls { recipes, articles })
}

// Listing expansion itself is covered by the pagination tests; these cover
// the anchor filtering over expanded page source.
#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> SiteOrigin {
        SiteOrigin::new("https://www.example-foods.ca").unwrap()
    }

    const LISTING: &str = r#"
        <html><body>
        <div class="card--recipe"><a href="/recipe/fudge-brownies?page=2">Fudge</a></div>
        <div class="card--recipe"><a href="https://www.example-foods.ca/recipe/lava-cake">Lava</a></div>
        <div class="card--recipe"><a href="/recipe/fudge-brownies">Fudge dup</a></div>
        <a href="/brand/coco">not a recipe</a>
        <a href="/blog/5-baking-tips">Tips</a>
        <a href="https://news.partner.site/news/launch">External news</a>
        <a href="mailto:hi@example.com">mail</a>
        </body></html>
    "#;

    #[test]
    fn recipe_links_match_path_convention() {
        let recipes = parse_recipe_links(LISTING, &origin());
        assert_eq!(
            recipes.into_iter().collect::<Vec<_>>(),
            vec![
                "https://www.example-foods.ca/recipe/fudge-brownies".to_string(),
                "https://www.example-foods.ca/recipe/lava-cake".to_string(),
            ]
        );
    }

    #[test]
    fn article_links_match_segment_anywhere() {
        let articles = parse_article_links(LISTING, &origin());
        let articles: Vec<String> = articles.into_iter().collect();
        assert_eq!(
            articles,
            vec![
                "https://news.partner.site/news/launch".to_string(),
                "https://www.example-foods.ca/blog/5-baking-tips".to_string(),
            ]
        );
    }

    #[test]
    fn rerunning_discovery_is_stable() {
        let first = parse_recipe_links(LISTING, &origin());
        let second = parse_recipe_links(LISTING, &origin());
        assert_eq!(first, second);
    }
}
