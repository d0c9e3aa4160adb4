//! Harvest aggregation: the two-phase pipeline's second half.
//!
//! Discovery output is persisted to disk so extraction can resume without
//! re-driving the menus and pagers. The aggregator deduplicates the product
//! union, walks every URL sequentially, and keeps whatever extracts cleanly.
//! One bad page never discards the batch.

use crate::config::{Settings, SiteProfile};
use crate::discovery::{BrandProducts, ListingUrls};
use crate::extract::{article, product, recipe, HarvestRecord, PageKind};
use crate::interact::Timing;
use crate::session::PageContext;
use crate::urls::SiteOrigin;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// On-disk layout of the pipeline's intermediate and final files.
pub struct HarvestStore {
    dir: PathBuf,
}

impl HarvestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn brand_products_path(&self) -> PathBuf {
        self.dir.join("brand_products.json")
    }

    pub fn listing_urls_path(&self) -> PathBuf {
        self.dir.join("listing_urls.json")
    }

    pub fn records_path(&self) -> PathBuf {
        self.dir.join("harvest.json")
    }

    pub fn save_brand_products(&self, brands: &[BrandProducts]) -> Result<()> {
        write_json(&self.brand_products_path(), brands)
    }

    pub fn load_brand_products(&self) -> Result<Vec<BrandProducts>> {
        read_json(&self.brand_products_path())
    }

    pub fn save_listing_urls(&self, urls: &ListingUrls) -> Result<()> {
        write_json(&self.listing_urls_path(), urls)
    }

    pub fn load_listing_urls(&self) -> Result<ListingUrls> {
        read_json(&self.listing_urls_path())
    }

    pub fn save_records(&self, records: &[HarvestRecord]) -> Result<()> {
        write_json(&self.records_path(), records)
    }

    pub fn load_records(&self) -> Result<Vec<HarvestRecord>> {
        read_json(&self.records_path())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let body =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("parsing {}", path.display()))
}

/// The union of product URLs across brands, deduplicated and ordered.
pub fn dedupe_products(brands: &[BrandProducts]) -> BTreeSet<String> {
    brands
        .iter()
        .flat_map(|b| b.products.iter().cloned())
        .collect()
}

/// Extract every discovered URL into records, sequentially, tolerating
/// per-URL failures. Always returns what was collected.
pub async fn harvest_all<C>(
    ctx: &mut C,
    profile: &SiteProfile,
    settings: &Settings,
    products: &BTreeSet<String>,
    listings: &ListingUrls,
) -> Vec<HarvestRecord>
where
    C: PageContext + ?Sized,
{
    let timing = Timing::default();
    let mut records = Vec::new();

    let planned: Vec<(PageKind, &String)> = products
        .iter()
        .map(|u| (PageKind::Product, u))
        .chain(listings.recipes.iter().map(|u| (PageKind::Recipe, u)))
        .chain(listings.articles.iter().map(|u| (PageKind::Article, u)))
        .collect();
    let total = planned.len();

    for (index, (kind, url)) in planned.into_iter().enumerate() {
        info!(%kind, url = %url, "extracting ({}/{total})", index + 1);
        match extract_one(ctx, profile, settings, kind, url, &timing).await {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(%kind, url = %url, "extraction failed, skipping: {e:#}");
            }
        }
    }

    info!(collected = records.len(), total, "harvest complete");
    records
}

async fn extract_one<C>(
    ctx: &mut C,
    profile: &SiteProfile,
    settings: &Settings,
    kind: PageKind,
    url: &str,
    timing: &Timing,
) -> Result<HarvestRecord>
where
    C: PageContext + ?Sized,
{
    ctx.navigate(url, settings.nav_timeout_ms).await?;
    // Let late hydration finish before reading the page.
    if !timing.settle.is_zero() {
        tokio::time::sleep(timing.settle).await;
    }

    let record = match kind {
        PageKind::Recipe => {
            let html = ctx.page_source().await?;
            recipe::extract_recipe(&html, url, &profile.recipe).into_record()
        }
        PageKind::Article => {
            let html = ctx.page_source().await?;
            article::extract_article(&html, url, &profile.article).into_record()
        }
        PageKind::Product => product::extract_product(&*ctx, url, &profile.product, timing)
            .await?
            .into_record(),
    };
    Ok(record)
}

/// Validate the base URL once, where both discovery passes need it.
pub fn site_origin(settings: &Settings) -> Result<SiteOrigin> {
    SiteOrigin::new(&settings.base_url)
        .with_context(|| format!("invalid FORAGE_BASE_URL {:?}", settings.base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brand(url: &str, products: &[&str]) -> BrandProducts {
        BrandProducts {
            brand_url: url.to_string(),
            products: products.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn product_union_dedupes_across_brands() {
        let brands = vec![
            brand("https://x.ca/brand/a", &["https://x.ca/p1", "https://x.ca/p2"]),
            brand("https://x.ca/brand/b", &["https://x.ca/p2", "https://x.ca/p3"]),
        ];
        let union = dedupe_products(&brands);
        assert_eq!(union.len(), 3);
        assert!(union.contains("https://x.ca/p2"));
    }

    #[test]
    fn store_round_trips_discovery_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = HarvestStore::new(dir.path().join("data"));

        let brands = vec![brand("https://x.ca/brand/a", &["https://x.ca/p1"])];
        store.save_brand_products(&brands).unwrap();
        let loaded = store.load_brand_products().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].products, vec!["https://x.ca/p1"]);

        let listings = ListingUrls {
            recipes: vec!["https://x.ca/recipe/a".into()],
            articles: vec![],
        };
        store.save_listing_urls(&listings).unwrap();
        assert_eq!(store.load_listing_urls().unwrap().recipes.len(), 1);

        let records = vec![HarvestRecord {
            url: "https://x.ca/recipe/a".into(),
            kind: PageKind::Recipe,
            title: "A".into(),
            content: "body".into(),
        }];
        store.save_records(&records).unwrap();
        let loaded = store.load_records().unwrap();
        assert_eq!(loaded[0].title, "A");
    }

    #[test]
    fn missing_discovery_file_is_an_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = HarvestStore::new(dir.path());
        let err = store.load_brand_products().unwrap_err();
        assert!(format!("{err:#}").contains("brand_products.json"));
    }
}
