//! Runtime settings and the site selector profile.
//!
//! Every structural heuristic the harvester relies on (menu layout, pager
//! candidates, overlay close controls, per-page-type section locators) lives
//! here as data. Adapting the pipeline to a markup variation means editing a
//! table, not a control path.

use crate::extract::rules::{ArticleRules, ProductRules, RecipeRules};
use crate::interact::OverlayRule;
use crate::pagination::{ExpansionProfile, PagerTextRule};
use std::path::PathBuf;

/// Process-level settings, resolved once from the environment and passed
/// explicitly. No globals.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Site root, e.g. `https://www.example-foods.ca`. Required.
    pub base_url: String,
    /// Path of the recipe listing page.
    pub recipes_path: String,
    /// Path of the article listing page.
    pub articles_path: String,
    /// Directory for discovery and harvest output files.
    pub data_dir: PathBuf,
    /// Human-readable site name, used in answer prompts.
    pub site_name: String,
    /// Per-navigation timeout.
    pub nav_timeout_ms: u64,
    /// Vector index upsert/search endpoint.
    pub index_url: Option<String>,
    pub index_api_key: Option<String>,
    pub index_namespace: String,
    /// Chat-completions endpoint for the answering collaborator.
    pub llm_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    /// Top-K matches retrieved per question.
    pub top_k: usize,
    /// Ingestion batch size.
    pub batch_size: usize,
}

impl Settings {
    /// Resolve settings from `FORAGE_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("FORAGE_BASE_URL")
            .map_err(|_| anyhow::anyhow!("FORAGE_BASE_URL is not set"))?;
        let env = |key: &str| std::env::var(key).ok();

        Ok(Self {
            base_url,
            recipes_path: env("FORAGE_RECIPES_PATH").unwrap_or_else(|| "/recipes".into()),
            articles_path: env("FORAGE_ARTICLES_PATH").unwrap_or_else(|| "/articles".into()),
            data_dir: PathBuf::from(env("FORAGE_DATA_DIR").unwrap_or_else(|| "data".into())),
            site_name: env("FORAGE_SITE_NAME").unwrap_or_else(|| "the site".into()),
            nav_timeout_ms: env("FORAGE_NAV_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),
            index_url: env("FORAGE_INDEX_URL"),
            index_api_key: env("FORAGE_INDEX_API_KEY"),
            index_namespace: env("FORAGE_INDEX_NAMESPACE").unwrap_or_else(|| "default".into()),
            llm_url: env("FORAGE_LLM_URL"),
            llm_api_key: env("FORAGE_LLM_API_KEY"),
            llm_model: env("FORAGE_LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
            top_k: env("FORAGE_TOP_K").and_then(|v| v.parse().ok()).unwrap_or(3),
            batch_size: env("FORAGE_BATCH_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(32),
        })
    }
}

/// Hover-menu structure for brand discovery.
#[derive(Debug, Clone)]
pub struct MenuProfile {
    /// The top-level trigger revealing the brand menu on hover.
    pub brands_trigger: String,
    /// First-level category nodes under the expanded menu.
    pub categories: String,
    /// Label element inside a category node (hover target).
    pub category_label: String,
    /// Brand anchors beneath an expanded category (primary, structural).
    pub brand_anchors: String,
    /// Fallback: any anchor in a submenu list under the category.
    pub brand_anchors_fallback: String,
    /// The per-brand "Products" tab control.
    pub products_tab: String,
}

/// The full selector profile for one site.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub menu: MenuProfile,
    pub product_grid: ExpansionProfile,
    pub recipe_listing: ExpansionProfile,
    pub article_listing: ExpansionProfile,
    /// Overlay suppression rules, applied in order.
    pub overlays: Vec<OverlayRule>,
    pub recipe: RecipeRules,
    pub article: ArticleRules,
    pub product: ProductRules,
}

fn survey_overlays() -> Vec<OverlayRule> {
    vec![
        OverlayRule::SurveyFrame {
            frames: "iframe".into(),
            close_controls: "button, .close, .close-button, [aria-label='close']".into(),
            close_labels: vec!["close".into(), "×".into(), "no thanks".into()],
        },
        OverlayRule::SurveyDialog {
            container: r#"div[class^="QSIWebResponsive-creative-container"]"#.into(),
            close_controls: r#"div[role="button"], button, .QSIWebResponsiveDialog-Icon"#.into(),
            close_labels: vec!["close".into(), "✕".into(), "x".into()],
        },
    ]
}

impl SiteProfile {
    /// Selector tables for the supported site family: a Drupal build with
    /// Cohesion menus, views-driven grids, OneTrust consent, and Qualtrics
    /// survey creatives.
    pub fn default_site() -> Self {
        let product_pagers = vec![
            "#products a.views-load-more__button".to_string(),
            "#products div.views-pagination a".to_string(),
            "#products ul.pager__items a.pager__link".to_string(),
        ];

        Self {
            menu: MenuProfile {
                brands_trigger: "div.menu-container nav > ul > li:nth-child(1) > span".into(),
                categories: "div.menu-container nav > ul \
                             li.coh-menu-list-item.has-children.is-expanded > div > div > ul \
                             > li.coh-menu-list-item.has-children"
                    .into(),
                category_label: "span".into(),
                brand_anchors: "li.coh-menu-list-item.has-children.is-expanded \
                                > div > ul > li > a"
                    .into(),
                brand_anchors_fallback: "div > ul > li > a".into(),
                products_tab: "#block-brand-submenu nav ul li:first-child a".into(),
            },
            product_grid: ExpansionProfile {
                name: "product-grid",
                container: Some("#products".into()),
                pagers: product_pagers,
                pager_text: Some(PagerTextRule {
                    css: "#products a".into(),
                    texts: vec!["more".into()],
                }),
                rows: "#products div.views-row".into(),
                bottom_scroll: false,
                overlays: Vec::new(),
            },
            recipe_listing: ExpansionProfile {
                name: "recipe-cards",
                container: None,
                pagers: Vec::new(),
                pager_text: Some(PagerTextRule {
                    css: "div.views-pagination ul > li > a".into(),
                    texts: vec!["more".into()],
                }),
                rows: "div.card--recipe".into(),
                bottom_scroll: true,
                overlays: survey_overlays(),
            },
            article_listing: ExpansionProfile {
                name: "article-cards",
                container: None,
                pagers: Vec::new(),
                pager_text: Some(PagerTextRule {
                    css: "main div.views-element-container ul > li > a".into(),
                    texts: vec!["more".into()],
                }),
                rows: "div.card--article".into(),
                bottom_scroll: true,
                overlays: survey_overlays(),
            },
            overlays: {
                let mut rules = vec![OverlayRule::CookieBanner {
                    controls: "button, a".into(),
                    accept_texts: vec![
                        "accept all cookies".into(),
                        "accept all".into(),
                        "i accept".into(),
                        "agree".into(),
                        "accept".into(),
                    ],
                    consent_button: "#onetrust-accept-btn-handler".into(),
                }];
                rules.extend(survey_overlays());
                rules
            },
            recipe: RecipeRules::default_site(),
            article: ArticleRules::default_site(),
            product: ProductRules::default_site(),
        }
    }
}
