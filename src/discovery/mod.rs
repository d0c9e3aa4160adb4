//! Link discovery: hover-menu brand traversal and pagination-driven
//! listing enumeration. Produces the URL sets the extraction pass consumes.

pub mod brands;
pub mod listings;

use serde::{Deserialize, Serialize};

/// A brand entry revealed by the hover menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandLink {
    pub name: String,
    pub url: String,
}

/// Product URLs found under one brand's grid, sorted for determinism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandProducts {
    pub brand_url: String,
    pub products: Vec<String>,
}

/// Recipe and article URLs collected from the listing pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingUrls {
    pub recipes: Vec<String>,
    pub articles: Vec<String>,
}
