//! URL normalization anchored to the harvested site's origin.
//!
//! Every href that enters a discovery set goes through [`SiteOrigin::normalize`]
//! first: relative paths are resolved against the site root, query strings and
//! fragments are stripped, and anything that is neither absolute http(s) nor
//! root-relative is rejected. Normalization is idempotent.

use url::Url;

/// The origin of the site being harvested.
#[derive(Debug, Clone)]
pub struct SiteOrigin {
    base: Url,
}

impl SiteOrigin {
    /// Parse a base URL. Must be absolute http(s).
    pub fn new(base: &str) -> anyhow::Result<Self> {
        let base = Url::parse(base)?;
        anyhow::ensure!(
            base.scheme() == "http" || base.scheme() == "https",
            "base URL must be http(s), got {}",
            base.scheme()
        );
        anyhow::ensure!(base.host_str().is_some(), "base URL has no host");
        Ok(Self { base })
    }

    /// The base URL as a string (canonical form, trailing slash on the root).
    pub fn base_str(&self) -> &str {
        self.base.as_str()
    }

    /// Normalize an href: absolute http(s) URLs and root-relative paths are
    /// kept, resolved against the base, and stripped of query + fragment.
    /// Everything else (empty, `javascript:`, `mailto:`, bare relative
    /// segments) yields `None`.
    pub fn normalize(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }

        let mut resolved = if href.starts_with("http://") || href.starts_with("https://") {
            Url::parse(href).ok()?
        } else if href.starts_with('/') && !href.starts_with("//") {
            self.base.join(href).ok()?
        } else {
            return None;
        };

        resolved.set_query(None);
        resolved.set_fragment(None);
        Some(resolved.to_string())
    }

    /// Whether a URL (already normalized or not) lives on this origin.
    pub fn is_internal(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(u) => {
                u.scheme() == self.base.scheme() && u.host_str() == self.base.host_str()
            }
            Err(_) => false,
        }
    }

    /// Whether `url` is the same page as `page`, ignoring a trailing slash.
    /// Used for self-link exclusion on brand grids.
    pub fn is_same_page(a: &str, b: &str) -> bool {
        a.trim_end_matches('/') == b.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> SiteOrigin {
        SiteOrigin::new("https://www.example-foods.ca").unwrap()
    }

    #[test]
    fn resolves_root_relative() {
        let o = origin();
        assert_eq!(
            o.normalize("/brand/coco"),
            Some("https://www.example-foods.ca/brand/coco".to_string())
        );
    }

    #[test]
    fn strips_query_and_fragment() {
        let o = origin();
        assert_eq!(
            o.normalize("https://www.example-foods.ca/recipes?page=2#list"),
            Some("https://www.example-foods.ca/recipes".to_string())
        );
    }

    #[test]
    fn rejects_non_navigable() {
        let o = origin();
        assert_eq!(o.normalize(""), None);
        assert_eq!(o.normalize("javascript:void(0)"), None);
        assert_eq!(o.normalize("mailto:hi@example.com"), None);
        assert_eq!(o.normalize("relative/path"), None);
        assert_eq!(o.normalize("//cdn.example.com/x"), None);
    }

    #[test]
    fn normalization_is_idempotent() {
        let o = origin();
        for href in [
            "/recipe/fudge?utm=1",
            "https://other.site/page?x=1#y",
            "https://www.example-foods.ca/",
        ] {
            let once = o.normalize(href).unwrap();
            let twice = o.normalize(&once).unwrap();
            assert_eq!(once, twice, "normalize not idempotent for {href}");
        }
    }

    #[test]
    fn keeps_external_absolute_but_flags_internal() {
        let o = origin();
        let ext = o.normalize("https://other.site/page?x=1").unwrap();
        assert_eq!(ext, "https://other.site/page");
        assert!(!o.is_internal(&ext));
        assert!(o.is_internal("https://www.example-foods.ca/brand/coco"));
    }

    #[test]
    fn same_page_ignores_trailing_slash() {
        assert!(SiteOrigin::is_same_page(
            "https://a.ca/brand/coco/",
            "https://a.ca/brand/coco"
        ));
        assert!(!SiteOrigin::is_same_page(
            "https://a.ca/brand/coco",
            "https://a.ca/brand/cocoa"
        ));
    }
}
