//! Tile URL templating (§6.2), grounded in the teacher's
//! `tiles/source.rs::TileSource` trait and its subdomain-by-hash selection.

use crate::core::geo::TileCoord;

/// Anything that can produce a fetch URL for a tile coordinate.
pub trait TileSource: Send + Sync {
    fn url_for(&self, coord: TileCoord) -> String;
}

/// The default provider (§6.2): CartoDB's dark basemap, `@2x` tiles, with
/// subdomain selected by `(x + y) mod |subdomains|` for cache coherence
/// (the same tile always hits the same CDN edge).
pub struct CartoDarkProvider {
    subdomains: Vec<char>,
}

impl CartoDarkProvider {
    pub fn new() -> Self {
        Self {
            subdomains: vec!['a', 'b', 'c', 'd'],
        }
    }
}

impl Default for CartoDarkProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for CartoDarkProvider {
    fn url_for(&self, coord: TileCoord) -> String {
        let idx = ((coord.x + coord.y) % self.subdomains.len() as u32) as usize;
        let sub = self.subdomains[idx];
        format!(
            "https://{sub}.basemaps.cartocdn.com/dark_all/{}/{}/{}@2x.png",
            coord.z, coord.x, coord.y
        )
    }
}

/// A generic provider built from a `{s}/{z}/{x}/{y}` template, for any other
/// tile server.
pub struct UrlTemplateProvider {
    template: String,
    subdomains: Vec<String>,
}

impl UrlTemplateProvider {
    /// Validates that `template` carries the `{z}`, `{x}`, and `{y}`
    /// placeholders `url_for` substitutes — a template missing one of them
    /// would silently serve the same URL for every tile.
    pub fn new(template: impl Into<String>, subdomains: Vec<String>) -> crate::error::Result<Self> {
        let template = template.into();
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(crate::error::MapError::Provider(format!(
                    "tile URL template missing required placeholder {placeholder}: {template}"
                )));
            }
        }
        Ok(Self { template, subdomains })
    }
}

impl TileSource for UrlTemplateProvider {
    fn url_for(&self, coord: TileCoord) -> String {
        let sub = if self.subdomains.is_empty() {
            ""
        } else {
            let idx = ((coord.x + coord.y) as usize) % self.subdomains.len();
            &self.subdomains[idx]
        };
        self.template
            .replace("{s}", sub)
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_url_generation() {
        // §8 scenario 4.
        let provider = CartoDarkProvider::new();
        let url = provider.url_for(TileCoord::new(1234, 5678, 12));
        assert_eq!(url, "https://a.basemaps.cartocdn.com/dark_all/12/1234/5678@2x.png");
    }

    #[test]
    fn template_provider_substitutes_all_placeholders() {
        let provider = UrlTemplateProvider::new(
            "https://{s}.tile.example.com/{z}/{x}/{y}.png",
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        let url = provider.url_for(TileCoord::new(3, 4, 5));
        assert!(url.starts_with("https://"));
        assert!(url.contains("/5/3/4.png"));
    }

    #[test]
    fn template_missing_placeholder_is_rejected() {
        let result = UrlTemplateProvider::new("https://tile.example.com/{z}/{x}.png", vec![]);
        assert!(matches!(result, Err(crate::error::MapError::Provider(_))));
    }
}
