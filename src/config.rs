//! Application settings.

use serde::Deserialize;

use crate::template::DEFAULT_TITLE;

/// Settings for [`HttpBin`](crate::app::HttpBin).
///
/// Deserializes from JSON with every field optional:
///
/// ```
/// use routebin::config::Config;
///
/// let config: Config = serde_json::from_str(r#"{ "realm": "Staging" }"#).unwrap();
/// assert_eq!(config.realm, "Staging");
/// assert_eq!(config.gzip_min_size, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Title of the route index page.
    pub title: String,
    /// Realm announced in `WWW-Authenticate` challenges.
    pub realm: String,
    /// Smallest body, in bytes, that `/gzip` will compress.
    pub gzip_min_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            realm: "Fake Realm".to_owned(),
            gzip_min_size: 10,
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    #[must_use]
    pub fn with_gzip_min_size(mut self, min_size: usize) -> Self {
        self.gzip_min_size = min_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn builders_override() {
        let config = Config::default()
            .with_title("Bin")
            .with_realm("R")
            .with_gzip_min_size(0);
        assert_eq!(config.title, "Bin");
        assert_eq!(config.realm, "R");
        assert_eq!(config.gzip_min_size, 0);
    }
}
