//! `[server]`, `[cache]` and `[packer]` sections.
//!
//! # Example
//!
//! ```toml
//! [server]
//! default_encoding = "utf-8"  # Encoding of text files on disk
//! http_no_cache = true        # Send `Cache-Control: no-cache`
//! no_optimize = false         # Skip the js/css minifier filters
//!
//! [cache]
//! enabled = true
//! signature = "mtime"         # or "content" (hash file bytes)
//!
//! [packer]
//! addressing = "attribute"    # or "id"
//! attribute = "fragment"
//! ```

use serde::{Deserialize, Serialize};

use crate::core::Encoding;
use crate::freshness::SignatureMode;
use crate::pack::Addressing;

/// Request handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Encoding assumed for text resources read from disk.
    pub default_encoding: Encoding,

    /// Ask clients to revalidate every response.
    pub http_no_cache: bool,

    /// Let the optimizer filters pass content through unchanged.
    pub no_optimize: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            default_encoding: Encoding::default(),
            http_no_cache: true,
            no_optimize: false,
        }
    }
}

/// Output cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// With the cache off every request recomputes.
    pub enabled: bool,

    /// How file freshness is decided.
    pub signature: SignatureMode,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            signature: SignatureMode::default(),
        }
    }
}

/// How fragment locators select elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerSection {
    pub addressing: Addressing,

    /// Attribute matched in `attribute` addressing.
    pub attribute: String,
}

impl Default for PackerSection {
    fn default() -> Self {
        Self {
            addressing: Addressing::default(),
            attribute: "fragment".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.server.default_encoding, Encoding::Utf8);
        assert!(config.server.http_no_cache);
        assert!(!config.server.no_optimize);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.signature, SignatureMode::Mtime);
        assert_eq!(config.packer.addressing, Addressing::Attribute);
        assert_eq!(config.packer.attribute, "fragment");
    }

    #[test]
    fn test_overrides() {
        let config = test_parse_config(
            r#"
[server]
default_encoding = "latin1"
http_no_cache = false
no_optimize = true

[cache]
enabled = false
signature = "content"

[packer]
addressing = "id"
"#,
        );
        assert_eq!(config.server.default_encoding, Encoding::Latin1);
        assert!(!config.server.http_no_cache);
        assert!(config.server.no_optimize);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.signature, SignatureMode::Content);
        assert_eq!(config.packer.addressing, Addressing::Id);
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let result: Result<crate::config::ServerConfig, _> =
            toml::from_str("[server]\ndefault_encoding = \"koi8-r\"");
        assert!(result.is_err());
    }
}
