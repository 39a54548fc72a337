//! Static auth configuration: the roster of accepted API keys.

use serde::{Deserialize, Serialize};

/// One entry in the key roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub principal: String,
}

/// Loaded once at startup from `CONFIG_PATH`/`SMI_API_KEYS`, mirroring the
/// original's single `API_KEY` environment variable but allowing more than
/// one caller to be distinguished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub keys: Vec<ApiKeyEntry>,
}

impl AuthConfig {
    pub fn single_key(key: impl Into<String>) -> Self {
        Self {
            keys: vec![ApiKeyEntry {
                key: key.into(),
                principal: "default".to_string(),
            }],
        }
    }

    /// Constant-time lookup: every candidate key is compared in full so the
    /// roster size and a near-match don't leak through response timing.
    pub fn authenticate(&self, presented: &str) -> Option<&str> {
        use subtle::ConstantTimeEq;
        let mut matched: Option<&str> = None;
        for entry in &self.keys {
            let equal = entry.key.len() == presented.len()
                && bool::from(entry.key.as_bytes().ct_eq(presented.as_bytes()));
            if equal {
                matched = Some(entry.principal.as_str());
            }
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticate_matches_known_key() {
        let cfg = AuthConfig::single_key("secret");
        assert_eq!(cfg.authenticate("secret"), Some("default"));
        assert_eq!(cfg.authenticate("wrong"), None);
    }

    #[test]
    fn authenticate_distinguishes_multiple_principals() {
        let cfg = AuthConfig {
            keys: vec![
                ApiKeyEntry { key: "a".into(), principal: "alice".into() },
                ApiKeyEntry { key: "b".into(), principal: "bob".into() },
            ],
        };
        assert_eq!(cfg.authenticate("b"), Some("bob"));
    }
}
