//! Export configuration
//!
//! Loaded from TOML and optionally overridden from `MODELFLAT_*`
//! environment variables.

use crate::errors::{ExportError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// How embedded double quotes inside text fields are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuoteEscaping {
    /// Embedded `"` is doubled to `""`
    #[default]
    Double,
    /// Text is wrapped in quotes and written as-is
    Verbatim,
}

impl FromStr for QuoteEscaping {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "double" => Ok(Self::Double),
            "verbatim" => Ok(Self::Verbatim),
            other => Err(ExportError::Config(format!(
                "unknown quote escaping '{other}' (expected 'double' or 'verbatim')"
            ))),
        }
    }
}

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Escaping policy for quoted text fields
    pub quote_escaping: QuoteEscaping,
    /// Check that every child id is the leaf sentinel or a valid node id
    pub validate_links: bool,
    /// Stage file output in a temporary file and rename on success
    pub atomic_write: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            quote_escaping: QuoteEscaping::Double,
            validate_links: true,
            atomic_write: false,
        }
    }
}

impl ExportConfig {
    /// Parse configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ExportError::Config(format!("failed to parse config: {e}")))
    }

    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading export configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply `MODELFLAT_*` environment overrides
    pub fn apply_env(mut self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("MODELFLAT_QUOTE_ESCAPING") {
            self.quote_escaping = val.parse()?;
        }
        if let Some(val) = lookup("MODELFLAT_VALIDATE_LINKS") {
            self.validate_links = parse_bool("MODELFLAT_VALIDATE_LINKS", &val)?;
        }
        if let Some(val) = lookup("MODELFLAT_ATOMIC_WRITE") {
            self.atomic_write = parse_bool("MODELFLAT_ATOMIC_WRITE", &val)?;
        }
        Ok(())
    }
}

fn parse_bool(key: &str, val: &str) -> Result<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ExportError::Config(format!("{key}: invalid boolean '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.quote_escaping, QuoteEscaping::Double);
        assert!(config.validate_links);
        assert!(!config.atomic_write);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ExportConfig::from_toml_str("atomic_write = true\n").unwrap();
        assert!(config.atomic_write);
        assert!(config.validate_links);
        assert_eq!(config.quote_escaping, QuoteEscaping::Double);

        let config = ExportConfig::from_toml_str("quote_escaping = \"verbatim\"\n").unwrap();
        assert_eq!(config.quote_escaping, QuoteEscaping::Verbatim);
    }

    #[test]
    fn test_invalid_toml() {
        let err = ExportConfig::from_toml_str("quote_escaping = \"single\"\n").unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MODELFLAT_QUOTE_ESCAPING", "Verbatim"),
            ("MODELFLAT_VALIDATE_LINKS", "off"),
            ("MODELFLAT_ATOMIC_WRITE", "1"),
        ]
        .into_iter()
        .collect();

        let mut config = ExportConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.quote_escaping, QuoteEscaping::Verbatim);
        assert!(!config.validate_links);
        assert!(config.atomic_write);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = ExportConfig::default();
        let err = config
            .apply_overrides(|key| (key == "MODELFLAT_ATOMIC_WRITE").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
    }
}
