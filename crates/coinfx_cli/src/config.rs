//! Effect configuration files
//!
//! A config file is TOML with one table per effect. Every table and field is
//! optional; anything missing keeps its default.

use anyhow::{Context, Result};
use coinfx_effects::EffectsConfig;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Load `path`, or the defaults when no path is given
pub fn load(path: Option<&Path>) -> Result<EffectsConfig> {
    let Some(path) = path else {
        return Ok(EffectsConfig::default());
    };

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = parse(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    info!("Loaded effect config from {}", path.display());

    for finding in config.validate() {
        warn!("{}: {}", path.display(), finding);
    }
    Ok(config)
}

pub fn parse(content: &str) -> Result<EffectsConfig> {
    Ok(toml::from_str(content)?)
}

/// The default configuration as a commented TOML document
pub fn default_toml() -> Result<String> {
    let body = toml::to_string_pretty(&EffectsConfig::default())
        .context("Failed to serialize default config")?;
    Ok(format!(
        "# coinfx effect configuration\n# Every table and field is optional.\n\n{body}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_document_round_trips() {
        let text = default_toml().unwrap();
        assert!(text.starts_with("# coinfx"));
        assert_eq!(parse(&text).unwrap(), EffectsConfig::default());
    }

    #[test]
    fn test_missing_path_gives_defaults() {
        assert_eq!(load(None).unwrap(), EffectsConfig::default());
    }

    #[test]
    fn test_bad_file_reports_path() {
        let err = load(Some(Path::new("/nonexistent/coinfx.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/coinfx.toml"));
    }
}
