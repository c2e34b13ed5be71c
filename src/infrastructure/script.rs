//! Handler scripts
//!
//! A script is a JSON file describing which handler to build for a run:
//!
//! ```json
//! { "handler": "selectors", "url_field": "url", "fields": [ ... ] }
//! { "handler": "command", "program": "python3", "args": ["enrich.py"] }
//! ```
//!
//! The file stem also names the run's checkpoint.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::application::handler::ItemHandler;
use crate::error::{ScrapeError, ScrapeResult};
use crate::infrastructure::handlers::command_handler::{CommandHandler, CommandScript};
use crate::infrastructure::handlers::selector_handler::{SelectorHandler, SelectorScript};
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "handler", rename_all = "snake_case")]
pub enum HandlerScript {
    Selectors(SelectorScript),
    Command(CommandScript),
}

impl HandlerScript {
    pub async fn load(path: &Path) -> ScrapeResult<Self> {
        let script_error = |reason: String| ScrapeError::Script {
            path: path.to_path_buf(),
            reason,
        };

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| script_error(format!("cannot read: {e}")))?;
        let script: Self =
            serde_json::from_str(&raw).map_err(|e| script_error(format!("invalid script: {e}")))?;
        script.validate().map_err(script_error)?;
        Ok(script)
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Selectors(script) => script.validate(),
            Self::Command(script) => script.validate(),
        }
    }

    /// Build the handler this script describes; `name` is used in logs and errors.
    pub fn into_handler(
        self,
        name: &str,
        http: &HttpClientConfig,
    ) -> anyhow::Result<Box<dyn ItemHandler>> {
        Ok(match self {
            Self::Selectors(script) => {
                info!("Preparing selector handler '{}' ({} fields)", name, script.fields.len());
                Box::new(SelectorHandler::new(name, script, HttpClient::new(http.clone())?)?)
            }
            Self::Command(script) => {
                info!("Preparing command handler '{}': {}", name, script.program);
                Box::new(CommandHandler::new(name, script))
            }
        })
    }
}

/// Load the script at `path` and build its handler.
pub async fn load_handler(path: &Path, http: &HttpClientConfig) -> ScrapeResult<Box<dyn ItemHandler>> {
    info!("Loading script from {:?}", path);
    let name = path
        .file_stem()
        .map_or_else(|| "script".to_string(), |s| s.to_string_lossy().into_owned());

    HandlerScript::load(path)
        .await?
        .into_handler(&name, http)
        .map_err(|e| ScrapeError::Script {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn loads_selector_script() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("product.json");
        std::fs::write(
            &path,
            r#"{
                "handler": "selectors",
                "wait_for": "li",
                "key_values": {"selector": "li", "separator": ": "},
                "fields": [{"name": "seller", "selector": "li a", "extract": "link"}]
            }"#,
        )
        .unwrap();

        let script = HandlerScript::load(&path).await.unwrap();
        let HandlerScript::Selectors(script) = script else {
            panic!("expected selector script");
        };
        assert_eq!(script.url_field, "url");
        assert_eq!(script.fields.len(), 1);

        let handler = load_handler(&path, &HttpClientConfig::default()).await.unwrap();
        assert_eq!(handler.name(), "product");
    }

    #[tokio::test]
    async fn loads_command_script() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("enrich.json");
        std::fs::write(&path, r#"{"handler": "command", "program": "cat"}"#).unwrap();

        let HandlerScript::Command(script) = HandlerScript::load(&path).await.unwrap() else {
            panic!("expected command script");
        };
        assert_eq!(script.program, "cat");
        assert!(script.args.is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_handler_and_bad_selectors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");

        std::fs::write(&path, r#"{"handler": "puppeteer"}"#).unwrap();
        assert!(matches!(
            HandlerScript::load(&path).await.unwrap_err(),
            ScrapeError::Script { .. }
        ));

        std::fs::write(
            &path,
            r#"{"handler": "selectors", "fields": [{"name": "x", "selector": "li[[["}]}"#,
        )
        .unwrap();
        assert!(matches!(
            HandlerScript::load(&path).await.unwrap_err(),
            ScrapeError::Script { .. }
        ));
    }

    #[tokio::test]
    async fn missing_script_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = HandlerScript::load(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(err.is_start_of_run());
    }
}
