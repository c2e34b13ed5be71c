//! External command handler
//!
//! Each element is written as JSON to the program's stdin; whatever JSON the
//! program prints on stdout is the item result. A non-zero exit fails the item.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::application::handler::{ItemContext, ItemHandler};

#[derive(Debug, Clone, Deserialize)]
pub struct CommandScript {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the program
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl CommandScript {
    pub fn validate(&self) -> Result<(), String> {
        if self.program.trim().is_empty() {
            return Err("command script needs a non-empty 'program'".to_string());
        }
        Ok(())
    }
}

pub struct CommandHandler {
    name: String,
    script: CommandScript,
}

impl CommandHandler {
    pub fn new(name: impl Into<String>, script: CommandScript) -> Self {
        Self {
            name: name.into(),
            script,
        }
    }

    fn command(&self, ctx: &ItemContext<'_>) -> Command {
        let mut command = Command::new(&self.script.program);
        command
            .args(&self.script.args)
            .envs(&self.script.env)
            .env("DATASET_SCRAPER_INDEX", ctx.index.to_string())
            .env("DATASET_SCRAPER_TOTAL", ctx.total.to_string())
            .env("DATASET_SCRAPER_LOCATION", ctx.location.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.script.cwd {
            command.current_dir(cwd);
        }
        command
    }
}

#[async_trait]
impl ItemHandler for CommandHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ItemContext<'_>, element: &Value) -> Result<Value> {
        let input = serde_json::to_vec(element)?;
        let mut child = self
            .command(ctx)
            .spawn()
            .with_context(|| format!("failed to start '{}'", self.script.program))?;

        // Feed stdin from a task so a chatty program cannot block on a full stdout pipe
        let stdin = child.stdin.take().context("child stdin was not captured")?;
        let writer = tokio::spawn(async move {
            let mut stdin = stdin;
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("failed to wait for '{}'", self.script.program))?;
        // A program that exits without reading stdin is not an error by itself
        if let Ok(Err(e)) = writer.await {
            debug!("stdin of '{}' closed early: {}", self.script.program, e);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "'{}' exited with {}: {}",
                self.script.program,
                output.status,
                stderr.trim()
            );
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("'{}' did not print a JSON value", self.script.program))
    }
}
