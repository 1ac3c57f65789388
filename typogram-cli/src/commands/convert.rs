//! Convert command - convert one diagram and print the result.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use typogram_bridge::BridgeConfig;

/// Run the convert command.
pub async fn run(config: BridgeConfig, module: &str, input: Option<&Path>) -> Result<()> {
    let source = match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut source = String::new();
            tokio::io::stdin()
                .read_to_string(&mut source)
                .await
                .context("Failed to read diagram from stdin")?;
            source
        }
    };

    let converter = super::load_converter(config, module).await?;
    tracing::info!(module = %converter.name(), bytes = source.len(), "Converting diagram");

    let output = converter
        .convert(&source)
        .context("Conversion failed")?;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(output.as_bytes()).await?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}
