//! Render command - splice rendered diagrams into an HTML document.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use typogram_bridge::{BridgeConfig, render_document};

/// Run the render command.
pub async fn run(
    config: BridgeConfig,
    module: &str,
    document: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let html = tokio::fs::read_to_string(document)
        .await
        .with_context(|| format!("Failed to read document {}", document.display()))?;

    let converter = super::load_converter(config, module).await?;
    let rendered = render_document(&html, |source| converter.convert(source))
        .with_context(|| format!("Failed to render {}", document.display()))?;

    tracing::info!(
        document = %document.display(),
        blocks = rendered.blocks,
        "Rendered document"
    );
    if rendered.blocks == 0 {
        tracing::warn!(
            document = %document.display(),
            "Document contains no <script type=\"text/typogram\"> blocks"
        );
    }

    match output {
        Some(path) => tokio::fs::write(path, rendered.html.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(rendered.html.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
