use std::path::Path;

use anyhow::Context;

use crate::engine::PassportEngine;

/// Sends a JSON export to the mirror webhook, signed with `MIRROR_KEY`.
pub async fn run(engine: &PassportEngine, file: &Path, name: Option<String>) -> anyhow::Result<()> {
    let client = engine.webhook()?;
    let body = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let data: serde_json::Value =
        serde_json::from_slice(&body).with_context(|| format!("{} is not JSON", file.display()))?;

    let name = match name {
        Some(n) => n,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.json".to_string()),
    };
    let reply = client.upload(&name, &data).await?;
    println!("Uploaded {} ✓ {}", name, reply);
    Ok(())
}
