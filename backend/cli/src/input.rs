use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

/// Read a whole input from a file path, or from stdin when `source` is `-`.
pub async fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("Failed to read input file: {source}"))
}
