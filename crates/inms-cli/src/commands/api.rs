//! Raw API calls with the stored session attached.

use super::describe;
use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use inms_client::{auth_context, MultipartForm};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

pub async fn get(path: &str, format: &OutputFormat) -> Result<()> {
    let value: Value = auth_context()
        .client()
        .get_json(path)
        .await
        .map_err(describe)?;
    output::print_value(&value, format);
    Ok(())
}

pub async fn post(path: &str, data: &str, format: &OutputFormat) -> Result<()> {
    let body: Value = serde_json::from_str(data).context("--data is not valid JSON")?;

    let value: Value = auth_context()
        .client()
        .post_json(path, &body)
        .await
        .map_err(describe)?;
    output::print_value(&value, format);
    Ok(())
}

pub async fn delete(path: &str, format: &OutputFormat) -> Result<()> {
    let response = auth_context()
        .client()
        .delete(path)
        .await
        .map_err(describe)?;

    let value: Value = response.json().map_err(describe)?;
    if value.is_null() {
        output::print_success(&format!("Deleted {}", path), format);
    } else {
        output::print_value(&value, format);
    }
    Ok(())
}

/// Send `file` as a single multipart part named `field`.
pub async fn upload(path: &str, file: &Path, field: &str, format: &OutputFormat) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    debug!(path, file_name = %file_name, size = bytes.len(), "Uploading file");
    let form = MultipartForm::new().file(field, file_name, None, bytes);

    let value: Value = auth_context()
        .client()
        .upload(path, form)
        .await
        .map_err(describe)?;
    output::print_value(&value, format);
    Ok(())
}
