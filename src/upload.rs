//! `corpai upload`: add documents to a category's knowledge base.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::api::{ApiClient, UploadFile};
use crate::config::UploadConfig;
use crate::error::ClientError;

pub const UPLOAD_OK: &str = "Upload Successful!";
pub const UPLOAD_ERROR: &str = "Upload Error";

/// Check the form before anything is read or sent.
pub fn validate(config: &UploadConfig, category: &str, files: &[PathBuf]) -> Result<String> {
    let Some(category) = config
        .categories
        .iter()
        .find(|c| c.eq_ignore_ascii_case(category.trim()))
    else {
        bail!(
            "Please select a category! Choose one of: {}",
            config.categories.join(", ")
        );
    };
    if files.is_empty() {
        bail!("Please upload at least one file!");
    }
    for file in files {
        if !has_allowed_extension(file, &config.allowed_extensions) {
            bail!(
                "{}: only {} files can be uploaded",
                file.display(),
                config.allowed_extensions.join(", ")
            );
        }
    }
    Ok(category.clone())
}

fn has_allowed_extension(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

/// The line shown after an upload attempt.
pub fn outcome_message(result: &Result<Option<String>, ClientError>) -> String {
    match result {
        Ok(Some(message)) => message.clone(),
        Ok(None) => UPLOAD_OK.to_string(),
        Err(ClientError::Rejected { detail, .. } | ClientError::Unauthorized { detail }) => {
            format!("Upload Failed: {}", detail)
        }
        Err(_) => UPLOAD_ERROR.to_string(),
    }
}

pub async fn run_upload(
    client: &ApiClient,
    config: &UploadConfig,
    category: Option<&str>,
    files: &[PathBuf],
) -> Result<()> {
    let category = validate(
        config,
        category.unwrap_or(&config.default_category),
        files,
    )?;

    let mut parts = Vec::with_capacity(files.len());
    for path in files {
        let file = UploadFile::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        tracing::debug!(file = %file.file_name, bytes = file.bytes.len(), "queued for upload");
        parts.push(file);
    }

    let result = client.upload_knowledge(parts, &category).await;
    let message = outcome_message(&result);
    match result {
        Ok(_) => {
            println!("{}", message);
            Ok(())
        }
        Err(e) => {
            tracing::warn!("upload failed: {}", e);
            bail!(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn config() -> UploadConfig {
        UploadConfig::default()
    }

    #[test]
    fn category_must_be_known() {
        let files = vec![PathBuf::from("q1.pdf")];
        assert_eq!(validate(&config(), "sales", &files).unwrap(), "Sales");
        assert!(validate(&config(), "General", &files).is_err());
    }

    #[test]
    fn needs_a_file_with_allowed_extension() {
        assert!(validate(&config(), "HR", &[]).is_err());
        assert!(validate(&config(), "HR", &[PathBuf::from("notes.txt")]).is_err());
        assert!(validate(&config(), "HR", &[PathBuf::from("README")]).is_err());
        assert!(validate(&config(), "HR", &[PathBuf::from("Policy.PDF")]).is_ok());
    }

    #[test]
    fn messages() {
        assert_eq!(outcome_message(&Ok(None)), UPLOAD_OK);
        assert_eq!(
            outcome_message(&Ok(Some("3 files indexed".into()))),
            "3 files indexed"
        );
        assert_eq!(
            outcome_message(&Err(ClientError::Rejected {
                status: StatusCode::BAD_REQUEST,
                detail: "Only PDF allowed".into()
            })),
            "Upload Failed: Only PDF allowed"
        );
        assert_eq!(
            outcome_message(&Err(ClientError::Decode {
                endpoint: "/admin/knowledge/upload".into(),
                message: "not json".into()
            })),
            UPLOAD_ERROR
        );
    }
}
