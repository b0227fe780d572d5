// sbt.rs
// Client for the SBT image service: uploads, ongoing generation tasks, hints.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Most images kept in one upload session.
pub const MAX_UPLOAD_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Home,
    Upload,
    Theme,
    Mint,
    Generating,
    Generated,
    MintedList,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImg {
    pub style: String,
    pub url: String,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default, rename = "proofId")]
    pub proof_id: Option<String>,
    #[serde(default)]
    pub blur_url: Option<String>,
    #[serde(default, rename = "assetId")]
    pub asset_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnGoingTaskResult {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub urls: Vec<GeneratedImg>,
    #[serde(default)]
    pub model_id: String,
}

impl OnGoingTaskResult {
    /// An answer with any field at all is a task, even `{"status": false}`;
    /// only `null` or `{}` mean there is nothing to resume.
    pub fn from_response(value: serde_json::Value) -> Result<Option<Self>> {
        let absent = match &value {
            serde_json::Value::Null => true,
            serde_json::Value::Object(fields) => fields.is_empty(),
            _ => false,
        };
        if absent {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value).context("invalid ongoing task response")?))
    }

    /// Where resuming this task lands.
    pub fn resume_step(&self) -> Step {
        if self.status && !self.urls.is_empty() {
            Step::Generated
        } else {
            Step::Generating
        }
    }
}

#[derive(Deserialize)]
struct HintStatus {
    status: bool,
}

pub fn should_show_ongoing_task(step: Step, task: Option<&OnGoingTaskResult>) -> bool {
    matches!(step, Step::Home | Step::Upload) && task.is_some()
}

/// Appends `added` to `existing`, keeping at most [`MAX_UPLOAD_LEN`] entries.
pub fn merge_uploads(existing: &[UploadFile], added: Vec<UploadFile>) -> Vec<UploadFile> {
    existing.iter().cloned().chain(added).take(MAX_UPLOAD_LEN).collect()
}

pub struct SbtClient {
    endpoint: String,
    client: reqwest::Client,
}

impl SbtClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self { endpoint: endpoint.into().trim_end_matches('/').to_string(), client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Uploads `files` (name, bytes) for `address`. A failed request marks
    /// every file of this batch as unsuccessful instead of erroring.
    pub async fn upload_files(&self, address: &str, existing: &[UploadFile], files: Vec<(String, Vec<u8>)>) -> Vec<UploadFile> {
        let names: Vec<String> = files.iter().map(|(n, _)| n.clone()).collect();
        let added = match self.post_files(address, files).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                warn!("⚠️  image upload failed: {e:#}");
                names
                    .into_iter()
                    .map(|name| UploadFile { name: Some(name), url: None, success: Some(false) })
                    .collect()
            }
        };
        merge_uploads(existing, added)
    }

    async fn post_files(&self, address: &str, files: Vec<(String, Vec<u8>)>) -> Result<Vec<UploadFile>> {
        let mut form = reqwest::multipart::Form::new().text("address", address.to_string());
        for (name, bytes) in files {
            form = form.part("files", reqwest::multipart::Part::bytes(bytes).file_name(name));
        }
        let response = self
            .client
            .post(self.url("/npo/files"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await.context("invalid upload response")?)
    }

    /// The task still running for `address`, if the service reports one.
    pub async fn ongoing_task(&self, address: &str) -> Result<Option<OnGoingTaskResult>> {
        let response = self
            .client
            .post(self.url("/npo/ongoing"))
            .json(&serde_json::json!({ "address": address }))
            .send()
            .await?
            .error_for_status()?;
        let value: serde_json::Value = response.json().await.context("invalid ongoing task response")?;
        OnGoingTaskResult::from_response(value)
    }

    pub async fn hint_status(&self, address: &str) -> Result<bool> {
        let response = self
            .client
            .post(self.url("/npo/hint"))
            .json(&serde_json::json!({ "address": address }))
            .send()
            .await?
            .error_for_status()?;
        let hint: HintStatus = response.json().await.context("invalid hint response")?;
        Ok(hint.status)
    }

    /// Marks the hint as seen for `address`.
    pub async fn dismiss_hint(&self, address: &str) -> Result<()> {
        self.client
            .post(self.url("/npo/hints"))
            .json(&serde_json::json!({ "address": address }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
