use crate::model::error::{UploadError, UploadResult};
use serde::Deserialize;

/// Body returned by `POST /api/v1/upload`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub file_hash: Option<String>,
}

impl UploadResponse {
    pub fn parse(body: &str) -> UploadResult<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// The content identifier, if the server reported success and sent one
    pub fn into_identifier(self) -> UploadResult<String> {
        match self.file_hash {
            Some(hash) if self.success && !hash.trim().is_empty() => Ok(hash),
            _ => Err(UploadError::MissingIdentifier),
        }
    }
}
