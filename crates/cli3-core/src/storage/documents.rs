//! Saved documents: a completed request written as versioned JSON.

use super::Result;
use crate::api::models::{ParamValues, Query};
use crate::core::request::Request;
use crate::error::StorageError;
use crate::utils::error_helpers::convert_io_error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedDocument {
    pub version: u32,
    pub id: Uuid,
    pub query: Query,
    pub params: ParamValues,
    pub status: i32,
    pub answer: String,
}

impl SavedDocument {
    /// Only completed requests can be saved.
    pub fn from_request(request: &Request) -> Option<Self> {
        let (status, answer) = match (request.answer(), request.error()) {
            (Some(answer), _) => (0, answer.to_string()),
            (None, Some((code, message))) => (code, message.to_string()),
            (None, None) => return None,
        };
        Some(Self {
            version: FORMAT_VERSION,
            id: request.id(),
            query: request.query().clone(),
            params: request.params().clone(),
            status,
            answer,
        })
    }

    pub fn into_request(self) -> Request {
        Request::restore(self.id, self.query, self.params, self.status, self.answer)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| StorageError::DocumentFormat {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| convert_io_error(e, parent))?;
        }
        fs::write(path, json).map_err(|e| convert_io_error(e, path))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| convert_io_error(e, path))?;
        let format_error = |message: String| StorageError::DocumentFormat {
            path: path.display().to_string(),
            message,
        };

        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| format_error(e.to_string()))?;
        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| format_error("missing format version".to_string()))?;
        if version > u64::from(FORMAT_VERSION) {
            return Err(StorageError::UnsupportedVersion {
                found: u32::try_from(version).unwrap_or(u32::MAX),
                supported: FORMAT_VERSION,
            });
        }

        serde_json::from_value(value).map_err(|e| format_error(e.to_string()))
    }
}
