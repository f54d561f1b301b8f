//! Site and message models with validated payload decoding

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{HeimdallError, Result};

/// Per-status-code request statistics for a site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBucket {
    pub code: u16,
    pub count: u64,
    #[serde(default)]
    pub min_time: i64,
    #[serde(default)]
    pub max_time: i64,
    #[serde(default)]
    pub total_time: i64,
}

/// Latest known snapshot of a monitored site
///
/// Snapshots are replaced wholesale on every arrival; fields are never
/// merged between an old and a new record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Creation timestamp, epoch seconds
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub latest_request: i64,
    #[serde(default)]
    pub latest_ping: i64,
    #[serde(default)]
    pub latest_message_timestamp: i64,
    #[serde(default)]
    pub total_requests: i64,
    #[serde(default)]
    pub total_requests_time: i64,
    #[serde(default)]
    pub requests_min_time: i64,
    #[serde(default)]
    pub requests_max_time: i64,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub status: HashMap<u16, StatusBucket>,
}

impl Site {
    /// Decode a push-channel frame into a site snapshot.
    ///
    /// The boundary check: an unparseable frame or a record with a missing
    /// or zero id is rejected as malformed and never reaches the registry.
    pub fn from_push_frame(payload: &str) -> Result<Self> {
        let site: Site = serde_json::from_str(payload)
            .map_err(|e| HeimdallError::MalformedPayload(format!("unparseable frame: {}", e)))?;
        if site.id == 0 {
            return Err(HeimdallError::MalformedPayload(
                "missing or zero site id".to_string(),
            ));
        }
        Ok(site)
    }
}

/// A short log line attached to a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMessage {
    pub id: i64,
    /// Owning site id
    pub site: i64,
    pub timestamp: i64,
    /// Free text, may contain embedded newlines
    pub text: String,
    pub tag: String,
}
