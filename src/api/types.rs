//! Shared DTOs for JSON requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query string of `GET /api/dashboard`; values stay raw so bad input maps to 400.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub sector: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Returned while the first snapshot is still being built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparingBody {
    pub error: String,
    pub sectors: Vec<serde_json::Value>,
}

impl Default for PreparingBody {
    fn default() -> Self {
        Self {
            error: "Data is being prepared. Check back in a few minutes.".to_string(),
            sectors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaBody {
    pub last_updated: Option<DateTime<Utc>>,
}
