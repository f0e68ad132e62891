use serde::{Deserialize, Serialize};

use super::storage::{DbControl, DbSubControl};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubControlRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ref_code: String,
    #[serde(default)]
    pub mitigation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateControlRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "ref_code")]
    pub control_ref: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub criteria: String,
    pub framework_id: Option<i32>,
    #[serde(default)]
    pub subcontrols: Vec<CreateSubControlRequest>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A control as returned by the API, with its checklist and tag names.
#[derive(Debug, Clone, Serialize)]
pub struct ControlView {
    #[serde(flatten)]
    pub control: DbControl,
    pub subcontrols: Vec<DbSubControl>,
    pub tags: Vec<String>,
}
