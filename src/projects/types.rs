use serde::{Deserialize, Serialize};

use crate::evidence::DbEvidence;

use super::completion::CompletionCounts;
use super::storage::{DbProject, DbProjectControl, DbProjectPolicy, DbProjectSubControl};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub framework_id: Option<i32>,
    #[serde(default = "default_true")]
    pub import_controls: bool,
    #[serde(default)]
    pub policies: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProjectPolicyRequest {
    pub name: String,
    pub description: String,
    pub template: String,
    pub content: String,
    pub public: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProjectSubControlRequest {
    pub applicable: bool,
    pub implemented: i32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub evidence: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicabilityRequest {
    pub applicable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub controls: i64,
    pub policies: i64,
    #[serde(flatten)]
    pub completion: CompletionCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: DbProject,
    #[serde(flatten)]
    pub summary: ProjectSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSubControlView {
    #[serde(flatten)]
    pub subcontrol: DbProjectSubControl,
    pub name: String,
    pub ref_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<DbEvidence>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectControlView {
    #[serde(flatten)]
    pub project_control: DbProjectControl,
    pub name: String,
    pub control_ref: String,
    pub description: String,
    pub subcontrols: Vec<ProjectSubControlView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectPolicyView {
    #[serde(flatten)]
    pub policy: DbProjectPolicy,
    pub controls: Vec<i32>,
}
