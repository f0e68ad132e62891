use serde::{Deserialize, Serialize};

use super::storage::DbPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePolicyRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePolicyRequest {
    pub name: String,
    pub description: String,
    pub template: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyView {
    #[serde(flatten)]
    pub policy: DbPolicy,
    pub controls: Vec<i32>,
}
