use serde::{Deserialize, Serialize};

/// Body of both create and update; update overwrites every field.
#[derive(Debug, Clone, Deserialize)]
pub struct EvidenceRequest {
    pub name: String,
    pub description: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvidenceFileList {
    pub files: Vec<i32>,
}

/// A stored attachment, ready to be sent back.
#[derive(Debug, Clone)]
pub struct EvidenceDownload {
    pub name: String,
    pub data: Vec<u8>,
}
