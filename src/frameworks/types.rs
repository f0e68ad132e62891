use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFrameworkRequest {
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
}
