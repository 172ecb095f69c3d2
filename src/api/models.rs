use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_offset")]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

fn default_offset() -> usize {
    0
}

#[derive(Debug, Deserialize)]
pub struct DeletionRequestBody {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmDeletionBody {
    pub token: uuid::Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmDeletionQuery {
    pub token: uuid::Uuid,
}
