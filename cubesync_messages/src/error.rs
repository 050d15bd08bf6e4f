pub type Result<T> = core::result::Result<T, MessageError>;

#[derive(thiserror::Error, Debug)]
pub enum MessageError {
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message has no `type` field")]
    MissingType,
}
