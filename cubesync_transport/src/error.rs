pub type Result<T> = core::result::Result<T, TransportError>;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),
    #[error("the transport is not open")]
    NotConnected,
    #[error("the transport is closed")]
    Closed,
    #[error("connection refused by {0}")]
    Refused(String),
    #[error("the io task is gone")]
    IoTaskGone,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
