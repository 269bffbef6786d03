use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("append failed: {0}")]
    AppendFailed(String),
    #[error("read failed: {0}")]
    ReadFailed(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("insert failed: {0}")]
    InsertFailed(String),
    #[error("insert rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("insert timed out after {0:?}")]
    Timeout(std::time::Duration),
}
