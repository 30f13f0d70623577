use thiserror::Error;

pub type Result<T> = std::result::Result<T, HqError>;

#[derive(Debug, Error)]
pub enum HqError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("reply channel closed")]
    ChannelClosed,
}
