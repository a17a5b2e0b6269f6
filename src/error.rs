use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid render configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of a single subtask, reported once to the waiter of its task
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("subtask {subtask} failed: {message}")]
    Failed { subtask: usize, message: String },
    #[error("subtask {subtask} panicked: {message}")]
    Panicked { subtask: usize, message: String },
}
