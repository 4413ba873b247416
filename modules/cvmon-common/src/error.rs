use thiserror::Error;

#[derive(Error, Debug)]
pub enum CvMonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Metrics collection failed: {0}")]
    Collection(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CvMonError {
    /// Process exit code for a run that failed with this error.
    /// Interrupted runs are handled by the binary and exit with 130.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// True for errors raised while connecting to or reading from the log
    /// store.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }
}
