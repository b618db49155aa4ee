use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A request shape the recorder refuses before touching the store.
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
}

impl CoreError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
