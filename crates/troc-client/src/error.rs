use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Could not reach the server: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded {status}: {message}")]
    Api {
        status: u16,
        message: String,
        /// Validation reason code, when the server sent one.
        code: Option<String>,
    },
}

impl ClientError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => code.as_deref(),
            ClientError::Http(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
