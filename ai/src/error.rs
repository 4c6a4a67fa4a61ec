use imlo_spelling::FallbackError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("AI_API_KEY is required for the generative client")]
    MissingApiKey,

    #[error("HTTP error {0}: {1}")]
    Http(u16, String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub fn http(status: u16) -> Self {
        let message = match status {
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Unknown Error",
        };
        Self::Http(status, message.to_string())
    }
}

impl From<ClientError> for FallbackError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http(status, _) => FallbackError::Http(status),
            ClientError::InvalidResponse(msg) => FallbackError::InvalidResponse(msg),
            other => FallbackError::Unavailable(other.to_string()),
        }
    }
}
