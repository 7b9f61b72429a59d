use common::CommonError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("File not found: {0}")]
    NotFound(String),
}

impl ClientError {
    /// Single alert shown to the user, always ending with what to do next
    pub fn user_message(&self) -> String {
        match self {
            ClientError::PermissionDenied(path) => format!(
                "Access to {} was denied. Allow access in your settings and try again.",
                path
            ),
            ClientError::AuthRequired => "Please log in to continue.".to_string(),
            ClientError::Timeout => "The request timed out. Please try again.".to_string(),
            ClientError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ClientError::Server { status: 401, .. } => {
                "Your session has expired. Please log in again.".to_string()
            }
            ClientError::Server { message, .. } => format!("{}. Please try again.", message),
            ClientError::Parse(_) => {
                "The server sent an unexpected response. Please try again.".to_string()
            }
            ClientError::InvalidInput(msg) => format!("{}. Please check and try again.", msg),
            ClientError::Storage(_) => {
                "Could not access local storage. Please try again.".to_string()
            }
            ClientError::NotFound(path) => {
                format!("{} could not be found. Pick another file and try again.", path)
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Timeout | ClientError::Network(_) => true,
            ClientError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => ClientError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => ClientError::NotFound(err.to_string()),
            _ => ClientError::Storage(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(err.to_string())
    }
}

impl From<CommonError> for ClientError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::Serialization(e) => ClientError::Parse(e.to_string()),
            CommonError::InvalidData(msg) => ClientError::InvalidInput(msg),
            CommonError::UnknownPolicy(_) => ClientError::InvalidInput(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_auth_required() {
        assert_eq!(
            ClientError::AuthRequired.user_message(),
            "Please log in to continue."
        );
    }

    #[test]
    fn test_user_message_server_uses_service_text() {
        let err = ClientError::Server {
            status: 400,
            message: "Unsupported file".to_string(),
        };
        assert_eq!(err.user_message(), "Unsupported file. Please try again.");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_message_expired_session() {
        let err = ClientError::Server {
            status: 401,
            message: "Invalid token.".to_string(),
        };
        assert!(err.user_message().contains("log in again"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::Network("reset".to_string()).is_retryable());
        assert!(ClientError::Server {
            status: 503,
            message: "busy".to_string()
        }
        .is_retryable());
        assert!(!ClientError::Parse("eof".to_string()).is_retryable());
        assert!(!ClientError::AuthRequired.is_retryable());
    }

    #[test]
    fn test_from_io_error() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "photo.jpg");
        assert!(matches!(
            ClientError::from(denied),
            ClientError::PermissionDenied(_)
        ));

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "photo.jpg");
        assert!(matches!(ClientError::from(missing), ClientError::NotFound(_)));

        let other = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(matches!(ClientError::from(other), ClientError::Storage(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(err.to_string().starts_with("Malformed response"));
    }

    #[test]
    fn test_from_common_error() {
        let err: ClientError = CommonError::InvalidData("blank text".to_string()).into();
        assert!(matches!(err, ClientError::InvalidInput(ref m) if m == "blank text"));
    }
}
