use thiserror::Error;

const GENERIC_ALERT: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("session is no longer valid: {0}")]
    Unauthorized(String),

    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("location unavailable: {0}")]
    Location(String),
}

impl ClientError {
    /// Text for the blocking alert shown after a user-initiated action fails.
    pub fn alert_message(&self) -> String {
        match self {
            ClientError::Unauthorized(message) | ClientError::Rejected { message, .. }
                if !message.is_empty() =>
            {
                message.clone()
            }
            ClientError::Location(message) => message.clone(),
            _ => GENERIC_ALERT.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::ClientError;

    #[test]
    fn alert_prefers_the_server_message() {
        let err = ClientError::Rejected {
            status: 400,
            message: "Order must be 'reached' before completion".to_string(),
        };
        assert_eq!(err.alert_message(), "Order must be 'reached' before completion");
    }

    #[test]
    fn alert_falls_back_to_generic_text() {
        let err = ClientError::Rejected {
            status: 502,
            message: String::new(),
        };
        assert!(err.alert_message().contains("try again"));
    }
}
