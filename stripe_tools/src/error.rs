use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("Unexpected event payload: {0}")]
    UnexpectedObject(String),
}

impl StripeApiError {
    /// Rate limiting and server-side failures are worth retrying. Everything else will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RestResponseError(_) => true,
            Self::QueryError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
