use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use checkout_engine::{traits::GatewayError, OrderFlowError};
use log::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Webhook rejected. {0}")]
    WebhookRejected(String),
    #[error("The payment provider could not process the request. {0}")]
    PaymentProviderError(String),
    #[error("The payment provider is unavailable. {0}")]
    PaymentProviderUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::WebhookRejected(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::PaymentProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::ValidationError(_) |
            OrderFlowError::InvalidReference(_) |
            OrderFlowError::InsufficientStock { .. } |
            OrderFlowError::InvalidTransition { .. } => Self::InvalidRequest(e.to_string()),
            OrderFlowError::NotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::Unauthorized(_) => Self::InsufficientPermissions(e.to_string()),
            OrderFlowError::DuplicatePaymentReference(_) => Self::Conflict(e.to_string()),
            OrderFlowError::DatabaseError(_) => {
                error!("💻️ Backend failure: {e}");
                Self::BackendError(e.to_string())
            },
            OrderFlowError::GatewayError(g) => g.into(),
        }
    }
}

impl From<GatewayError> for ServerError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::SignatureInvalid(_) | GatewayError::MalformedPayload(_) => {
                Self::WebhookRejected(e.to_string())
            },
            GatewayError::ProviderError(_) => Self::PaymentProviderError(e.to_string()),
            GatewayError::Unavailable(_) => Self::PaymentProviderUnavailable(e.to_string()),
        }
    }
}
