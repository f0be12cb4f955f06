//! Access token validation.
//!
//! Tokens are HS256 JWTs issued by the user service and sent in the `Authorization: Bearer <token>` header. The claims
//! identify the customer and say whether they are an administrator.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpMessage, HttpRequest};
use checkout_engine::db_types::{Customer, UserId};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id.
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub admin: bool,
    /// Expiry, in unix seconds.
    pub exp: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> UserId {
        UserId::from(self.sub.as_str())
    }

    pub fn customer(&self) -> Customer {
        Customer::new(self.sub.as_str(), self.name.as_str(), self.email.as_str())
    }

    pub fn has_role(&self, role: Role) -> bool {
        match role {
            Role::User => true,
            Role::Admin => self.admin,
        }
    }
}

pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenValidator(HS256)")
    }
}

impl TokenValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        Self { key, validation }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ValidationError("The token has expired".into()),
            ErrorKind::InvalidSignature => AuthError::ValidationError("Signature verification failed".into()),
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::PoorlyFormattedToken(e.to_string())
            },
            _ => AuthError::ValidationError(e.to_string()),
        })?;
        Ok(data.claims)
    }

    /// Extracts the bearer token from the request headers and validates it.
    pub fn claims_from_request(&self, req: &HttpRequest) -> Result<JwtClaims, AuthError> {
        let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
        let header = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let token = bearer_token(header)?;
        self.validate(token)
    }
}

/// Splits the token out of an `Authorization` header value. The scheme is case-insensitive.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    match header.trim().split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::PoorlyFormattedToken("Expected 'Bearer <token>'".into())),
    }
}

/// Resolves the caller's claims, reusing those left behind by the ACL middleware when there are any.
pub fn authenticate(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    if let Some(claims) = req.extensions().get::<JwtClaims>() {
        return Ok(claims.clone());
    }
    let validator = req.app_data::<web::Data<TokenValidator>>().ok_or_else(|| {
        error!("🔐️ No token validator has been registered with the app");
        ServerError::ConfigurationError("Authentication is not configured".into())
    })?;
    let claims = validator.claims_from_request(req).map_err(|e| {
        debug!("🔐️ Rejected access token. {e}");
        ServerError::AuthenticationError(e)
    })?;
    trace!("🔐️ Authenticated {}", claims.sub);
    req.extensions_mut().insert(claims.clone());
    Ok(claims)
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
