use axum::{
    async_trait,
    body::Body,
    extract::{FromRequest, FromRequestParts, Multipart, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::GrcError;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::core::users::find_active_user;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// ============================================================================
// User Context (Authentication)
// ============================================================================

/// Caller identity resolved from the bearer token, or anonymous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn new(user_id: i32) -> Self {
        Self {
            user_id,
            email: None,
            roles: Vec::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user_id: 0,
            email: None,
            roles: vec!["anonymous".to_string()],
        }
    }

    pub fn with_email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Standard roles
pub struct Roles;

impl Roles {
    pub const ADMIN: &'static str = "admin";
}

// ============================================================================
// Tokens
// ============================================================================

pub fn issue_token(user_id: i32, secret: &str, ttl_seconds: i64) -> Result<String, GrcError> {
    let now = Utc::now().timestamp();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_seconds,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| GrcError::Internal(format!("token encoding failed: {e}")))
}

fn validate_jwt(token: &str, secret: &str) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_nbf = false;
    validation.set_required_spec_claims(&["sub", "exp"]);

    let key = DecodingKey::from_secret(secret.as_bytes());
    match decode::<TokenClaims>(token, &key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(AuthError::TokenExpired),
            _ => Err(AuthError::InvalidToken(e.to_string())),
        },
    }
}

#[derive(Debug)]
enum AuthError {
    MissingToken,
    InvalidFormat,
    InvalidToken(String),
    TokenExpired,
    UnknownUser,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingToken => write!(f, "Missing authorization token"),
            Self::InvalidFormat => write!(f, "Invalid authorization format"),
            Self::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
            Self::TokenExpired => write!(f, "Token expired"),
            Self::UnknownUser => write!(f, "Unknown or inactive user"),
        }
    }
}

fn bearer_token(request: &Request<Body>) -> Result<&str, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)
}

async fn resolve_user(token: &str, state: &AppState) -> Result<AuthenticatedUser, AuthError> {
    let claims = validate_jwt(token, state.jwt_secret())?;

    let user_id: i32 = claims
        .sub
        .parse()
        .map_err(|_| AuthError::InvalidToken("Invalid user ID".to_string()))?;

    let user = with_conn(&state.conn, move |conn| find_active_user(conn, user_id))
        .await
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    let roles = user.role_list();
    Ok(AuthenticatedUser::new(user.id)
        .with_email(user.email)
        .with_roles(roles))
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolve the caller and store an `AuthenticatedUser` in the request
/// extensions. Failures degrade to anonymous; the route extractors decide
/// whether that is acceptable.
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // The body is not Sync, so the token is copied out before awaiting.
    let token = bearer_token(&request).map(str::to_owned);
    let resolved = match token {
        Ok(token) => resolve_user(&token, &state).await,
        Err(e) => Err(e),
    };

    let user = match resolved {
        Ok(user) => user,
        Err(AuthError::MissingToken) => AuthenticatedUser::anonymous(),
        Err(e) => {
            debug!("Authentication failed: {e}");
            AuthenticatedUser::anonymous()
        }
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Propagate an incoming `X-Request-Id` or assign a fresh one, and echo it
/// on the response.
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);
    let request_id = request
        .headers()
        .get(&header_name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(header_name.clone(), value);
    }

    let mut response = next.run(request).await;
    match HeaderValue::from_str(&request_id) {
        Ok(value) => {
            response.headers_mut().insert(header_name, value);
        }
        Err(e) => warn!("Dropping unrepresentable request id: {e}"),
    }
    response
}

// ============================================================================
// Axum Extractors
// ============================================================================

fn current_user(parts: &Parts) -> AuthenticatedUser {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .cloned()
        .unwrap_or_else(AuthenticatedUser::anonymous)
}

/// Any active, authenticated user.
#[derive(Debug, Clone)]
pub struct RequireLogin(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireLogin
where
    S: Send + Sync,
{
    type Rejection = GrcError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts);
        if !user.is_authenticated() {
            return Err(GrcError::Unauthorized("Authentication required".to_string()));
        }
        Ok(Self(user))
    }
}

/// An authenticated user holding the `admin` role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = GrcError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireLogin(user) = RequireLogin::from_request_parts(parts, state).await?;
        if !user.has_role(Roles::ADMIN) {
            return Err(GrcError::Forbidden(format!("Required role: {}", Roles::ADMIN)));
        }
        Ok(Self(user))
    }
}

// The wrappers below exist so that axum's own rejections render as
// `{"message": ...}` like every other error.

/// JSON body extractor.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(GrcError))]
pub struct ApiJson<T>(pub T);

/// Path parameters extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(GrcError))]
pub struct ApiPath<T>(pub T);

/// Query string extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(GrcError))]
pub struct ApiQuery<T>(pub T);

/// `multipart/form-data` body extractor.
pub struct ApiMultipart(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = GrcError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Multipart::from_request(req, state).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_token_roundtrip() {
        let token = issue_token(42, SECRET, 60).unwrap();
        let claims = validate_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_wrong_secret() {
        let token = issue_token(42, SECRET, 60).unwrap();
        assert!(matches!(
            validate_jwt(&token, "other-secret"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let token = issue_token(42, SECRET, -3600).unwrap();
        assert!(matches!(
            validate_jwt(&token, SECRET),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_role_checks() {
        let admin = AuthenticatedUser::new(1).with_roles(vec!["admin".into()]);
        assert!(admin.is_authenticated());
        assert!(admin.has_role(Roles::ADMIN));

        let anon = AuthenticatedUser::anonymous();
        assert!(!anon.is_authenticated());
        assert!(!anon.has_role(Roles::ADMIN));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let request = Request::builder()
            .header(AUTHORIZATION, "Token abc")
            .body(Body::empty())
            .unwrap();
        assert!(matches!(bearer_token(&request), Err(AuthError::InvalidFormat)));

        let request = Request::builder()
            .header(AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request).unwrap(), "abc");
    }
}
