use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use api_types::{User, WorkspaceRole};

use crate::{
    AppState,
    config::ConfigError,
    db::{users::UserRepository, workspaces::MembershipRepository},
    routes::error::ApiError,
};

/// Tokens outlive a working session but not a forgotten laptop.
const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id the external identity provider vouched for.
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Verifies (and, for operational tooling and tests, issues) the bearer
/// tokens minted by the external identity system. The server never stores
/// credentials; possession of a validly signed token is the whole story.
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(secret: &SecretString) -> Result<Self, ConfigError> {
        let key = BASE64_STANDARD
            .decode(secret.expose_secret().as_bytes())
            .map_err(|_| ConfigError::InvalidVar("KANBAN_JWT_SECRET"))?;

        Ok(Self {
            encoding: EncodingKey::from_secret(&key),
            decoding: DecodingKey::from_secret(&key),
            validation: Validation::new(Algorithm::HS256),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.issue_expiring(user_id, Utc::now() + Duration::days(TOKEN_TTL_DAYS))
    }

    fn issue_expiring(
        &self,
        user_id: Uuid,
        expires_at: chrono::DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)?;
        Ok(token)
    }
}

/// Authenticated subject of the current request, injected by
/// [`require_auth`] and read by handlers via `Extension`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
}

/// Resolves a bearer token to a live user row. Rejects tokens whose user
/// has since been deleted.
pub async fn authenticate_token(state: &AppState, token: &str) -> Result<User, ApiError> {
    let claims = state
        .jwt()
        .verify(token)
        .map_err(|_| ApiError::Unauthenticated)?;
    UserRepository::find_by_id(state.pool(), claims.sub)
        .await?
        .ok_or(ApiError::Unauthenticated)
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or(ApiError::Unauthenticated)?;
    let user = authenticate_token(&state, &token).await?;
    request.extensions_mut().insert(RequestContext { user });
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<String> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

/// Membership guard: any role suffices (reads). `denied` is returned for
/// non-members so each call site keeps its own wording.
pub async fn ensure_member(
    pool: &PgPool,
    user_id: Uuid,
    workspace_id: Uuid,
    denied: &'static str,
) -> Result<WorkspaceRole, ApiError> {
    MembershipRepository::role_of(pool, user_id, workspace_id)
        .await?
        .ok_or(ApiError::Forbidden(denied))
}

/// Mutation guard: members and above. Non-members and VIEWERs get the same
/// `denied` message, matching how clients present it.
pub async fn ensure_can_edit(
    pool: &PgPool,
    user_id: Uuid,
    workspace_id: Uuid,
    denied: &'static str,
) -> Result<WorkspaceRole, ApiError> {
    match MembershipRepository::role_of(pool, user_id, workspace_id).await? {
        Some(role) if role.can_edit() => Ok(role),
        _ => Err(ApiError::Forbidden(denied)),
    }
}

/// Administration guard: OWNER and ADMIN only.
pub async fn ensure_can_manage(
    pool: &PgPool,
    user_id: Uuid,
    workspace_id: Uuid,
    denied: &'static str,
) -> Result<WorkspaceRole, ApiError> {
    match MembershipRepository::role_of(pool, user_id, workspace_id).await? {
        Some(role) if role.can_manage() => Ok(role),
        _ => Err(ApiError::Forbidden(denied)),
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};

    use super::*;

    fn service() -> JwtService {
        let secret = SecretString::new(BASE64_STANDARD.encode([11u8; 32]).into());
        JwtService::new(&secret).unwrap()
    }

    #[test]
    fn issued_tokens_round_trip() {
        let jwt = service();
        let user_id = Uuid::new_v4();
        let token = jwt.issue(user_id).unwrap();
        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let jwt = service();
        let token = jwt
            .issue_expiring(Uuid::new_v4(), Utc::now() - Duration::hours(2))
            .unwrap();
        assert!(jwt.verify(&token).is_err());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let other = SecretString::new(BASE64_STANDARD.encode([99u8; 32]).into());
        let foreign = JwtService::new(&other).unwrap();
        let token = foreign.issue(Uuid::new_v4()).unwrap();
        assert!(service().verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(service().verify("not-a-token").is_err());
    }
}
