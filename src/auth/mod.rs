use crate::shared::error::ApiError;
use crate::shared::models::{UserRole, UserStatus};
use crate::shared::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::post;
use axum::{async_trait, Router};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub mod users;

/// Resolved session identity. Handlers only ever see this; token parsing is
/// the verifier's job.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: UserRole,
    pub status: UserStatus,
}

pub trait SessionVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<AuthContext>;
}

/// Production verifier for the HS256 session tokens minted by the auth
/// frontend.
pub struct JwtSessions {
    secret: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
    role: String,
    status: String,
    #[allow(dead_code)]
    exp: usize,
}

impl JwtSessions {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

impl SessionVerifier for JwtSessions {
    fn verify(&self, token: &str) -> Option<AuthContext> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .ok()?;
        Some(AuthContext {
            user_id: data.claims.sub,
            role: UserRole::from_str_name(&data.claims.role)?,
            status: UserStatus::from_str_name(&data.claims.status)?,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn resolve_session(parts: &Parts, state: &Arc<AppState>) -> Option<AuthContext> {
    let token = bearer_token(parts)?;
    state.sessions.verify(token)
}

/// Extractor for endpoints that require a session; 401 when missing or
/// invalid, 403 for suspended/banned accounts.
pub struct AuthSession(pub AuthContext);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ctx = resolve_session(parts, state).ok_or(ApiError::Unauthorized)?;
        if matches!(ctx.status, UserStatus::Suspended | UserStatus::Banned) {
            return Err(ApiError::Forbidden);
        }
        Ok(AuthSession(ctx))
    }
}

/// Extractor for public reads that personalize when a session happens to be
/// present.
pub struct MaybeAuthSession(pub Option<AuthContext>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeAuthSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthSession(resolve_session(parts, state)))
    }
}

/// Access gate for mutations: the resource owner or an administrator.
pub fn authorize(ctx: &AuthContext, resource_owner: Uuid) -> Result<(), ApiError> {
    if ctx.user_id == resource_owner || ctx.role == UserRole::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/signup", post(users::signup))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
            status: UserStatus::Active,
        }
    }

    #[test]
    fn owner_passes_gate() {
        let c = ctx(UserRole::User);
        assert!(authorize(&c, c.user_id).is_ok());
    }

    #[test]
    fn admin_overrides_ownership() {
        let c = ctx(UserRole::Admin);
        assert!(authorize(&c, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn moderator_is_not_an_owner_override() {
        let c = ctx(UserRole::Moderator);
        assert!(matches!(
            authorize(&c, Uuid::new_v4()),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn jwt_round_trip() {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde_json::json;

        let user_id = Uuid::new_v4();
        let claims = json!({
            "sub": user_id,
            "role": "USER",
            "status": "ACTIVE",
            "exp": (chrono::Utc::now().timestamp() + 3600) as usize,
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let sessions = JwtSessions::new("test-secret".to_string());
        let ctx = sessions.verify(&token).expect("valid token");
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.role, UserRole::User);

        let other = JwtSessions::new("wrong-secret".to_string());
        assert!(other.verify(&token).is_none());
    }
}
