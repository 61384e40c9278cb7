use crate::shared::error::ApiError;
use crate::shared::models::{NewUser, UserRole, UserStatus};
use crate::shared::schema::users;
use crate::shared::state::AppState;
use crate::shared::utils::db_conn;
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: UserResponse,
}

pub fn validate_signup(req: &SignupRequest) -> Result<(), ApiError> {
    let mut details = Vec::new();
    if !req.email.contains('@') || !req.email.contains('.') || req.email.len() > 255 {
        details.push("email: must be a valid email address".to_string());
    }
    let username_ok = (3..=30).contains(&req.username.len())
        && req
            .username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !username_ok {
        details.push("username: 3-30 lowercase letters, digits or underscores".to_string());
    }
    if req.name.is_empty() || req.name.len() > 100 {
        details.push("name: required, at most 100 characters".to_string());
    }
    if req.password.len() < 8 || req.password.len() > 128 {
        details.push("password: must be 8-128 characters".to_string());
    }
    if details.is_empty() {
        Ok(())
    } else {
        Err(ApiError::InvalidInput {
            message: "Invalid input".to_string(),
            details,
        })
    }
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    validate_signup(&req)?;

    let mut conn = db_conn(&state.conn)?;

    let email_taken: bool = diesel::select(diesel::dsl::exists(
        users::table.filter(users::email.eq(&req.email)),
    ))
    .get_result(&mut conn)?;
    if email_taken {
        return Err(ApiError::invalid("Email already registered"));
    }

    let username_taken: bool = diesel::select(diesel::dsl::exists(
        users::table.filter(users::username.eq(&req.username)),
    ))
    .get_result(&mut conn)?;
    if username_taken {
        return Err(ApiError::invalid("Username already taken"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Failed(anyhow::anyhow!("password hashing: {e}")))?
        .to_string();

    let new_user = NewUser {
        email: &req.email,
        username: &req.username,
        name: &req.name,
        password_hash: Some(&password_hash),
        role: UserRole::User.as_str(),
        status: UserStatus::PendingVerification.as_str(),
    };

    let (id, created_at): (Uuid, DateTime<Utc>) = diesel::insert_into(users::table)
        .values(&new_user)
        .returning((users::id, users::created_at))
        .get_result(&mut conn)?;

    info!("user signed up: {} ({})", req.username, id);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Account created successfully. Please check your email to verify your account."
                .to_string(),
            user: UserResponse {
                id,
                email: req.email,
                username: req.username,
                name: req.name,
                created_at,
            },
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> SignupRequest {
        SignupRequest {
            email: "ada@example.com".to_string(),
            username: "ada_l".to_string(),
            name: "Ada".to_string(),
            password: "correct-horse".to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_signup() {
        assert!(validate_signup(&req()).is_ok());
    }

    #[test]
    fn rejects_bad_username_and_short_password() {
        let mut r = req();
        r.username = "Ada Lovelace".to_string();
        r.password = "short".to_string();
        match validate_signup(&r) {
            Err(ApiError::InvalidInput { details, .. }) => {
                assert_eq!(details.len(), 2);
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_email() {
        let mut r = req();
        r.email = "not-an-email".to_string();
        assert!(validate_signup(&r).is_err());
    }
}
