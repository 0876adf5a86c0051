use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, ProfileRequest, ProfileResponse, RegisterRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::User,
        services::{self, LoginError},
    },
    error::AppError,
    models::{PublicUser, ROLE_ADMIN, ROLE_NEW_USER},
    state::AppState,
};

/// Routes reachable without a token.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes that sit behind the auth gate.
pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", put(update_profile))
}

fn public_user(user: User, role: &str) -> PublicUser {
    PublicUser {
        name: user.name,
        email: user.email,
        role: role.to_string(),
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    let user = services::register(state.store.as_ref(), payload).await?;

    let token = JwtKeys::from_ref(&state).issue(user.id, &user.email)?;

    Ok(Json(AuthResponse {
        token,
        user: public_user(user, ROLE_NEW_USER),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;

    let user = match services::authenticate(state.store.as_ref(), &payload.email, &payload.password)
        .await
    {
        Ok(u) => u,
        Err(LoginError::Credentials(reason)) => {
            warn!(email = %payload.email, %reason, "login refused");
            return Err(AppError::InvalidCredentials);
        }
        Err(other) => return Err(other.into()),
    };

    let token = JwtKeys::from_ref(&state).issue(user.id, &user.email)?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: public_user(user, ROLE_ADMIN),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<ProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(payload) = payload?;
    let user = services::update_profile(state.store.as_ref(), caller.id, payload).await?;
    Ok(Json(ProfileResponse {
        user: public_user(user, ROLE_ADMIN),
    }))
}
