use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo_types;
pub mod services;

pub use extractors::AuthUser;
pub use jwt::{Identity, JwtKeys, TokenError};

/// Login and registration; open to anonymous callers.
pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Profile management; must be mounted behind the auth gate.
pub fn protected_router() -> Router<AppState> {
    handlers::profile_routes()
}
