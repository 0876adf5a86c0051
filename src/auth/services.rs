use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use super::dto::{ProfileRequest, RegisterRequest};
use super::password::{check_password_blocking, hash_password_blocking, PasswordMatch};
use super::repo_types::User;
use crate::error::AppError;
use crate::store::{CrmStore, StoreError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Internal reason a login was refused. Never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("user not found")]
    UserNotFound,
    #[error("invalid password")]
    InvalidPassword,
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Other(#[from] AppError),
}

impl From<LoginError> for AppError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::Credentials(_) => AppError::InvalidCredentials,
            LoginError::Other(e) => e,
        }
    }
}

impl From<StoreError> for LoginError {
    fn from(e: StoreError) -> Self {
        LoginError::Other(e.into())
    }
}

/// Looks the user up and checks the password, including the legacy
/// plaintext fallback.
pub async fn authenticate(
    store: &dyn CrmStore,
    email: &str,
    password: &str,
) -> Result<User, LoginError> {
    let email = normalize_email(email);
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(CredentialError::UserNotFound)?;

    let matched = check_password_blocking(password.to_string(), user.password_hash.clone())
        .await
        .map_err(AppError::from)?;

    match matched {
        PasswordMatch::Hash => Ok(user),
        PasswordMatch::LegacyPlaintext => {
            warn!(user_id = user.id, "login accepted via legacy plaintext password");
            Ok(user)
        }
        PasswordMatch::Mismatch => Err(CredentialError::InvalidPassword.into()),
    }
}

fn required(field: Option<String>) -> Result<String, AppError> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingFields)
}

/// Validates, hashes and persists a new user.
pub async fn register(store: &dyn CrmStore, req: RegisterRequest) -> Result<User, AppError> {
    let name = required(req.name)?;
    let email = normalize_email(&required(req.email)?);
    // Passwords are taken as typed; only an all-blank one counts as missing.
    let password = req
        .password
        .filter(|p| !p.trim().is_empty())
        .ok_or(AppError::MissingFields)?;

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    if store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let hash = hash_password_blocking(password).await?;

    let user = store
        .create_user(&name, &email, &hash)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::DuplicateEmail,
            other => other.into(),
        })?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Applies a name/email change to the caller's own record.
pub async fn update_profile(
    store: &dyn CrmStore,
    user_id: i32,
    req: ProfileRequest,
) -> Result<User, AppError> {
    // A token can outlive its user; report that before any email conflict.
    if store.find_user_by_id(user_id).await?.is_none() {
        warn!(user_id, "profile update for a missing user");
        return Err(AppError::NotFound("User"));
    }

    let name = match req.name {
        Some(n) if n.trim().is_empty() => {
            return Err(AppError::Validation("name must not be blank".into()))
        }
        Some(n) => Some(n.trim().to_string()),
        None => None,
    };
    let email = match req.email {
        Some(e) => {
            let e = normalize_email(&e);
            if !is_valid_email(&e) {
                return Err(AppError::Validation("Invalid email".into()));
            }
            Some(e)
        }
        None => None,
    };

    let user = store
        .update_user_profile(user_id, name.as_deref(), email.as_deref())
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::DuplicateEmail,
            other => other.into(),
        })?
        .ok_or(AppError::NotFound("User"))?;

    info!(user_id = user.id, "profile updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::store::MemoryStore;

    fn req(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("user@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user example.com"));
        assert_eq!(normalize_email("  Ann@Example.COM "), "ann@example.com");
    }

    #[tokio::test]
    async fn register_rejects_missing_fields() {
        let store = MemoryStore::new();
        let mut r = req("Ann", "ann@example.com", "pw-123456");
        r.name = None;
        assert!(matches!(register(&store, r).await, Err(AppError::MissingFields)));

        let r = req("Ann", "   ", "pw-123456");
        assert!(matches!(register(&store, r).await, Err(AppError::MissingFields)));

        let r = req("Ann", "ann@example.com", "");
        assert!(matches!(register(&store, r).await, Err(AppError::MissingFields)));
    }

    #[tokio::test]
    async fn register_hashes_and_second_attempt_is_a_duplicate() {
        let store = MemoryStore::new();
        let first = register(&store, req("Ann", "Ann@Example.com", "first-pass"))
            .await
            .unwrap();
        assert_eq!(first.email, "ann@example.com");
        assert!(verify_password("first-pass", &first.password_hash).unwrap());

        let second = register(&store, req("Other", "ann@example.com", "second-pass")).await;
        assert!(matches!(second, Err(AppError::DuplicateEmail)));

        let stored = store.find_user_by_email("ann@example.com").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, first.password_hash);
    }

    #[tokio::test]
    async fn authenticate_distinguishes_failures_internally_only() {
        let store = MemoryStore::new();
        register(&store, req("Ann", "ann@example.com", "right-pass"))
            .await
            .unwrap();

        let unknown = authenticate(&store, "bob@example.com", "x").await.unwrap_err();
        assert!(matches!(
            unknown,
            LoginError::Credentials(CredentialError::UserNotFound)
        ));
        let wrong = authenticate(&store, "ann@example.com", "wrong").await.unwrap_err();
        assert!(matches!(
            wrong,
            LoginError::Credentials(CredentialError::InvalidPassword)
        ));

        let a: AppError = unknown.into();
        let b: AppError = wrong.into();
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.status(), b.status());
    }

    #[tokio::test]
    async fn authenticate_accepts_seeded_plaintext_rows() {
        let store = MemoryStore::new();
        store
            .create_user("John Doe", "user@example.com", "password123")
            .await
            .unwrap();
        let user = authenticate(&store, "user@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(user.name, "John Doe");
    }

    #[tokio::test]
    async fn profile_update_validates_and_reports_missing_user() {
        let store = MemoryStore::new();
        let ann = register(&store, req("Ann", "ann@example.com", "pw-123456"))
            .await
            .unwrap();

        let bad = ProfileRequest {
            name: Some("  ".into()),
            email: None,
        };
        assert!(matches!(
            update_profile(&store, ann.id, bad).await,
            Err(AppError::Validation(_))
        ));

        let ok = ProfileRequest {
            name: Some("Ann Smith".into()),
            email: Some("ANN.SMITH@example.com".into()),
        };
        let updated = update_profile(&store, ann.id, ok).await.unwrap();
        assert_eq!(updated.name, "Ann Smith");
        assert_eq!(updated.email, "ann.smith@example.com");

        let ghost = update_profile(&store, 999, ProfileRequest::default()).await;
        assert!(matches!(ghost, Err(AppError::NotFound("User"))));
    }

    #[tokio::test]
    async fn missing_user_wins_over_an_email_conflict() {
        let store = MemoryStore::new();
        register(&store, req("Ann", "ann@example.com", "pw-123456"))
            .await
            .unwrap();

        let taken = ProfileRequest {
            name: None,
            email: Some("ann@example.com".into()),
        };
        let res = update_profile(&store, 42, taken).await;
        assert!(matches!(res, Err(AppError::NotFound("User"))));
    }
}
