pub mod activity;
pub mod admin_key;
pub mod invite;
pub mod user;

use sea_orm::{DbErr, SqlErr};

/// Generate an unguessable opaque token (64-char hex string). Used for admin
/// keys, invite codes and OAuth state nonces.
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Callers treat a uniqueness violation as "already exists", never as a
/// fatal error.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::generate_token;

    #[test]
    fn test_generated_tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
