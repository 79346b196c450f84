//! Password digests and opaque bearer tokens.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 48;

/// Sessions expire thirty minutes after login.
pub const TOKEN_TTL_SECS: i64 = 30 * 60;

pub const MIN_PASSWORD_LEN: usize = 6;

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn random_string(len: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Returns `salt$digest` with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = random_string(SALT_LEN);
    let digest = digest(&salt, password);
    format!("{salt}${digest}")
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    digest(salt, password) == expected
}

/// Mints an opaque bearer token. Tokens carry no claims; the server keeps a
/// session table keyed by token.
pub fn mint_token() -> String {
    random_string(TOKEN_LEN)
}

#[cfg(test)]
mod tests {
    use super::{hash_password, mint_token, verify_password};

    #[test]
    fn test_that_correct_password_verifies() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored));
    }

    #[test]
    fn test_that_wrong_password_fails() {
        let stored = hash_password("hunter22");
        assert!(!verify_password("hunter23", &stored));
    }

    #[test]
    fn test_that_hashes_are_salted() {
        assert_ne!(hash_password("hunter22"), hash_password("hunter22"));
    }

    #[test]
    fn test_that_malformed_stored_value_fails_closed() {
        assert!(!verify_password("hunter22", "not-a-valid-digest"));
    }

    #[test]
    fn test_that_tokens_are_opaque_and_distinct() {
        let first = mint_token();
        let second = mint_token();
        assert_eq!(first.len(), 48);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }
}
