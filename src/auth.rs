//! Admin password hashes.
//!
//! Stored as `pbkdf2-sha512:<iterations>:<base64 salt>:<base64 hash>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use sha2::Sha512;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2-sha512";
pub const DEFAULT_ITERATIONS: u32 = 1_000_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 64;

/// Hash with a fresh random salt and the default iteration count.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    hash_password_with(password, &salt, DEFAULT_ITERATIONS)
}

pub fn hash_password_with(password: &str, salt: &[u8], iterations: u32) -> String {
    let mut hash = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, iterations, &mut hash);
    format!(
        "{}:{}:{}:{}",
        SCHEME,
        iterations,
        STANDARD.encode(salt),
        STANDARD.encode(hash)
    )
}

/// Check a password against a stored hash. Malformed or unknown hashes never match.
pub fn check_password(stored: &str, password: &str) -> bool {
    let parts: Vec<&str> = stored.split(':').collect();
    let [scheme, iterations, salt, hash] = parts[..] else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }

    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (STANDARD.decode(salt), STANDARD.decode(hash)) else {
        return false;
    };
    if expected.is_empty() {
        return false;
    }

    let mut calculated = vec![0u8; expected.len()];
    pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), &salt, iterations, &mut calculated);
    calculated.ct_eq(&expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &[u8] = b"0123456789abcdef";

    #[test]
    fn test_hash_format() {
        let h = hash_password_with("hunter2", SALT, 1000);
        let parts: Vec<&str> = h.split(':').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2-sha512");
        assert_eq!(parts[1], "1000");
        assert_eq!(STANDARD.decode(parts[2]).unwrap(), SALT);
        assert_eq!(STANDARD.decode(parts[3]).unwrap().len(), 64);
    }

    #[test]
    fn test_check_roundtrip() {
        let h = hash_password_with("hunter2", SALT, 1000);
        assert!(check_password(&h, "hunter2"));
        assert!(!check_password(&h, "hunter3"));
        assert!(!check_password(&h, ""));
    }

    #[test]
    fn test_salt_changes_hash() {
        assert_ne!(
            hash_password_with("pw", b"salt-one", 10),
            hash_password_with("pw", b"salt-two", 10)
        );
    }

    #[test]
    fn test_malformed_hashes_rejected() {
        for bad in [
            "",
            "plain",
            "bcrypt:10:c2FsdA==:aGFzaA==",
            "pbkdf2-sha512:abc:c2FsdA==:aGFzaA==",
            "pbkdf2-sha512:0:c2FsdA==:aGFzaA==",
            "pbkdf2-sha512:10:!!!:aGFzaA==",
            "pbkdf2-sha512:10:c2FsdA==:",
            "pbkdf2-sha512:10:c2FsdA==:aGFzaA==:extra",
        ] {
            assert!(!check_password(bad, "pw"), "{:?} should not match", bad);
        }
    }
}
