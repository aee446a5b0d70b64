//! Password hashing for the login exchange.
//!
//! The upstream login endpoint expects the account password pre-hashed with
//! SHA-512 and hex-encoded; the plaintext never goes on the wire.

use sha2::{Digest, Sha512};

/// Compute the hex-encoded SHA-512 digest of a password.
#[must_use]
pub fn sha512_hex(password: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            sha512_hex("password"),
            "b109f3bbbc244eb82441917ed06d618b9008dd09b3befd1b5e07394c706a8bb9\
             80b1d7785e5976ec049b46df5f1326af5a2ea6d103fd07c95385ffab0cacbc86"
        );
    }

    #[test]
    fn digest_length() {
        // SHA-512 = 64 bytes = 128 hex chars.
        assert_eq!(sha512_hex("x").len(), 128);
    }

    #[test]
    fn different_passwords_differ() {
        assert_ne!(sha512_hex("a"), sha512_hex("b"));
    }
}
