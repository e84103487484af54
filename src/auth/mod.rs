use anyhow::{Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};

/// Hashes and verifies account PINs.
///
/// Hashes are salted Argon2id PHC strings: hashing the same PIN twice yields
/// different strings, and either string verifies against the original PIN.
/// Verification compares in constant time.
pub struct PinHasher {
    argon2: Argon2<'static>,
}

impl PinHasher {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Hash a PIN with a fresh random salt.
    ///
    /// A failure here (e.g. the entropy source is unavailable) aborts the
    /// calling operation; there is no plaintext fallback.
    pub fn hash(&self, pin: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(pin.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash PIN: {e}"))?;
        Ok(hash.to_string())
    }

    /// Check a PIN against a stored hash.
    ///
    /// A stored hash that does not parse as a PHC string verifies as false
    /// rather than erroring.
    pub fn verify(&self, pin: &str, pin_hash: &str) -> bool {
        match PasswordHash::new(pin_hash) {
            Ok(parsed) => self.argon2.verify_password(pin.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

impl Default for PinHasher {
    fn default() -> Self {
        Self::new()
    }
}
