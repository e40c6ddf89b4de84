use sha2::{Digest, Sha256};

pub const DEFAULT_ADMIN_SECRET: &str = "123";

/// Gate for administrative actions such as adding a teacher.
pub trait CredentialVerifier {
    fn verify(&self, secret: &str) -> bool;
}

/// Single shared admin secret. Only its SHA-256 digest is kept in memory.
pub struct AdminSecret {
    digest: Vec<u8>,
}

impl AdminSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).to_vec(),
        }
    }
}

impl Default for AdminSecret {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_SECRET)
    }
}

impl CredentialVerifier for AdminSecret {
    fn verify(&self, secret: &str) -> bool {
        let candidate = Sha256::digest(secret.as_bytes());
        // Compare every byte so timing does not depend on the mismatch position.
        candidate
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_secret_verifies() {
        let v = AdminSecret::default();
        assert!(v.verify("123"));
        assert!(!v.verify("1234"));
        assert!(!v.verify(""));
    }

    #[test]
    fn configured_secret_replaces_default() {
        let v = AdminSecret::new("s3cret");
        assert!(v.verify("s3cret"));
        assert!(!v.verify(DEFAULT_ADMIN_SECRET));
    }
}
