use subtle::ConstantTimeEq;

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin1234";

/// Decides whether a login attempt unlocks the admin area. The view
/// controller only sees this trait, so a real identity provider can replace
/// the placeholder without touching session logic.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, password: &str) -> bool;
}

/// Single shared secret compared in-process. Not authentication: no hashing,
/// no session token, no expiry.
#[derive(Debug, Clone)]
pub struct SharedSecretVerifier {
    secret: String,
}

impl SharedSecretVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

impl Default for SharedSecretVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_PASSWORD)
    }
}

impl CredentialVerifier for SharedSecretVerifier {
    fn verify(&self, password: &str) -> bool {
        if self.secret.is_empty() {
            return false;
        }
        self.secret.as_bytes().ct_eq(password.as_bytes()).into()
    }
}
