use bcrypt::{hash, verify, BcryptResult};
use log::debug;

/// Salted one-way password hashing with a configurable bcrypt cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        PasswordHasher { cost }
    }

    pub fn hash(&self, password: &str) -> BcryptResult<String> {
        debug!("Hashing password with cost {}", self.cost);
        hash(password.as_bytes(), self.cost)
    }

    pub fn verify(&self, password: &str, stored_hash: &str) -> BcryptResult<bool> {
        verify(password.as_bytes(), stored_hash)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        PasswordHasher::new(bcrypt::DEFAULT_COST)
    }
}
