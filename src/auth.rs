// src/auth.rs
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountId};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: usize,
}

impl Claims {
    pub fn account_id(&self) -> LedgerResult<AccountId> {
        self.sub.parse().map_err(|_| LedgerError::Unauthorized)
    }
}

/// Lowercase hex SHA-512 digest of the password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha512::digest(password.as_bytes()))
}

// Function to create a JWT token
pub fn create_token(account: &Account, secret: &str, ttl_secs: i64) -> LedgerResult<String> {
    let claims = Claims {
        sub: account.id.to_string(),
        name: account.name.clone(),
        exp: (Utc::now().timestamp() + ttl_secs).max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| LedgerError::Storage(format!("token encoding failed: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> LedgerResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| LedgerError::Unauthorized)
}
