use anyhow::{Result, anyhow};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub uid: i32,    // User ID
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: usize, // Expiration timestamp
}

/// Sign a new JWT token for a user.
pub fn sign(
    user_id: i32,
    username: &str,
    role: &str,
    permissions: Vec<String>,
    secret: &str,
    ttl_hours: i64,
) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(
            TimeDelta::try_hours(ttl_hours).ok_or_else(|| anyhow!("token ttl out of range"))?,
        )
        .ok_or_else(|| anyhow!("token expiration out of range"))?
        .timestamp();

    let claims = Claims {
        sub: username.to_owned(),
        uid: user_id,
        role: role.to_owned(),
        permissions,
        exp: usize::try_from(expiration)?,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
