use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's `uid`.
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Encode an HS256 token for `uid`.
///
/// Returns (token_string, expires_at_rfc3339).
pub fn encode_jwt(
    secret: &str,
    uid: &str,
    role: &str,
    session_hours: u32,
) -> Result<(String, String)> {
    let now = Utc::now();
    let exp = now + Duration::hours(i64::from(session_hours));

    let claims = Claims {
        sub: uid.to_string(),
        role: role.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow!("encode_jwt: {}", e))?;

    Ok((token, exp.to_rfc3339()))
}

/// Decode and validate a token (signature and `exp`).
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("decode_jwt: {}", e))?;

    Ok(data.claims)
}
