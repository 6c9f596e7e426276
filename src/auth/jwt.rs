use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};

use crate::models::SessionClaims;

pub fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

pub fn generate_session_token(
    user_id: i64,
    username: String,
    session_id: String,
    secret: &str,
    ttl: usize,
) -> Result<(String, SessionClaims), Error> {
    let claims = SessionClaims {
        sub: username,
        uid: user_id,
        sid: session_id,
        exp: now() + ttl,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn verify_session_token(token: &str, secret: &str) -> Result<SessionClaims, Error> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}
