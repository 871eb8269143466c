use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Decodes an access token. Refresh tokens are rejected here; they are only
/// good at the identity service.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("not an access token".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
pub fn generate_access_token(
    user_id: u64,
    role: u8,
    staff_id: Option<u64>,
    secret: &str,
    token_type: TokenType,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        user_id,
        sub: format!("user-{user_id}"),
        role,
        exp: now + 900,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type,
        staff_id,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_access_tokens_only() {
        let access = generate_access_token(1, 3, Some(7), "s3cret", TokenType::Access);
        let claims = verify_token(&access, "s3cret").unwrap();
        assert_eq!(claims.staff_id, Some(7));

        let refresh = generate_access_token(1, 3, Some(7), "s3cret", TokenType::Refresh);
        assert!(verify_token(&refresh, "s3cret").is_err());
        assert!(verify_token(&access, "other").is_err());
    }
}
