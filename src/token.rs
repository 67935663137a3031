use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::Claims;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

struct TokenClass {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

/// Issues and verifies the two token classes. Pure over the configured
/// secret + lifetime pairs; persistence of refresh tokens lives in `db`.
pub struct TokenService {
    access: TokenClass,
    refresh: TokenClass,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        TokenService {
            access: TokenClass {
                encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
                decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
                ttl: Duration::seconds(config.access_token_ttl_secs),
            },
            refresh: TokenClass {
                encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
                decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
                ttl: Duration::seconds(config.refresh_token_ttl_secs),
            },
        }
    }

    pub fn issue_access(&self, user_id: Uuid) -> Result<String> {
        issue(&self.access, user_id, ACCESS)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String> {
        issue(&self.refresh, user_id, REFRESH)
    }

    pub fn verify_access(&self, token: &str) -> Result<Uuid> {
        verify(&self.access, token, ACCESS)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Uuid> {
        verify(&self.refresh, token, REFRESH)
    }
}

fn issue(class: &TokenClass, user_id: Uuid, token_type: &str) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + class.ttl).timestamp(),
        token_type: token_type.to_string(),
    };
    let token = encode(&Header::default(), &claims, &class.encoding).map_err(|e| {
        tracing::error!("token signing failed: {}", e);
        ApiError::Internal
    })?;
    Ok(token)
}

fn verify(class: &TokenClass, token: &str, expected_type: &str) -> Result<Uuid> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    let data = decode::<Claims>(token, &class.decoding, &validation)?;
    if data.claims.token_type != expected_type {
        return Err(ApiError::InvalidToken);
    }
    Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        let config: Config = envy::from_iter([
            (
                "DATABASE_URL".to_string(),
                "postgres://localhost/vidstream".to_string(),
            ),
            ("ACCESS_TOKEN_SECRET".to_string(), "test-access-secret".to_string()),
            ("REFRESH_TOKEN_SECRET".to_string(), "test-refresh-secret".to_string()),
        ])
        .unwrap();
        TokenService::new(&config)
    }

    #[test]
    fn access_token_round_trips() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let token = tokens.issue_access(user_id).unwrap();
        assert_eq!(tokens.verify_access(&token).unwrap(), user_id);
    }

    #[test]
    fn refresh_token_round_trips() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let token = tokens.issue_refresh(user_id).unwrap();
        assert_eq!(tokens.verify_refresh(&token).unwrap(), user_id);
    }

    #[test]
    fn token_classes_do_not_cross_verify() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let access = tokens.issue_access(user_id).unwrap();
        let refresh = tokens.issue_refresh(user_id).unwrap();
        assert!(matches!(
            tokens.verify_refresh(&access),
            Err(ApiError::InvalidToken)
        ));
        assert!(matches!(
            tokens.verify_access(&refresh),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let tokens = service();
        let mut token = tokens.issue_access(Uuid::new_v4()).unwrap();
        // Flip a character in the payload segment.
        let mid = token.len() / 2;
        let flipped = if token.as_bytes()[mid] == b'a' { "b" } else { "a" };
        token.replace_range(mid..mid + 1, flipped);
        assert!(matches!(
            tokens.verify_access(&token),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let expired = TokenClass {
            encoding: EncodingKey::from_secret(b"test-access-secret"),
            decoding: DecodingKey::from_secret(b"test-access-secret"),
            ttl: Duration::seconds(-120),
        };
        let token = issue(&expired, Uuid::new_v4(), ACCESS).unwrap();
        assert!(matches!(
            tokens.verify_access(&token),
            Err(ApiError::InvalidToken)
        ));
    }
}
