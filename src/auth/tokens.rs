use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: Uuid,
    pub staff: bool,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Access/refresh pair returned on signup and login.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs and verifies bearer tokens for the identity contract: a token is
/// tied to one account id and carries its staff flag.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_minutes: i64, refresh_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(access_minutes),
            refresh_ttl: Duration::days(refresh_days),
        }
    }

    pub fn issue_pair(&self, user_id: Uuid, staff: bool) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.issue(user_id, staff, TokenKind::Access, self.access_ttl)?,
            refresh: self.issue(user_id, staff, TokenKind::Refresh, self.refresh_ttl)?,
        })
    }

    fn issue(
        &self,
        user_id: Uuid,
        staff: bool,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            staff,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verifies a bearer credential where an access token is required.
    /// Refresh tokens are rejected here.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AppError::Unauthenticated("Invalid or expired token".to_string()))?;

        if data.claims.kind != TokenKind::Access {
            return Err(AppError::Unauthenticated(
                "An access token is required".to_string(),
            ));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("unit-test-secret", 60, 7)
    }

    #[test]
    fn access_token_round_trips() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let pair = issuer.issue_pair(user_id, false).unwrap();

        let claims = issuer.verify_access(&pair.access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(!claims.staff);
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn staff_flag_survives_the_round_trip() {
        let issuer = issuer();
        let pair = issuer.issue_pair(Uuid::new_v4(), true).unwrap();
        assert!(issuer.verify_access(&pair.access).unwrap().staff);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let issuer = issuer();
        let pair = issuer.issue_pair(Uuid::new_v4(), false).unwrap();
        assert!(issuer.verify_access(&pair.refresh).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let pair = issuer().issue_pair(Uuid::new_v4(), false).unwrap();
        let other = TokenIssuer::new("different-secret", 60, 7);
        assert!(other.verify_access(&pair.access).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // negative TTL well past the default 60s validation leeway
        let issuer = issuer();
        let token = issuer
            .issue(Uuid::new_v4(), false, TokenKind::Access, Duration::minutes(-5))
            .unwrap();
        assert!(issuer.verify_access(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(issuer().verify_access("not-a-jwt").is_err());
    }
}
