//! Signed bearer tokens
//!
//! Format is `base64url(claims json).base64url(hmac-sha256 of the first part)`.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Role, User};
use crate::ShopError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("expected {expected:?} token, got {actual:?}")]
    WrongKind { expected: TokenKind, actual: TokenKind },

    #[error("signing key rejected")]
    InvalidKey,

    #[error("failed to encode claims")]
    Encoding(#[from] serde_json::Error),
}

impl From<TokenError> for ShopError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Malformed | TokenError::BadSignature | TokenError::WrongKind { .. } => Self::InvalidToken,
            TokenError::InvalidKey | TokenError::Encoding(_) => Self::Internal(error.to_string()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"[redacted]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(secret: impl Into<Vec<u8>>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self { secret: secret.into(), access_ttl, refresh_ttl }
    }

    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user, TokenKind::Access)?,
            refresh_token: self.issue(user, TokenKind::Refresh)?,
            token_type: "Bearer",
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    pub fn issue(&self, user: &User, kind: TokenKind) -> Result<String, TokenError> {
        self.issue_at(user, kind, Utc::now())
    }

    pub fn issue_at(&self, user: &User, kind: TokenKind, now: DateTime<Utc>) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        self.verify_at(token, kind, Utc::now())
    }

    /// Checks the signature first, then the kind and expiry of the claims.
    pub fn verify_at(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| TokenError::BadSignature)?;

        let raw = URL_SAFE_NO_PAD.decode(payload).map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)?;

        if claims.kind != kind {
            return Err(TokenError::WrongKind { expected: kind, actual: claims.kind });
        }
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::InvalidKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("0123456789abcdef0123456789abcdef", Duration::hours(24), Duration::days(7))
    }

    fn user() -> User {
        User::register("token@example.com", "hash", "To", "Ken")
    }

    #[test]
    fn test_access_token_verifies() {
        let issuer = issuer();
        let user = user();
        let token = issuer.issue(&user, TokenKind::Access).unwrap();
        let claims = issuer.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = issuer();
        let token = issuer.issue(&user(), TokenKind::Access).unwrap();
        let forged = TokenIssuer::new("another-secret-another-secret-xx", Duration::hours(1), Duration::hours(1))
            .issue(&user(), TokenKind::Access)
            .unwrap();
        let (payload, _) = forged.split_once('.').unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        assert!(matches!(issuer.verify(&format!("{payload}.{signature}"), TokenKind::Access), Err(TokenError::BadSignature)));
        assert!(matches!(issuer.verify("garbage", TokenKind::Access), Err(TokenError::Malformed)));
    }

    #[test]
    fn test_expired_and_wrong_kind() {
        let issuer = issuer();
        let issued_at = Utc::now() - Duration::days(2);
        let stale = issuer.issue_at(&user(), TokenKind::Access, issued_at).unwrap();
        let err = issuer.verify(&stale, TokenKind::Access).unwrap_err();
        assert!(matches!(ShopError::from(err), ShopError::TokenExpired));

        let refresh = issuer.issue(&user(), TokenKind::Refresh).unwrap();
        assert!(matches!(
            issuer.verify(&refresh, TokenKind::Access),
            Err(TokenError::WrongKind { expected: TokenKind::Access, actual: TokenKind::Refresh })
        ));
        assert!(issuer.verify(&refresh, TokenKind::Refresh).is_ok());
    }
}
