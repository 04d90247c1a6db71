//! Registration, login and token refresh

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::auth::{check_strength, hash_password, verify_password, Claims, TokenIssuer, TokenKind, TokenPair};
use crate::domain::aggregates::User;
use crate::repository::{RepositoryError, UserRepository};
use crate::{Result, ShopError};

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 2, max = 100))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 2, max = 100))]
    pub last_name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenIssuer) -> Self { Self { users, tokens } }

    pub async fn register(&self, mut req: RegisterRequest) -> Result<AuthResponse> {
        req.email = normalize_email(&req.email);
        if req.email.is_empty() {
            return Err(ShopError::EmailRequired);
        }
        check_strength(&req.password)?;
        req.validate()?;

        if self.users.get_by_email(&req.email).await?.is_some() {
            return Err(ShopError::EmailAlreadyExists);
        }

        let hash = hash_password(&req.password)?;
        let user = User::register(req.email, hash, req.first_name.trim(), req.last_name.trim());
        self.users.create(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => ShopError::EmailAlreadyExists,
            other => ShopError::Storage(other),
        })?;

        info!(user_id = %user.id, "user registered");
        let tokens = self.tokens.issue_pair(&user)?;
        Ok(AuthResponse { user, tokens })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        let email = normalize_email(&req.email);
        if email.is_empty() {
            return Err(ShopError::EmailRequired);
        }
        if req.password.is_empty() {
            return Err(ShopError::PasswordRequired);
        }

        let user = self.users.get_by_email(&email).await?.ok_or(ShopError::InvalidCredentials)?;
        if !verify_password(&req.password, &user.password_hash) {
            return Err(ShopError::InvalidCredentials);
        }

        let tokens = self.tokens.issue_pair(&user)?;
        Ok(AuthResponse { user, tokens })
    }

    /// Exchanges a refresh token for a new pair. The account must still exist.
    pub async fn refresh(&self, req: RefreshRequest) -> Result<AuthResponse> {
        let claims = self.tokens.verify(req.refresh_token.trim(), TokenKind::Refresh)?;
        let user = self.users.get_by_id(claims.sub).await?.ok_or(ShopError::InvalidToken)?;
        let tokens = self.tokens.issue_pair(&user)?;
        Ok(AuthResponse { user, tokens })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        Ok(self.tokens.verify(token, TokenKind::Access)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures;
    use chrono::Duration;

    fn service() -> AuthService {
        let issuer = TokenIssuer::new(vec![7u8; 32], Duration::hours(24), Duration::days(7));
        AuthService::new(fixtures::repos().users, issuer)
    }

    fn register(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            first_name: "Iryna".into(),
            last_name: "Koval".into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();
        let registered = service.register(register("  Iryna@Example.com ", "s3cret-pass")).await.unwrap();
        assert_eq!(registered.user.email, "iryna@example.com");

        let claims = service.validate_token(&registered.tokens.access_token).unwrap();
        assert_eq!(claims.sub, registered.user.id);

        let login = service
            .login(LoginRequest { email: "iryna@example.com".into(), password: "s3cret-pass".into() })
            .await
            .unwrap();
        assert_eq!(login.user.id, registered.user.id);

        let wrong = service.login(LoginRequest { email: "iryna@example.com".into(), password: "nope-nope".into() }).await;
        assert!(matches!(wrong, Err(ShopError::InvalidCredentials)));
        let unknown = service.login(LoginRequest { email: "ghost@example.com".into(), password: "whatever1".into() }).await;
        assert!(matches!(unknown, Err(ShopError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = service();
        assert!(matches!(service.register(register("", "longenough")).await, Err(ShopError::EmailRequired)));
        assert!(matches!(service.register(register("a@b.io", "")).await, Err(ShopError::PasswordRequired)));
        assert!(matches!(service.register(register("a@b.io", "short")).await, Err(ShopError::WeakPassword)));
        assert!(matches!(service.register(register("not-an-email", "longenough")).await, Err(ShopError::InvalidInput(_))));

        service.register(register("dup@example.com", "longenough")).await.unwrap();
        let dup = service.register(register("DUP@example.com", "longenough")).await;
        assert!(matches!(dup, Err(ShopError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn test_refresh_accepts_only_refresh_tokens() {
        let service = service();
        let registered = service.register(register("r@example.com", "longenough")).await.unwrap();

        let refreshed = service
            .refresh(RefreshRequest { refresh_token: registered.tokens.refresh_token.clone() })
            .await
            .unwrap();
        assert_eq!(refreshed.user.id, registered.user.id);

        let with_access = service.refresh(RefreshRequest { refresh_token: registered.tokens.access_token.clone() }).await;
        assert!(matches!(with_access, Err(ShopError::InvalidToken)));
        assert!(matches!(service.validate_token(&registered.tokens.refresh_token), Err(ShopError::InvalidToken)));
    }
}
