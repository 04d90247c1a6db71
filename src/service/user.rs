//! User administration

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::auth::normalize_email;
use super::{search_term, Paginated};
use crate::auth::{check_strength, hash_password};
use crate::domain::aggregates::{Role, User};
use crate::domain::value_objects::Pagination;
use crate::repository::{RepositoryError, UserQuery, UserRepository};
use crate::{Result, ShopError};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub last_name: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUserRequest {
    fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.role.is_none()
    }
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self { Self { users } }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        if id.is_nil() {
            return Err(ShopError::UserIdRequired);
        }
        self.users.get_by_id(id).await?.ok_or(ShopError::UserNotFound)
    }

    pub async fn list_users(&self, filter: UserFilter) -> Result<Paginated<User>> {
        let role = match filter.role.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<Role>()?),
        };
        let page = Pagination::from_optional(filter.limit, filter.offset);
        let query = UserQuery { role, search: search_term(filter.search), page };

        let result = self.users.list(&query).await?;
        Ok(Paginated::new(result, page))
    }

    /// Applies a partial update. `role` is only honoured when `is_admin`.
    pub async fn update_user(&self, id: Uuid, mut req: UpdateUserRequest, is_admin: bool) -> Result<User> {
        if !is_admin {
            req.role = None;
        }
        let mut user = self.get_user(id).await?;
        if req.is_empty() {
            return Err(ShopError::NoFieldsToUpdate);
        }
        req.email = req.email.as_deref().map(normalize_email);
        req.validate()?;

        if let Some(email) = req.email.filter(|email| *email != user.email) {
            if self.users.get_by_email(&email).await?.is_some() {
                return Err(ShopError::EmailAlreadyExists);
            }
            user.email = email;
        }
        if let Some(password) = req.password {
            check_strength(&password)?;
            user.password_hash = hash_password(&password)?;
        }
        if let Some(first_name) = req.first_name {
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = req.last_name {
            user.last_name = last_name.trim().to_string();
        }
        if let Some(role) = req.role {
            user.role = role;
        }
        user.touch();

        let updated = self.users.update(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => ShopError::EmailAlreadyExists,
            other => ShopError::Storage(other),
        })?;
        if !updated {
            return Err(ShopError::UserNotFound);
        }
        Ok(user)
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<()> {
        if id.is_nil() {
            return Err(ShopError::UserIdRequired);
        }
        if !self.users.delete(id).await? {
            return Err(ShopError::UserNotFound);
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::service::fixtures;

    #[tokio::test]
    async fn test_role_change_requires_admin() {
        let repos = fixtures::repos();
        let user = fixtures::user(&repos).await;
        let service = UserService::new(repos.users.clone());

        let promote = UpdateUserRequest { role: Some(Role::Admin), ..Default::default() };
        assert!(matches!(service.update_user(user.id, promote.clone(), false).await, Err(ShopError::NoFieldsToUpdate)));
        assert_eq!(service.update_user(user.id, promote, true).await.unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn test_update_fields() {
        let repos = fixtures::repos();
        let user = fixtures::user(&repos).await;
        let other = fixtures::user(&repos).await;
        let service = UserService::new(repos.users.clone());

        let taken = UpdateUserRequest { email: Some(other.email.to_uppercase()), ..Default::default() };
        assert!(matches!(service.update_user(user.id, taken, false).await, Err(ShopError::EmailAlreadyExists)));

        let weak = UpdateUserRequest { password: Some("abc".into()), ..Default::default() };
        assert!(matches!(service.update_user(user.id, weak, false).await, Err(ShopError::WeakPassword)));

        let change = UpdateUserRequest {
            password: Some("brand-new-pass".into()),
            first_name: Some(" Olena ".into()),
            ..Default::default()
        };
        let updated = service.update_user(user.id, change, false).await.unwrap();
        assert_eq!(updated.first_name, "Olena");
        assert!(verify_password("brand-new-pass", &service.get_user(user.id).await.unwrap().password_hash));

        let missing = service.update_user(Uuid::new_v4(), UpdateUserRequest::default(), true).await;
        assert!(matches!(missing, Err(ShopError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let repos = fixtures::repos();
        let service = UserService::new(repos.users.clone());
        let first = fixtures::user(&repos).await;
        fixtures::user(&repos).await;
        service
            .update_user(first.id, UpdateUserRequest { role: Some(Role::Admin), ..Default::default() }, true)
            .await
            .unwrap();

        let admins = service.list_users(UserFilter { role: Some("admin".into()), ..Default::default() }).await.unwrap();
        assert_eq!(admins.total, 1);
        assert_eq!(admins.data[0].id, first.id);
        assert_eq!(service.list_users(UserFilter::default()).await.unwrap().total, 2);
        assert!(service.list_users(UserFilter { role: Some("root".into()), ..Default::default() }).await.is_err());

        service.delete_user(first.id).await.unwrap();
        assert!(matches!(service.delete_user(first.id).await, Err(ShopError::UserNotFound)));
        assert!(matches!(service.get_user(first.id).await, Err(ShopError::UserNotFound)));
    }
}
