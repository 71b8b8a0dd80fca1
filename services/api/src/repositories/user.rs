//! User repository

use chrono::Utc;
use common::error::StoreResult;
use common::store::{Collection, DocumentStore, Filter, Update};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{User, collections::USERS};

#[derive(Clone)]
pub struct UserRepository {
    users: Collection<User>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: super::collection(store, USERS),
        }
    }

    pub async fn create(&self, user: &User) -> StoreResult<User> {
        self.users.insert(user).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.users.find_by_id(id).await
    }

    pub async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.users.find_one(&Filter::eq("username", username)).await
    }

    /// Look up a login name that may be either a username or an email
    pub async fn find_by_username_or_email(&self, value: &str) -> StoreResult<Option<User>> {
        self.users
            .find_one(&Filter::Or(vec![
                Filter::eq("username", value),
                Filter::eq("email", value),
            ]))
            .await
    }

    pub async fn username_or_email_taken(&self, username: &str, email: &str) -> StoreResult<bool> {
        let count = self
            .users
            .count(&Filter::Or(vec![
                Filter::eq("username", username),
                Filter::eq("email", email),
            ]))
            .await?;
        Ok(count > 0)
    }

    /// User holding an unexpired email verification token digest
    pub async fn find_by_verification_token(&self, digest: &str) -> StoreResult<Option<User>> {
        self.find_by_live_token("emailVerificationToken", "emailVerificationExpiry", digest)
            .await
    }

    /// User holding an unexpired password reset token digest
    pub async fn find_by_reset_token(&self, digest: &str) -> StoreResult<Option<User>> {
        self.find_by_live_token("forgotPasswordToken", "forgotPasswordExpiry", digest)
            .await
    }

    async fn find_by_live_token(
        &self,
        token_field: &str,
        expiry_field: &str,
        digest: &str,
    ) -> StoreResult<Option<User>> {
        let now_ms = Utc::now().timestamp_millis() as f64;
        self.users
            .find_one(
                &Filter::eq(token_field, digest).and(Filter::Gt(expiry_field.to_string(), now_ms)),
            )
            .await
    }

    pub async fn update(&self, id: Uuid, updates: &[Update]) -> StoreResult<Option<User>> {
        self.users.update_by_id(id, updates).await
    }

    /// Update the user only while `condition` still holds
    pub async fn update_if(
        &self,
        id: Uuid,
        condition: Filter,
        updates: &[Update],
    ) -> StoreResult<Option<User>> {
        self.users
            .update_one(&Filter::id(id).and(condition), updates)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::PasswordHasher;
    use common::store::MemoryStore;

    async fn user(username: &str, email: &str) -> User {
        User::new(
            username.to_string(),
            email.to_string(),
            "Test User".to_string(),
            "memory://image/avatar.png".to_string(),
            None,
            PasswordHasher::new(4).hash("secret1").await.unwrap(),
        )
    }

    #[tokio::test]
    async fn test_lookup_by_username_or_email() {
        let repo = UserRepository::new(Arc::new(MemoryStore::new()));
        let created = repo.create(&user("janedoe", "jane@example.com").await).await.unwrap();

        let by_name = repo.find_by_username_or_email("janedoe").await.unwrap();
        let by_email = repo.find_by_username_or_email("jane@example.com").await.unwrap();
        assert_eq!(by_name.map(|u| u.id), Some(created.id));
        assert_eq!(by_email.map(|u| u.id), Some(created.id));
        assert!(repo.username_or_email_taken("other1", "jane@example.com").await.unwrap());
        assert!(!repo.username_or_email_taken("other1", "other@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_tokens_are_not_found() {
        let repo = UserRepository::new(Arc::new(MemoryStore::new()));
        let created = repo.create(&user("janedoe", "jane@example.com").await).await.unwrap();
        let past = Utc::now().timestamp_millis() - 1_000;
        let future = Utc::now().timestamp_millis() + 60_000;

        repo.update(
            created.id,
            &[
                Update::set("emailVerificationToken", "stale"),
                Update::set("emailVerificationExpiry", past),
                Update::set("forgotPasswordToken", "fresh"),
                Update::set("forgotPasswordExpiry", future),
            ],
        )
        .await
        .unwrap();

        assert!(repo.find_by_verification_token("stale").await.unwrap().is_none());
        assert!(repo.find_by_reset_token("fresh").await.unwrap().is_some());
    }
}
