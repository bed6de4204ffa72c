use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use billforge_auth::User;
use billforge_core::{ExpectedVersion, UserId};

use super::{UserDirectory, email_taken};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    inner: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn create(&self, mut user: User) -> Result<User, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if map.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(email_taken());
        }
        if map.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {} already exists", user.id)));
        }
        user.version = 1;
        map.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn update(&self, mut user: User) -> Result<User, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if map
            .values()
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(email_taken());
        }
        let stored = map.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        if stored.version != user.version {
            return Err(StoreError::version_mismatch(
                ExpectedVersion::Exact(user.version),
                stored.version,
            ));
        }
        user.version += 1;
        *stored = user.clone();
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billforge_auth::Registration;
    use chrono::Utc;

    fn user(email: &str) -> User {
        Registration {
            name: "Asha".into(),
            email: email.into(),
            password: "correct horse".into(),
            ..Default::default()
        }
        .into_user("$argon2id$stub".into(), Utc::now())
        .unwrap()
    }

    #[tokio::test]
    async fn email_is_unique_case_insensitively() {
        let users = InMemoryUserDirectory::new();
        let created = users.create(user("asha@example.com")).await.unwrap();
        assert_eq!(created.version, 1);

        let err = users.create(user("ASHA@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let found = users.find_by_email("Asha@Example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn update_checks_version() {
        let users = InMemoryUserDirectory::new();
        let mut asha = users.create(user("asha@example.com")).await.unwrap();

        asha.name = "Asha K".into();
        let updated = users.update(asha.clone()).await.unwrap();
        assert_eq!(updated.version, 2);

        assert!(matches!(users.update(asha).await, Err(StoreError::Conflict(_))));
        assert_eq!(users.get(updated.id).await.unwrap().unwrap().name, "Asha K");
    }
}
