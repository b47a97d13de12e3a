//! In-memory [`UserStore`] used by the test suites.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::users::{SortOrder, StoreError, StoreResult, UserStore};
use crate::models::user::{NewUser, UserDocument};

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<UserDocument>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserDocument>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> StoreResult<Option<UserDocument>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.id.as_ref() == Some(id)).cloned())
    }

    async fn insert(&self, user: NewUser) -> StoreResult<UserDocument> {
        let mut users = self.users.write().await;
        if users.iter().any(|existing| existing.email == user.email) {
            return Err(StoreError::DuplicateKey(user.email));
        }

        let mut document = UserDocument::from_new(user);
        document.id = Some(ObjectId::new());
        users.push(document.clone());
        Ok(document)
    }

    async fn list(&self, order: SortOrder) -> StoreResult<Vec<UserDocument>> {
        let mut users = self.users.read().await.clone();
        match order {
            SortOrder::Natural => {}
            SortOrder::Asc => users.sort_by_key(|user| user.created_at),
            SortOrder::Desc => {
                users.sort_by_key(|user| user.created_at);
                users.reverse();
            }
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: "tester".to_string(),
            password_hash: "hash".to_string(),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_rejects_duplicates() {
        let store = InMemoryUserStore::new();

        let stored = store.insert(new_user("a@example.com")).await.unwrap();
        assert!(stored.id.is_some());

        let duplicate = store.insert(new_user("a@example.com")).await;
        assert!(matches!(duplicate, Err(StoreError::DuplicateKey(_))));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_lookups() {
        let store = InMemoryUserStore::new();
        let stored = store.insert(new_user("a@example.com")).await.unwrap();

        let by_email = store.find_by_email("a@example.com").await.unwrap();
        assert_eq!(by_email.as_ref(), Some(&stored));
        let by_id = store.find_by_id(&stored.id.unwrap()).await.unwrap();
        assert_eq!(by_id, Some(stored));
        assert!(store.find_by_id(&ObjectId::new()).await.unwrap().is_none());
    }
}
