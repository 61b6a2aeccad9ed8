use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{NewUser, UserRecord, UserStore};
use crate::error::StoreError;

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: HashMap<i64, UserRecord>,
    ids_by_email: HashMap<String, i64>,
}

/// Process-local user store.
///
/// Every mutation happens under one write lock, so read-modify-write on a
/// row is atomic.
#[derive(Default)]
pub struct InMemoryUserStore {
    tables: RwLock<Tables>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ids_by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.ids_by_email.contains_key(&user.email) {
            return Err(StoreError::Duplicate);
        }

        tables.last_id += 1;
        let record = UserRecord {
            id: tables.last_id,
            email: user.email,
            password_hash: user.password_hash,
            refresh_token_hash: None,
        };
        tables.ids_by_email.insert(record.email.clone(), record.id);
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_refresh_token_hash(&self, id: i64, hash: String) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.refresh_token_hash = Some(hash);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn swap_refresh_token_hash(
        &self,
        id: i64,
        expected: &str,
        hash: String,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) if user.refresh_token_hash.as_deref() == Some(expected) => {
                user.refresh_token_hash = Some(hash);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_refresh_token_hash(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .users
            .get_mut(&id)
            .and_then(|user| user.refresh_token_hash.take())
            .is_some())
    }
}
