use std::collections::{hash_map::Entry, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    types::{User, Username},
};

#[async_trait]
pub trait UserDatabase: Send + Sync + 'static {
    /// Retrieve the user with the specified username, if one exists.
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, StoreError>;

    /// Persist a new user. Must fail with [`StoreError::DuplicateKey`] when the username is
    /// already taken, atomically with respect to concurrent inserts.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
}

/// Process-local user store. Records are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryDb {
    storage: RwLock<HashMap<Username, User>>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }
}

#[async_trait]
impl UserDatabase for InMemoryDb {
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, StoreError> {
        Ok(self.storage.read().await.get(username).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        match self.storage.write().await.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::{HashedPassword, UserID};

    fn user(id: &str, name: &str) -> User {
        User {
            id: UserID(id.into()),
            username: Username(name.into()),
            password_hash: HashedPassword(format!("hash-of-{id}")),
        }
    }

    #[tokio::test]
    async fn insert_then_find() {
        let db = InMemoryDb::new();
        db.insert(&user("1", "alice")).await.unwrap();

        let found = db
            .find_by_username(&Username("alice".into()))
            .await
            .unwrap();
        assert_eq!(found, Some(user("1", "alice")));
        assert_eq!(
            db.find_by_username(&Username("bob".into())).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn duplicate_username_keeps_first_record() {
        let db = InMemoryDb::new();
        db.insert(&user("1", "alice")).await.unwrap();

        assert!(matches!(
            db.insert(&user("2", "alice")).await,
            Err(StoreError::DuplicateKey)
        ));
        let found = db
            .find_by_username(&Username("alice".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, UserID("1".into()));
    }

    #[tokio::test]
    async fn concurrent_inserts_of_one_username_admit_exactly_one() {
        let db = Arc::new(InMemoryDb::new());

        let attempts = (0..32).map(|i| {
            let db = db.clone();
            tokio::spawn(async move { db.insert(&user(&i.to_string(), "alice")).await })
        });

        let mut admitted = 0;
        for attempt in attempts.collect::<Vec<_>>() {
            match attempt.await.unwrap() {
                Ok(()) => admitted += 1,
                Err(StoreError::DuplicateKey) => {}
                Err(other) => panic!("unexpected store error: {other}"),
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(db.len().await, 1);
    }
}
