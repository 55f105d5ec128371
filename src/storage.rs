use sled::Db;
use std::path::Path;

use crate::error::StoreError;

const SESSION_TREE: &str = "session";
pub const TOKEN_KEY: &str = "auth_token";
pub const USERNAME_KEY: &str = "auth_username";

/// Raw token/username pair as persisted, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub token: Option<String>,
    pub username: Option<String>,
}

/// Persisted client state: the bearer token and username under fixed keys.
///
/// Backed by a Sled database in the state directory so a session survives
/// process restarts the way browser local storage survives reloads.
#[derive(Clone)]
pub struct SessionStore {
    // Held so the database stays open for as long as the tree is in use.
    _db: Db,
    tree: sled::Tree,
}

impl SessionStore {
    /// Open or create the store at the given directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory store discarded on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        let tree = db.open_tree(SESSION_TREE)?;
        Ok(Self { _db: db, tree })
    }

    pub fn load(&self) -> Result<StoredCredentials, StoreError> {
        Ok(StoredCredentials {
            token: self.get(TOKEN_KEY)?,
            username: self.get(USERNAME_KEY)?,
        })
    }

    pub fn save(&self, token: &str, username: &str) -> Result<(), StoreError> {
        self.tree.insert(TOKEN_KEY, token.as_bytes())?;
        self.tree.insert(USERNAME_KEY, username.as_bytes())?;
        self.tree.flush()?;
        Ok(())
    }

    /// Remove both keys. Clearing an empty store is not an error.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.tree.remove(TOKEN_KEY)?;
        self.tree.remove(USERNAME_KEY)?;
        self.tree.flush()?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.tree.get(key)? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.tree.insert(key, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_save_load_clear() {
        let store = SessionStore::temporary().expect("temporary store");
        assert_eq!(
            store.load().unwrap(),
            StoredCredentials {
                token: None,
                username: None
            }
        );

        store.save("tok", "alice").unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.token.as_deref(), Some("tok"));
        assert_eq!(loaded.username.as_deref(), Some("alice"));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap().token, None);
    }

    #[test]
    fn test_survives_reopen() {
        let temp_dir = std::env::temp_dir().join("license_dash_test_store_reopen");
        let _ = fs::remove_dir_all(&temp_dir);

        {
            let store = SessionStore::open(&temp_dir).expect("open store");
            store.save("persisted", "bob").unwrap();
        }
        let store = SessionStore::open(&temp_dir).expect("reopen store");
        assert_eq!(store.load().unwrap().username.as_deref(), Some("bob"));

        drop(store);
        let _ = fs::remove_dir_all(temp_dir);
    }

    #[test]
    fn test_non_utf8_value_is_an_error() {
        let store = SessionStore::temporary().unwrap();
        store.put_raw(TOKEN_KEY, &[0xff, 0xfe]).unwrap();
        assert!(matches!(store.load(), Err(StoreError::Encoding(_))));
    }
}
