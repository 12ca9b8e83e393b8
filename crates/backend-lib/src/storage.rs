// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Storage abstraction with a single-file JSON implementation.
//!
//! The whole database is one JSON document holding three collections. Every
//! call reloads the document from disk; nothing is cached between calls.
//! Reads share a lock, and each mutating call keeps the exclusive lock from
//! load through save, so two writers never work from the same stale copy.
//!
//! Saves overwrite the file in place. A crash in the middle of a write can
//! leave a truncated document behind.
use std::{
    collections::{BTreeMap, HashSet},
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use async_trait::async_trait;
use chirpy_common::{ChirpResponse, RecordId, SortOrder, UserResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{fs as tokio_fs, sync::RwLock};

use crate::error::{AppError, ForbiddenReason};

/// Low-level failure reading or writing the database file
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed database document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Stored user record, password hash included
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: RecordId,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub is_chirpy_red: bool,
}

impl User {
    /// Projection that is safe to hand to clients
    pub fn public(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            email: self.email.clone(),
            is_chirpy_red: self.is_chirpy_red,
            token: None,
            refresh_token: None,
        }
    }
}

/// Stored chirp record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Chirp {
    pub id: RecordId,
    #[serde(default)]
    pub author_id: RecordId,
    pub body: String,
}

impl From<Chirp> for ChirpResponse {
    fn from(chirp: Chirp) -> Self {
        ChirpResponse {
            id: chirp.id,
            author_id: chirp.author_id,
            body: chirp.body,
        }
    }
}

/// Full contents of the database file
///
/// Ordered maps keep serialization stable, so saving an unchanged snapshot
/// writes the same bytes back.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    #[serde(default)]
    pub chirps: BTreeMap<RecordId, Chirp>,
    #[serde(default)]
    pub users: BTreeMap<RecordId, User>,
    /// Revoked refresh token -> unix seconds of revocation
    #[serde(default)]
    pub revoked_tokens: BTreeMap<String, i64>,
    /// Id the next chirp will get. Zero in documents written before the
    /// counters existed.
    #[serde(default)]
    pub next_chirp_id: RecordId,
    #[serde(default)]
    pub next_user_id: RecordId,
}

impl Snapshot {
    /// Take the next chirp id. Ids only ever grow, deleted ids stay retired.
    pub fn allocate_chirp_id(&mut self) -> RecordId {
        allocate(&mut self.next_chirp_id, &self.chirps)
    }

    pub fn allocate_user_id(&mut self) -> RecordId {
        allocate(&mut self.next_user_id, &self.users)
    }
}

// An unset counter falls back to one past the highest id in use
fn allocate<V>(counter: &mut RecordId, collection: &BTreeMap<RecordId, V>) -> RecordId {
    let floor = collection.keys().next_back().map_or(1, |max| max + 1);
    let id = (*counter).max(floor);
    *counter = id + 1;
    id
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Trait for storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the whole database
    async fn load_snapshot(&self) -> Result<Snapshot, AppError>;

    /// Overwrite the whole database
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), AppError>;

    /// Insert a new user and return its public projection.
    ///
    /// Email uniqueness is not checked.
    async fn create_user(&self, email: &str, password_hash: &str)
        -> Result<UserResponse, AppError>;

    async fn get_user(&self, user_id: RecordId) -> Result<User, AppError>;

    /// Most recently created user with this email, if any
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    /// Replace the record with `user.id`. No field merging.
    async fn update_user(&self, user: User) -> Result<(), AppError>;

    /// Swap email and password hash of an existing user, keeping the
    /// Chirpy Red flag as stored at write time
    async fn update_credentials(
        &self,
        user_id: RecordId,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError>;

    /// Grant Chirpy Red to a user
    async fn mark_user_upgraded(&self, user_id: RecordId) -> Result<(), AppError>;

    async fn create_chirp(&self, author_id: RecordId, body: &str) -> Result<Chirp, AppError>;

    async fn get_chirp(&self, chirp_id: RecordId) -> Result<Chirp, AppError>;

    /// Chirps sorted by id, optionally restricted to one author
    async fn list_chirps(
        &self,
        order: SortOrder,
        author_id: Option<RecordId>,
    ) -> Result<Vec<Chirp>, AppError>;

    /// Remove a chirp owned by `requesting_user_id`
    async fn delete_chirp(
        &self,
        chirp_id: RecordId,
        requesting_user_id: RecordId,
    ) -> Result<(), AppError>;

    /// Add a token to the revocation set
    async fn revoke_token(&self, token: &str) -> Result<(), AppError>;

    async fn revoked_tokens(&self) -> Result<HashSet<String>, AppError>;
}

/// Single JSON document on disk guarded by an in-process read/write lock
pub struct FlatFileStorage {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FlatFileStorage {
    /// Open the database at `path`, creating an empty document if needed.
    ///
    /// With `reset` set, an existing file is deleted first.
    pub async fn open<P: AsRef<Path>>(path: P, reset: bool) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio_fs::create_dir_all(parent)
                .await
                .map_err(StoreError::from)?;
        }

        if reset {
            match tokio_fs::remove_file(&path).await {
                Ok(()) => tracing::info!(path = %path.display(), "database reset"),
                Err(e) if e.kind() == ErrorKind::NotFound => {},
                Err(e) => return Err(StoreError::from(e).into()),
            }
        }

        let storage = Self {
            path,
            lock: RwLock::new(()),
        };

        if !tokio_fs::try_exists(&storage.path)
            .await
            .map_err(StoreError::from)?
        {
            storage.write_file(&Snapshot::default()).await?;
            tracing::info!(path = %storage.path.display(), "created empty database");
        }

        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<Snapshot, StoreError> {
        let data = tokio_fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn write_file(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let data = serde_json::to_vec(snapshot)?;
        tokio_fs::write(&self.path, data).await?;
        Ok(())
    }

    /// Load, apply `f`, save; all under the write lock.
    /// Nothing is written when `f` fails.
    async fn modify<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Snapshot) -> Result<T, AppError> + Send,
        T: Send,
    {
        let _guard = self.lock.write().await;
        let mut snapshot = self.read_file().await?;
        let out = f(&mut snapshot)?;
        self.write_file(&snapshot).await?;
        Ok(out)
    }
}

#[async_trait]
impl Storage for FlatFileStorage {
    async fn load_snapshot(&self) -> Result<Snapshot, AppError> {
        let _guard = self.lock.read().await;
        Ok(self.read_file().await?)
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        let _guard = self.lock.write().await;
        Ok(self.write_file(snapshot).await?)
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<UserResponse, AppError> {
        self.modify(|db| {
            let user = User {
                id: db.allocate_user_id(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                is_chirpy_red: false,
            };
            let public = user.public();
            db.users.insert(user.id, user);
            Ok(public)
        })
        .await
    }

    async fn get_user(&self, user_id: RecordId) -> Result<User, AppError> {
        self.load_snapshot()
            .await?
            .users
            .remove(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .load_snapshot()
            .await?
            .users
            .into_values()
            .filter(|u| u.email == email)
            .last())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.load_snapshot().await?.users.into_values().collect())
    }

    async fn update_user(&self, user: User) -> Result<(), AppError> {
        self.modify(|db| {
            db.users.insert(user.id, user);
            Ok(())
        })
        .await
    }

    async fn update_credentials(
        &self,
        user_id: RecordId,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        self.modify(|db| {
            let user = db
                .users
                .get_mut(&user_id)
                .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
            user.email = email.to_string();
            user.password_hash = password_hash.to_string();
            Ok(user.clone())
        })
        .await
    }

    async fn mark_user_upgraded(&self, user_id: RecordId) -> Result<(), AppError> {
        self.modify(|db| {
            let user = db
                .users
                .get_mut(&user_id)
                .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
            user.is_chirpy_red = true;
            Ok(())
        })
        .await
    }

    async fn create_chirp(&self, author_id: RecordId, body: &str) -> Result<Chirp, AppError> {
        self.modify(|db| {
            let chirp = Chirp {
                id: db.allocate_chirp_id(),
                author_id,
                body: body.to_string(),
            };
            db.chirps.insert(chirp.id, chirp.clone());
            Ok(chirp)
        })
        .await
    }

    async fn get_chirp(&self, chirp_id: RecordId) -> Result<Chirp, AppError> {
        self.load_snapshot()
            .await?
            .chirps
            .remove(&chirp_id)
            .ok_or_else(|| AppError::NotFound(format!("chirp {chirp_id}")))
    }

    async fn list_chirps(
        &self,
        order: SortOrder,
        author_id: Option<RecordId>,
    ) -> Result<Vec<Chirp>, AppError> {
        let snapshot = self.load_snapshot().await?;
        // BTreeMap already yields ascending ids
        let mut chirps: Vec<Chirp> = snapshot
            .chirps
            .into_values()
            .filter(|c| author_id.map_or(true, |author| c.author_id == author))
            .collect();
        if order == SortOrder::Desc {
            chirps.reverse();
        }
        Ok(chirps)
    }

    async fn delete_chirp(
        &self,
        chirp_id: RecordId,
        requesting_user_id: RecordId,
    ) -> Result<(), AppError> {
        self.modify(|db| {
            let chirp = db
                .chirps
                .get(&chirp_id)
                .ok_or_else(|| AppError::NotFound(format!("chirp {chirp_id}")))?;
            if chirp.author_id != requesting_user_id {
                return Err(AppError::Forbidden(ForbiddenReason::NotAuthor));
            }
            db.chirps.remove(&chirp_id);
            Ok(())
        })
        .await
    }

    async fn revoke_token(&self, token: &str) -> Result<(), AppError> {
        self.modify(|db| {
            db.revoked_tokens.insert(token.to_string(), unix_now());
            Ok(())
        })
        .await
    }

    async fn revoked_tokens(&self) -> Result<HashSet<String>, AppError> {
        Ok(self
            .load_snapshot()
            .await?
            .revoked_tokens
            .into_keys()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn open_temp() -> (FlatFileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlatFileStorage::open(temp_dir.path().join("database.json"), false)
            .await
            .unwrap();
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_open_creates_empty_document() {
        let (storage, _temp_dir) = open_temp().await;
        let raw = std::fs::read_to_string(storage.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["chirps"].as_object().unwrap().is_empty());
        assert!(value["users"].as_object().unwrap().is_empty());
        assert!(value["revoked_tokens"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_with_reset_discards_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.json");

        let storage = FlatFileStorage::open(&path, false).await.unwrap();
        storage.create_chirp(1, "hello").await.unwrap();
        drop(storage);

        let reopened = FlatFileStorage::open(&path, false).await.unwrap();
        assert_eq!(reopened.load_snapshot().await.unwrap().chirps.len(), 1);
        drop(reopened);

        let reset = FlatFileStorage::open(&path, true).await.unwrap();
        assert!(reset.load_snapshot().await.unwrap().chirps.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_ids_and_sort_order() {
        let (storage, _temp_dir) = open_temp().await;

        let first = storage.create_chirp(1, "first").await.unwrap();
        let second = storage.create_chirp(1, "second").await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let desc: Vec<_> = storage
            .list_chirps(SortOrder::Desc, None)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(desc, vec![2, 1]);

        let asc: Vec<_> = storage
            .list_chirps(SortOrder::Asc, None)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(asc, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_list_chirps_author_filter() {
        let (storage, _temp_dir) = open_temp().await;
        storage.create_chirp(1, "a").await.unwrap();
        storage.create_chirp(2, "b").await.unwrap();
        storage.create_chirp(1, "c").await.unwrap();

        let by_one = storage.list_chirps(SortOrder::Asc, Some(1)).await.unwrap();
        assert_eq!(by_one.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 3]);

        let by_nobody = storage.list_chirps(SortOrder::Asc, Some(9)).await.unwrap();
        assert!(by_nobody.is_empty());
    }

    #[tokio::test]
    async fn test_delete_chirp_checks_author() {
        let (storage, _temp_dir) = open_temp().await;
        let chirp = storage.create_chirp(1, "mine").await.unwrap();

        let err = storage.delete_chirp(chirp.id, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ForbiddenReason::NotAuthor)));
        assert!(storage.get_chirp(chirp.id).await.is_ok());

        storage.delete_chirp(chirp.id, 1).await.unwrap();
        let remaining = storage.list_chirps(SortOrder::Asc, None).await.unwrap();
        assert!(remaining.iter().all(|c| c.id != chirp.id));

        let err = storage.delete_chirp(chirp.id, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let (storage, _temp_dir) = open_temp().await;
        storage.create_chirp(1, "one").await.unwrap();
        storage.create_chirp(1, "two").await.unwrap();
        storage.delete_chirp(1, 1).await.unwrap();

        let third = storage.create_chirp(1, "three").await.unwrap();
        assert_eq!(third.id, 3);
        assert_eq!(storage.get_chirp(2).await.unwrap().body, "two");
    }

    #[tokio::test]
    async fn test_deleting_highest_id_retires_it() {
        let (storage, _temp_dir) = open_temp().await;
        storage.create_chirp(1, "one").await.unwrap();
        storage.create_chirp(1, "two").await.unwrap();
        storage.delete_chirp(2, 1).await.unwrap();

        let next = storage.create_chirp(1, "three").await.unwrap();
        assert_eq!(next.id, 3);

        // Emptying the collection does not restart the sequence either
        storage.delete_chirp(1, 1).await.unwrap();
        storage.delete_chirp(3, 1).await.unwrap();
        assert_eq!(storage.create_chirp(1, "four").await.unwrap().id, 4);
    }

    #[tokio::test]
    async fn test_older_documents_continue_after_highest_id() {
        let (storage, _temp_dir) = open_temp().await;
        std::fs::write(
            storage.path(),
            br#"{"chirps":{"4":{"author_id":1,"body":"old","id":4}},"users":{"2":{"email":"a@b.c","id":2,"password":"h"}},"revoked_tokens":{}}"#,
        )
        .unwrap();

        assert_eq!(storage.create_chirp(1, "new").await.unwrap().id, 5);
        assert_eq!(storage.create_user("b@c.d", "h").await.unwrap().id, 3);

        let snapshot = storage.load_snapshot().await.unwrap();
        assert_eq!(snapshot.next_chirp_id, 6);
        assert_eq!(snapshot.next_user_id, 4);
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_distinct_ids() {
        let (storage, _temp_dir) = open_temp().await;
        let storage = Arc::new(storage);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    storage.create_chirp(1, &format!("chirp {i}")).await.unwrap().id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());
        assert_eq!(storage.load_snapshot().await.unwrap().chirps.len(), 16);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_is_byte_stable() {
        let (storage, _temp_dir) = open_temp().await;
        storage.create_user("a@example.com", "hash-a").await.unwrap();
        storage.create_chirp(1, "hello").await.unwrap();
        storage.revoke_token("some.refresh.token").await.unwrap();

        let before = std::fs::read(storage.path()).unwrap();
        let snapshot = storage.load_snapshot().await.unwrap();
        storage.save_snapshot(&snapshot).await.unwrap();
        let after = std::fs::read(storage.path()).unwrap();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_users_never_expose_password() {
        let (storage, _temp_dir) = open_temp().await;
        let created = storage.create_user("a@example.com", "secret-hash").await.unwrap();
        assert_eq!(created.id, 1);
        let json = serde_json::to_string(&created).unwrap();
        assert!(!json.contains("secret-hash"));

        let stored = storage.get_user(1).await.unwrap();
        assert_eq!(stored.password_hash, "secret-hash");
        assert!(!stored.is_chirpy_red);
    }

    #[tokio::test]
    async fn test_duplicate_email_last_writer_wins() {
        let (storage, _temp_dir) = open_temp().await;
        storage.create_user("dup@example.com", "h1").await.unwrap();
        storage.create_user("dup@example.com", "h2").await.unwrap();

        assert_eq!(storage.list_users().await.unwrap().len(), 2);
        let found = storage
            .find_user_by_email("dup@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 2);
        assert!(storage
            .find_user_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_user_overwrites_whole_record() {
        let (storage, _temp_dir) = open_temp().await;
        storage.create_user("old@example.com", "h1").await.unwrap();
        storage.mark_user_upgraded(1).await.unwrap();

        storage
            .update_user(User {
                id: 1,
                email: "new@example.com".to_string(),
                password_hash: "h2".to_string(),
                is_chirpy_red: false,
            })
            .await
            .unwrap();

        let user = storage.get_user(1).await.unwrap();
        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.password_hash, "h2");
        assert!(!user.is_chirpy_red);
    }

    #[tokio::test]
    async fn test_update_credentials_keeps_upgrade() {
        let (storage, _temp_dir) = open_temp().await;
        storage.create_user("old@example.com", "h1").await.unwrap();

        let err = storage.update_credentials(9, "x@example.com", "h").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let storage = Arc::new(storage);
        let upgrade = {
            let storage = storage.clone();
            tokio::spawn(async move { storage.mark_user_upgraded(1).await })
        };
        let updates: Vec<_> = (0..8)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    storage
                        .update_credentials(1, &format!("new{i}@example.com"), "h2")
                        .await
                })
            })
            .collect();

        upgrade.await.unwrap().unwrap();
        for update in updates {
            update.await.unwrap().unwrap();
        }

        let user = storage.get_user(1).await.unwrap();
        assert!(user.is_chirpy_red);
        assert_eq!(user.password_hash, "h2");
        assert!(user.email.starts_with("new"));
    }

    #[tokio::test]
    async fn test_mark_user_upgraded() {
        let (storage, _temp_dir) = open_temp().await;
        storage.create_user("a@example.com", "h").await.unwrap();

        storage.mark_user_upgraded(1).await.unwrap();
        assert!(storage.get_user(1).await.unwrap().is_chirpy_red);

        let err = storage.mark_user_upgraded(42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_revoked_tokens_append_only() {
        let (storage, _temp_dir) = open_temp().await;
        storage.revoke_token("t1").await.unwrap();
        storage.revoke_token("t2").await.unwrap();
        storage.revoke_token("t1").await.unwrap();

        let revoked = storage.revoked_tokens().await.unwrap();
        assert_eq!(revoked.len(), 2);
        assert!(revoked.contains("t1"));
        assert!(revoked.contains("t2"));

        let snapshot = storage.load_snapshot().await.unwrap();
        assert!(snapshot.revoked_tokens["t1"] > 0);
    }

    #[tokio::test]
    async fn test_malformed_file_is_store_unavailable() {
        let (storage, _temp_dir) = open_temp().await;
        std::fs::write(storage.path(), b"{not json").unwrap();

        let err = storage.load_snapshot().await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(StoreError::Malformed(_))));

        let err = storage.create_chirp(1, "x").await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_loads_documents_without_newer_fields() {
        let (storage, _temp_dir) = open_temp().await;
        std::fs::write(
            storage.path(),
            br#"{"chirps":{"1":{"body":"old","id":1}},"users":{"1":{"email":"a@b.c","id":1,"password":"h"}},"revoked_tokens":{}}"#,
        )
        .unwrap();

        let snapshot = storage.load_snapshot().await.unwrap();
        assert_eq!(snapshot.chirps[&1].author_id, 0);
        assert!(!snapshot.users[&1].is_chirpy_red);
    }
}
