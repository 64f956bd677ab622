//! Pack set storage — swappable backends behind an insert-if-absent contract.
//!
//! Default: `PgPackSetStore` (PostgreSQL via sqlx, UNIQUE version_hash).
//! Without `DATABASE_URL`: `MemoryPackSetStore` (DashMap, shard-locked entry insertion).
//!
//! `AppState` holds an `Arc<dyn PackSetStore>`, chosen at startup via config.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pack_set::PackSet;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Storage contract for pack sets.
///
/// `insert_if_absent` must be atomic per version hash: concurrent inserts of the same
/// hash return the same stored record.
#[async_trait]
pub trait PackSetStore: Send + Sync {
    /// Stores `candidate` unless a pack set with its version hash exists.
    /// Returns the stored record and whether it was newly inserted.
    async fn insert_if_absent(&self, candidate: PackSet) -> Result<(PackSet, bool), AppError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<PackSet>, AppError>;

    async fn get_by_hash(&self, version_hash: &str) -> Result<Option<PackSet>, AppError>;

    async fn list(&self) -> Result<Vec<PackSet>, AppError>;

    /// Returns `false` when no pack set had this id.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL backend
// ────────────────────────────────────────────────────────────────────────────

pub struct PgPackSetStore {
    pool: PgPool,
}

impl PgPackSetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Attempts before giving up when a conflicting row vanishes between insert and read.
const INSERT_ATTEMPTS: usize = 3;

#[async_trait]
impl PackSetStore for PgPackSetStore {
    async fn insert_if_absent(&self, candidate: PackSet) -> Result<(PackSet, bool), AppError> {
        for _ in 0..INSERT_ATTEMPTS {
            let inserted: Option<PackSet> = sqlx::query_as(
                r#"
                INSERT INTO pack_sets
                    (id, version_hash, pack_sizes, total_amount, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (version_hash) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(candidate.id)
            .bind(&candidate.version_hash)
            .bind(&candidate.pack_sizes)
            .bind(candidate.total_amount)
            .bind(candidate.created_at)
            .bind(candidate.updated_at)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = inserted {
                return Ok((row, true));
            }

            // Lost the race (or the catalog already existed): read the winner.
            if let Some(existing) = self.get_by_hash(&candidate.version_hash).await? {
                return Ok((existing, false));
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "pack set {} kept disappearing during insert",
            candidate.version_hash
        )))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<PackSet>, AppError> {
        Ok(
            sqlx::query_as::<_, PackSet>("SELECT * FROM pack_sets WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn get_by_hash(&self, version_hash: &str) -> Result<Option<PackSet>, AppError> {
        Ok(
            sqlx::query_as::<_, PackSet>("SELECT * FROM pack_sets WHERE version_hash = $1")
                .bind(version_hash)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list(&self) -> Result<Vec<PackSet>, AppError> {
        Ok(
            sqlx::query_as::<_, PackSet>("SELECT * FROM pack_sets ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM pack_sets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ────────────────────────────────────────────────────────────────────────────

/// Keyed by version hash; `ids` maps each id back to its hash.
#[derive(Default)]
pub struct MemoryPackSetStore {
    by_hash: DashMap<String, PackSet>,
    ids: DashMap<Uuid, String>,
}

impl MemoryPackSetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PackSetStore for MemoryPackSetStore {
    async fn insert_if_absent(&self, candidate: PackSet) -> Result<(PackSet, bool), AppError> {
        // The entry guard holds the shard lock, so check-and-insert is atomic per hash.
        match self.by_hash.entry(candidate.version_hash.clone()) {
            Entry::Occupied(existing) => Ok((existing.get().clone(), false)),
            Entry::Vacant(slot) => {
                self.ids.insert(candidate.id, candidate.version_hash.clone());
                slot.insert(candidate.clone());
                Ok((candidate, true))
            }
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<PackSet>, AppError> {
        let Some(hash) = self.ids.get(&id).map(|h| h.value().clone()) else {
            return Ok(None);
        };
        Ok(self
            .by_hash
            .get(&hash)
            .map(|p| p.value().clone())
            .filter(|p| p.id == id))
    }

    async fn get_by_hash(&self, version_hash: &str) -> Result<Option<PackSet>, AppError> {
        Ok(self.by_hash.get(version_hash).map(|p| p.value().clone()))
    }

    async fn list(&self) -> Result<Vec<PackSet>, AppError> {
        let mut all: Vec<PackSet> = self.by_hash.iter().map(|p| p.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let Some(hash) = self.ids.get(&id).map(|h| h.value().clone()) else {
            return Ok(false);
        };
        // Primary index first: once it is gone, `get_by_id` misses even if `ids` still
        // points at the hash.
        let removed = self.by_hash.remove_if(&hash, |_, p| p.id == id).is_some();
        self.ids.remove(&id);
        Ok(removed)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    fn make_pack_set(hash: &str, sizes: Vec<i64>) -> PackSet {
        let now = Utc::now();
        PackSet {
            id: Uuid::new_v4(),
            version_hash: hash.to_string(),
            total_amount: sizes.last().copied().unwrap_or_default(),
            pack_sizes: sizes,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_then_reuse() {
        let store = MemoryPackSetStore::new();
        let (first, created) = store
            .insert_if_absent(make_pack_set("abc", vec![1, 2]))
            .await
            .unwrap();
        assert!(created);

        let (second, created) = store
            .insert_if_absent(make_pack_set("abc", vec![1, 2]))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_by_id_and_hash() {
        let store = MemoryPackSetStore::new();
        let (stored, _) = store
            .insert_if_absent(make_pack_set("h1", vec![3]))
            .await
            .unwrap();

        assert_eq!(store.get_by_id(stored.id).await.unwrap(), Some(stored.clone()));
        assert_eq!(store.get_by_hash("h1").await.unwrap(), Some(stored));
        assert_eq!(store.get_by_hash("missing").await.unwrap(), None);
        assert_eq!(store.get_by_id(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_removes_both_indexes() {
        let store = MemoryPackSetStore::new();
        let (stored, _) = store
            .insert_if_absent(make_pack_set("h2", vec![4]))
            .await
            .unwrap();

        assert!(store.delete(stored.id).await.unwrap());
        assert!(!store.delete(stored.id).await.unwrap());
        assert_eq!(store.get_by_id(stored.id).await.unwrap(), None);
        assert_eq!(store.get_by_hash("h2").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_collapse_to_one_record() {
        let store = Arc::new(MemoryPackSetStore::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert_if_absent(make_pack_set("same", vec![5, 10]))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        let mut created = 0;
        for handle in handles {
            let (stored, was_created) = handle.await.unwrap();
            ids.push(stored.id);
            created += usize::from(was_created);
        }

        assert_eq!(created, 1);
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_and_delete_keep_indexes_consistent() {
        let store = Arc::new(MemoryPackSetStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let (stored, _) = store
                        .insert_if_absent(make_pack_set("churn", vec![7]))
                        .await
                        .unwrap();
                    store.delete(stored.id).await.unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Every id must resolve to the record it names, and nothing may be orphaned.
        for entry in store.ids.iter() {
            let record = store.by_hash.get(entry.value()).map(|p| p.id);
            assert_eq!(record, Some(*entry.key()));
        }
        assert_eq!(store.ids.len(), store.by_hash.len());
        assert!(store.list().await.unwrap().len() <= 1);
    }
}
