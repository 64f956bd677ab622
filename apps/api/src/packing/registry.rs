use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pack_set::PackSet;
use crate::packing::normalizer::normalize_pack_sizes;
use crate::packing::store::PackSetStore;

/// Content-addressed registry of pack sets.
///
/// All normalization happens here; the store only sees canonical sequences.
#[derive(Clone)]
pub struct PackSetRegistry {
    store: Arc<dyn PackSetStore>,
}

/// Outcome of `create_or_reuse`.
#[derive(Debug, Clone)]
pub struct Registered {
    pub pack_set: PackSet,
    pub created: bool,
}

impl PackSetRegistry {
    pub fn new(store: Arc<dyn PackSetStore>) -> Self {
        Self { store }
    }

    /// Normalizes `raw_sizes` and returns the matching pack set, creating it on first use.
    /// An existing record is returned untouched.
    pub async fn create_or_reuse(&self, raw_sizes: &[i64]) -> Result<Registered, AppError> {
        let normalized = normalize_pack_sizes(raw_sizes)?;
        let now = Utc::now();
        let candidate = PackSet {
            id: Uuid::new_v4(),
            version_hash: normalized.version_hash().to_string(),
            total_amount: normalized.largest(),
            pack_sizes: normalized.sizes().to_vec(),
            created_at: now,
            updated_at: now,
        };

        let (pack_set, created) = self.store.insert_if_absent(candidate).await?;
        if created {
            info!(
                "Created pack set {} ({}) with sizes {:?}",
                pack_set.id, pack_set.version_hash, pack_set.pack_sizes
            );
        } else {
            info!(
                "Reusing pack set {} ({})",
                pack_set.id, pack_set.version_hash
            );
        }

        Ok(Registered { pack_set, created })
    }

    pub async fn get(&self, id: Uuid) -> Result<PackSet, AppError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pack set {id} not found")))
    }

    pub async fn get_by_hash(&self, version_hash: &str) -> Result<PackSet, AppError> {
        self.store
            .get_by_hash(version_hash)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Packs not found by hash: {version_hash}")))
    }

    pub async fn list(&self) -> Result<Vec<PackSet>, AppError> {
        self.store.list().await
    }

    /// Cached results computed for this catalog are left in place.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(format!("Pack set {id} not found")));
        }
        info!("Deleted pack set {id}");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.store.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packing::store::MemoryPackSetStore;

    fn registry() -> PackSetRegistry {
        PackSetRegistry::new(Arc::new(MemoryPackSetStore::new()))
    }

    #[tokio::test]
    async fn test_create_normalizes_sizes() {
        let registry = registry();
        let registered = registry
            .create_or_reuse(&[5000, 250, 1000, 250, 2000, 500])
            .await
            .unwrap();

        assert!(registered.created);
        assert_eq!(registered.pack_set.pack_sizes, vec![250, 500, 1000, 2000, 5000]);
        assert_eq!(registered.pack_set.total_amount, 5000);
        assert_eq!(registered.pack_set.version_hash.len(), 16);
    }

    #[tokio::test]
    async fn test_equivalent_catalogs_reuse_the_same_record() {
        let registry = registry();
        let first = registry.create_or_reuse(&[250, 500, 1000]).await.unwrap();
        let second = registry
            .create_or_reuse(&[1000, 500, 250, 500, 0])
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.pack_set.id, second.pack_set.id);
        assert_eq!(first.pack_set.version_hash, second.pack_set.version_hash);
        assert_eq!(first.pack_set.created_at, second.pack_set.created_at);
        assert_eq!(first.pack_set.updated_at, second.pack_set.updated_at);
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_catalog_rejected() {
        let registry = registry();
        assert!(matches!(
            registry.create_or_reuse(&[]).await,
            Err(AppError::EmptyPackSet)
        ));
        assert!(matches!(
            registry.create_or_reuse(&[-1, 0]).await,
            Err(AppError::EmptyPackSet)
        ));
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_and_get_by_hash() {
        let registry = registry();
        let created = registry.create_or_reuse(&[23, 31, 53]).await.unwrap().pack_set;

        assert_eq!(registry.get(created.id).await.unwrap(), created);
        assert_eq!(
            registry.get_by_hash(&created.version_hash).await.unwrap(),
            created
        );
        assert!(matches!(
            registry.get(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            registry.get_by_hash("0000000000000000").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_then_lookup_fails() {
        let registry = registry();
        let created = registry.create_or_reuse(&[10, 20]).await.unwrap().pack_set;

        registry.delete(created.id).await.unwrap();

        assert!(matches!(
            registry.get(created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            registry.get_by_hash(&created.version_hash).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            registry.delete(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_recreate_after_delete_keeps_hash() {
        let registry = registry();
        let original = registry.create_or_reuse(&[10, 20]).await.unwrap().pack_set;
        registry.delete(original.id).await.unwrap();

        let recreated = registry.create_or_reuse(&[20, 10]).await.unwrap();
        assert!(recreated.created);
        assert_ne!(recreated.pack_set.id, original.id);
        assert_eq!(recreated.pack_set.version_hash, original.version_hash);
    }
}
