use tracing::debug;

use crate::errors::AppError;
use crate::models::pack_set::CalculationResult;
use crate::packing::cache::{CacheKey, ResultCache};
use crate::packing::registry::PackSetRegistry;
use crate::packing::solver::{compute_packs, SolverLimits};

/// Resolves a catalog by version hash and returns the optimal breakdown for `amount`,
/// served from the result cache when possible.
///
/// The catalog lookup always goes to the registry, so a deleted catalog fails with
/// `NotFound` even while results for its hash are still cached.
pub async fn calculate(
    registry: &PackSetRegistry,
    cache: &ResultCache,
    limits: SolverLimits,
    amount: i64,
    version_hash: &str,
) -> Result<CalculationResult, AppError> {
    calculate_with(registry, cache, amount, version_hash, move |amount, sizes| {
        compute_packs(amount, sizes, limits)
    })
    .await
}

/// `calculate` with the solver passed in; `solve` runs on a blocking thread, at most once
/// per cache miss.
async fn calculate_with<S>(
    registry: &PackSetRegistry,
    cache: &ResultCache,
    amount: i64,
    version_hash: &str,
    solve: S,
) -> Result<CalculationResult, AppError>
where
    S: FnOnce(i64, &[i64]) -> Result<CalculationResult, AppError> + Send + 'static,
{
    if amount <= 0 {
        return Err(AppError::InvalidAmount(format!(
            "amount must be greater than 0, got {amount}"
        )));
    }

    let pack_set = registry.get_by_hash(version_hash).await?;
    let key = CacheKey {
        version_hash: pack_set.version_hash.clone(),
        amount,
    };

    let sizes = pack_set.pack_sizes;
    cache
        .get_or_compute(key, || async move {
            debug!(amount, sizes = ?sizes, "running pack solver");
            // CPU-bound: keep it off the async executor.
            tokio::task::spawn_blocking(move || solve(amount, &sizes))
                .await
                .map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("spawn_blocking failed in solver: {e}"))
                })?
        })
        .await
}
