//! Pack Optimization Engine — minimal whole-pack breakdown for an order.
//!
//! # Policy (strict priority)
//! 1. Ship at least the ordered amount.
//! 2. Minimize the shipped total `S`.
//! 3. Minimize the number of packs reaching `S`.
//! 4. Among remaining ties, use as many of the largest size as possible, then the next largest.
//!
//! # Search window
//! The optimal `S` lies in `[amount, amount + max_size)`: a total `max_size` or more above the
//! order could drop one of its largest packs and still ship enough. The engine fills an
//! unbounded coin-change table over `0..amount + max_size` (min packs per reachable total),
//! takes the first reachable total at or above `amount`, and walks the table back.
//!
//! The function is pure and CPU-bound; async callers run it via `tokio::task::spawn_blocking`.

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::AppError;
use crate::models::pack_set::CalculationResult;

const UNREACHABLE: u32 = u32::MAX;

/// Work bounds checked before any table is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverLimits {
    /// Max `amount + max(pack_sizes)`, i.e. table cells.
    pub max_table_size: usize,
    /// Max table cells times distinct pack sizes, i.e. inner-loop steps.
    pub max_steps: u128,
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry point
// ────────────────────────────────────────────────────────────────────────────

/// Computes the optimal breakdown of `amount` into packs drawn from `pack_sizes`.
///
/// Fails with `ResourceLimitExceeded` before any allocation when the table or the
/// number of fill steps would exceed `limits`.
pub fn compute_packs(
    amount: i64,
    pack_sizes: &[i64],
    limits: SolverLimits,
) -> Result<CalculationResult, AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount(format!(
            "amount must be greater than 0, got {amount}"
        )));
    }

    let mut sizes: Vec<i64> = pack_sizes.iter().copied().filter(|&s| s > 0).collect();
    sizes.sort_unstable();
    sizes.dedup();
    let Some(&largest) = sizes.last() else {
        return Err(AppError::EmptyPackSet);
    };

    let required = amount as u128 + largest as u128;
    if required > limits.max_table_size as u128 {
        return Err(AppError::ResourceLimitExceeded {
            resource: "table cells",
            required,
            limit: limits.max_table_size as u128,
        });
    }

    let steps = required * sizes.len() as u128;
    if steps > limits.max_steps {
        return Err(AppError::ResourceLimitExceeded {
            resource: "solver steps",
            required: steps,
            limit: limits.max_steps,
        });
    }

    // Both fit in usize: their sum is bounded by max_table_size.
    let amount = amount as usize;
    let sizes: Vec<usize> = sizes.into_iter().map(|s| s as usize).collect();
    let window_end = required as usize;

    let min_packs = fill_min_packs(&sizes, window_end);

    let Some(shipped) = (amount..window_end).find(|&total| min_packs[total] != UNREACHABLE) else {
        debug_assert!(false, "no reachable total in [{amount}, {window_end})");
        return Err(AppError::Internal(anyhow::anyhow!(
            "no reachable total for amount {amount} with sizes {sizes:?}"
        )));
    };

    let counts = reconstruct(&sizes, &min_packs, shipped)?;
    debug!(
        amount,
        shipped,
        packs = min_packs[shipped],
        window = window_end,
        "pack breakdown computed"
    );

    Ok(CalculationResult::from_counts(amount as i64, counts))
}

// ────────────────────────────────────────────────────────────────────────────
// Table fill and walk-back
// ────────────────────────────────────────────────────────────────────────────

/// `table[t]` = fewest packs summing exactly to `t`, or `UNREACHABLE`.
/// `sizes` must be ascending.
fn fill_min_packs(sizes: &[usize], len: usize) -> Vec<u32> {
    let mut table = vec![UNREACHABLE; len];
    if let Some(zero) = table.first_mut() {
        *zero = 0;
    }

    for total in 1..len {
        let mut best = UNREACHABLE;
        for &size in sizes {
            if size > total {
                break;
            }
            let prev = table[total - size];
            if prev != UNREACHABLE && prev + 1 < best {
                best = prev + 1;
            }
        }
        table[total] = best;
    }

    table
}

/// Walks back from `shipped`, taking the largest size that keeps the pack count minimal
/// at every step. Greedy-by-largest at each cell yields the lexicographically largest
/// count vector (ordered by descending size) among all minimal combinations.
fn reconstruct(
    sizes: &[usize],
    table: &[u32],
    shipped: usize,
) -> Result<BTreeMap<i64, i64>, AppError> {
    let mut counts = BTreeMap::new();
    let mut remaining = shipped;

    while remaining > 0 {
        let current = table[remaining];
        let step = sizes.iter().rev().copied().find(|&size| {
            size <= remaining && {
                let prev = table[remaining - size];
                prev != UNREACHABLE && prev + 1 == current
            }
        });

        let Some(size) = step else {
            debug_assert!(false, "broken table at total {remaining}");
            return Err(AppError::Internal(anyhow::anyhow!(
                "pack table has no predecessor for total {remaining}"
            )));
        };

        *counts.entry(size as i64).or_insert(0) += 1;
        remaining -= size;
    }

    Ok(counts)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
