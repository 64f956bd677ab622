use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A normalized, content-addressed catalog of pack sizes.
/// Immutable once stored: reuse never touches `created_at` / `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PackSet {
    pub id: Uuid,
    pub version_hash: String,
    /// Largest pack size in the catalog.
    pub total_amount: i64,
    /// Distinct positive sizes in ascending order.
    pub pack_sizes: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optimal breakdown for one order amount against one catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// pack size → count; zero counts are never present.
    pub packs: BTreeMap<i64, i64>,
    pub total_items: i64,
    pub total_packs: i64,
    pub overage: i64,
}

impl CalculationResult {
    pub fn from_counts(amount: i64, packs: BTreeMap<i64, i64>) -> Self {
        let total_items = packs.iter().map(|(size, count)| size * count).sum();
        let total_packs = packs.values().sum();
        CalculationResult {
            packs,
            total_items,
            total_packs,
            overage: total_items - amount,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePacksRequest {
    pub packs: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CalculateQuery {
    pub amount: i64,
    pub packs_hash: String,
}
