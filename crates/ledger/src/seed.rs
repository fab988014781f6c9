//! Initial stock loading from a JSON file.
//!
//! The file holds an array of entries:
//!
//! ```json
//! [
//!   { "sku": 1076963, "total_count": 65534, "reserved": 0 },
//!   { "sku": 1148162, "total_count": 100 }
//! ]
//! ```

use std::path::Path;

use common::Sku;
use domain::StockLevel;
use serde::Deserialize;

use crate::{LedgerError, Result, StocksStorage};

/// One SKU's starting counters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockSeed {
    pub sku: Sku,
    pub total_count: u32,
    #[serde(default)]
    pub reserved: u32,
}

/// Reads seed entries from a JSON file.
pub fn load_seed(path: impl AsRef<Path>) -> Result<Vec<StockSeed>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Writes seed entries into a stock ledger and returns how many were new.
///
/// Seeding only creates SKUs. A SKU that is already stocked keeps its
/// counters, so re-running the seed on a persistent ledger is a no-op.
pub async fn apply_seed<S>(storage: &S, seed: &[StockSeed]) -> Result<usize>
where
    S: StocksStorage + ?Sized,
{
    let mut inserted = 0;
    for entry in seed {
        let level = StockLevel::new(entry.total_count, entry.reserved)
            .map_err(|e| LedgerError::from_stock(entry.sku, e))?;
        if storage.insert_stock_if_absent(entry.sku, level).await? {
            inserted += 1;
        } else {
            tracing::debug!(sku = %entry.sku, "sku already stocked, seed entry skipped");
        }
    }
    tracing::info!(entries = seed.len(), inserted, "stock seed applied");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{InMemoryStocksStorage, SkuCounts};

    #[tokio::test]
    async fn seed_from_file() {
        let path = std::env::temp_dir().join(format!("loms-seed-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[{{"sku": 1076963, "total_count": 100, "reserved": 20}}, {{"sku": 2, "total_count": 5}}]"#
        )
        .unwrap();

        let seed = load_seed(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(seed.len(), 2);
        assert_eq!(seed[1].reserved, 0);

        let storage = InMemoryStocksStorage::new();
        assert_eq!(apply_seed(&storage, &seed).await.unwrap(), 2);

        let level = storage.get_availability(Sku::new(1076963)).await.unwrap();
        assert_eq!(level.total_count, 100);
        assert_eq!(level.reserved, 20);
        assert_eq!(storage.get_availability(Sku::new(2)).await.unwrap().available(), 5);
    }

    #[tokio::test]
    async fn reapplying_seed_keeps_live_counters() {
        let seed = vec![StockSeed {
            sku: Sku::new(1),
            total_count: 10,
            reserved: 2,
        }];
        let storage = InMemoryStocksStorage::new();
        assert_eq!(apply_seed(&storage, &seed).await.unwrap(), 1);

        storage.reserve(Sku::new(1), 3).await.unwrap();
        storage
            .consume_on_pay(&SkuCounts::from([(Sku::new(1), 3)]))
            .await
            .unwrap();
        let before = storage.get_availability(Sku::new(1)).await.unwrap();
        assert_eq!(before, StockLevel::new(7, 2).unwrap());

        for _ in 0..5 {
            assert_eq!(apply_seed(&storage, &seed).await.unwrap(), 0);
        }
        assert_eq!(storage.get_availability(Sku::new(1)).await.unwrap(), before);
    }

    #[tokio::test]
    async fn seed_with_hold_above_total_is_rejected() {
        let seed = vec![StockSeed {
            sku: Sku::new(4),
            total_count: 1,
            reserved: 2,
        }];
        let storage = InMemoryStocksStorage::new();

        let err = apply_seed(&storage, &seed).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { .. }));
        assert_eq!(storage.sku_count().await, 0);
    }

    #[test]
    fn missing_file_is_seed_error() {
        let err = load_seed("/nonexistent/loms-seed.json").unwrap_err();
        assert!(matches!(err, crate::LedgerError::Seed(_)));
    }
}
