//! Value objects for the order domain.

use std::collections::BTreeMap;

use common::{OrderId, Sku, UserId};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus};

/// A SKU and the quantity requested of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub sku: Sku,
    pub count: u32,
}

impl Item {
    /// Creates a new item.
    pub fn new(sku: impl Into<Sku>, count: u32) -> Self {
        Self {
            sku: sku.into(),
            count,
        }
    }
}

/// Checks that an order request names a valid owner and at least one
/// well-formed item.
pub fn validate_items(user_id: UserId, items: &[Item]) -> Result<(), OrderError> {
    if !user_id.is_valid() {
        return Err(OrderError::InvalidUser {
            user_id: user_id.as_i64(),
        });
    }
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }
    for (index, item) in items.iter().enumerate() {
        if !item.sku.is_valid() {
            return Err(OrderError::InvalidSku { index });
        }
        if item.count == 0 {
            return Err(OrderError::InvalidCount {
                sku: item.sku.as_u32(),
                count: item.count,
            });
        }
    }
    Ok(())
}

/// A persisted order.
///
/// The item list is fixed at creation; only `status` changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<Item>,
}

impl Order {
    /// Creates a new order in `New` status.
    pub fn new(id: OrderId, user_id: UserId, items: Vec<Item>) -> Self {
        Self {
            id,
            user_id,
            status: OrderStatus::New,
            items,
        }
    }

    /// Returns the total requested count per SKU.
    ///
    /// Repeated SKUs are summed.
    pub fn sku_counts(&self) -> BTreeMap<Sku, u32> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.sku).or_insert(0) += item.count;
        }
        counts
    }

    /// Returns the number of item lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
