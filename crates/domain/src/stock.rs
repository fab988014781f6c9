//! Per-SKU stock counters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a stock mutation would break the counter invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StockError {
    /// Not enough unreserved units to satisfy the request.
    #[error("requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// Fewer units are held than the operation wants to take off hold.
    #[error("requested {requested}, reserved {reserved}")]
    InsufficientReservation { requested: u32, reserved: u32 },

    /// The counter would exceed `u32::MAX`.
    #[error("stock counter overflow")]
    Overflow,
}

/// Total and reserved units of a single SKU.
///
/// Every operation returns a new level and leaves `self` untouched when it
/// fails, so `0 <= reserved <= total_count` holds for every level this type
/// hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockLevel {
    pub total_count: u32,
    pub reserved: u32,
}

impl StockLevel {
    /// Creates a level, rejecting a reservation larger than the total.
    pub fn new(total_count: u32, reserved: u32) -> Result<Self, StockError> {
        if reserved > total_count {
            return Err(StockError::InsufficientStock {
                requested: reserved,
                available: total_count,
            });
        }
        Ok(Self {
            total_count,
            reserved,
        })
    }

    /// Units that may still be reserved.
    pub fn available(&self) -> u32 {
        self.total_count - self.reserved
    }

    /// Puts `count` units on hold.
    pub fn reserve(&self, count: u32) -> Result<Self, StockError> {
        let available = self.available();
        if available < count {
            return Err(StockError::InsufficientStock {
                requested: count,
                available,
            });
        }
        Ok(Self {
            total_count: self.total_count,
            reserved: self.reserved + count,
        })
    }

    /// Takes `count` units off hold and returns them to availability.
    pub fn release(&self, count: u32) -> Result<Self, StockError> {
        if self.reserved < count {
            return Err(StockError::InsufficientReservation {
                requested: count,
                reserved: self.reserved,
            });
        }
        Ok(Self {
            total_count: self.total_count,
            reserved: self.reserved - count,
        })
    }

    /// Turns `count` held units into a permanent deduction.
    ///
    /// Both counters drop by `count`, so availability is unchanged.
    pub fn consume(&self, count: u32) -> Result<Self, StockError> {
        if self.reserved < count {
            return Err(StockError::InsufficientStock {
                requested: count,
                available: self.reserved,
            });
        }
        Ok(Self {
            total_count: self.total_count - count,
            reserved: self.reserved - count,
        })
    }

    /// Reverses [`consume`](Self::consume): units come back into inventory as a hold.
    pub fn restore(&self, count: u32) -> Result<Self, StockError> {
        let total_count = self
            .total_count
            .checked_add(count)
            .ok_or(StockError::Overflow)?;
        Ok(Self {
            total_count,
            reserved: self.reserved + count,
        })
    }

    /// Replaces the total while keeping existing holds.
    pub fn with_total(&self, total_count: u32) -> Result<Self, StockError> {
        if total_count < self.reserved {
            return Err(StockError::InsufficientReservation {
                requested: total_count,
                reserved: self.reserved,
            });
        }
        Ok(Self {
            total_count,
            reserved: self.reserved,
        })
    }
}
