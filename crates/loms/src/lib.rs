//! Reservation orchestrator for orders and stock.
//!
//! [`LomsService`] ties order lifecycle transitions to per-SKU stock holds:
//! 1. Create: persist the order, reserve every item, then await payment
//! 2. Pay: turn the holds into permanent deductions
//! 3. Cancel: hand the holds back to availability
//!
//! Create and Pay are sagas. When a step fails part way, the steps already
//! applied are compensated before the error is returned.

pub mod error;
pub mod responses;
pub mod service;

pub use error::{ErrorKind, LomsError, Result};
pub use responses::{OrderInfo, StocksInfo};
pub use service::LomsService;
