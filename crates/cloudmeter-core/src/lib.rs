//! Core types and utilities for cloudmeter.
//!
//! This crate provides the foundational types used throughout the cloudmeter
//! pipeline:
//!
//! - **Windows**: [`BillingWindow`] and calendar helpers for daily/monthly runs
//! - **Spending**: the raw upstream spending payload ([`SpendingEntry`],
//!   [`SpendingDetail`], typed inventory slices)
//! - **Prices**: [`PriceEntry`] and the effective-interval lookup in
//!   [`PriceList`]
//! - **Topology**: [`VmTopology`] with the volume-to-VM reverse index
//! - **Records**: the normalized warehouse row [`BillingRecord`]
//! - **Normalizer**: the pure [`normalize`] transform from raw spending to
//!   flat priced records
//!
//! Everything here is I/O-free; network clients and the warehouse loader live
//! in the sibling crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod normalize;
pub mod price;
pub mod record;
pub mod spending;
pub mod topology;
pub mod window;

pub use error::{CoreError, Result};
pub use normalize::{normalize, ReferenceData};
pub use price::{PriceEntry, PriceList, PriceTableRef};
pub use record::BillingRecord;
pub use spending::{InventoryKind, InventorySlices, InventoryUsage, SpendingDetail, SpendingEntry};
pub use topology::{VmInventory, VmRecord, VmTopology, VolumeInventory};
pub use window::BillingWindow;
