//! Warehouse client and loader for cloudmeter.
//!
//! The destination is an analytical warehouse reached over REST: table
//! metadata and creation, a query endpoint for the delete-by-date statement,
//! and a streaming-insert endpoint that reports per-row rejections. The
//! [`Loader`] wraps the client with the replace-by-date strategy: delete the
//! target date's rows (best-effort by default), then insert the new batch
//! with bounded retries on transient conditions.
//!
//! Transient-versus-fatal is a structured property of [`WarehouseError`],
//! set where the condition is detected; nothing upstream matches on error
//! message text.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod loader;
pub mod schema;

pub use client::{WarehouseClient, WarehouseTarget};
pub use error::WarehouseError;
pub use loader::{Loader, LoaderOptions};
