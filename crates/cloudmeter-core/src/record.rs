//! The normalized warehouse row.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One flat, priced usage record destined for the warehouse table.
///
/// Field names match the destination column names; serializing a record
/// yields the row object the streaming-insert endpoint expects.
///
/// `cost` is always populated from upstream. `resource_used` and
/// `resource_unit` are populated only when a price entry matched and a unit
/// rule applied; otherwise both are `None` — an explicit "unknown price"
/// signal, never a guessed quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecord {
    /// Calendar day the record belongs to; the table's partition column.
    pub billing_date: NaiveDate,

    /// Account the spending belongs to.
    pub account_id: String,

    /// Upstream resource identifier.
    pub resource_id: Option<String>,

    /// Human-readable resource name.
    pub resource_name: Option<String>,

    /// Spending category from the parent entry.
    pub spending_type: Option<String>,

    /// Resource type from the detail, falling back to the spending type.
    pub resource_type: Option<String>,

    /// CPU count of the associated VM, when resolved.
    pub cpu_core: Option<i64>,

    /// Memory in bytes of the associated VM, when resolved.
    pub memory: Option<i64>,

    /// Upstream inventory-array field the record came from, when any.
    pub inventory_type: Option<String>,

    /// Derived usage quantity, when a price and unit rule matched.
    pub resource_used: Option<f64>,

    /// Unit of `resource_used` (e.g. `"vCPU-hour"`, `"GB-hour"`).
    pub resource_unit: Option<String>,

    /// Cost as reported upstream.
    pub cost: f64,

    /// Usage interval start, epoch milliseconds.
    pub date_start_ms: i64,

    /// Usage interval end, epoch milliseconds.
    pub date_end_ms: i64,

    /// Raw detail JSON for diagnostics, on records without inventory slices.
    pub raw_json: Option<String>,

    /// When this record was collected.
    pub collected_at: DateTime<Utc>,
}
