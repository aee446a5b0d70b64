//! Raw spending payload from the upstream spending-calculation endpoint.
//!
//! The upstream response nests per-category spending entries, each with a
//! list of resource details, each of which may carry one or more
//! time-sliced inventory arrays (hourly CPU allocation changes, volume size
//! changes, and so on). The upstream names these arrays loosely
//! (`cpuInventory`, `sizeInventory`, ...), so deserialization folds every
//! array-of-objects field on a detail into a typed [`InventorySlices`] group:
//! known keys get a dedicated [`InventoryKind`], anything else lands in
//! [`InventoryKind::Other`] so future array keys are still carried through.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One upstream-reported spending aggregate for a category within the window.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingEntry {
    /// Spending category (e.g. `"vm"`, `"rootVolume"`).
    #[serde(default)]
    pub spending_type: Option<String>,

    /// Window start in epoch milliseconds, as reported upstream.
    #[serde(default)]
    pub date_start: Option<i64>,

    /// Window end in epoch milliseconds, as reported upstream.
    #[serde(default)]
    pub date_end: Option<i64>,

    /// Aggregate cost for the whole entry.
    #[serde(default)]
    pub spending: Option<f64>,

    /// Per-resource breakdown.
    #[serde(default)]
    pub details: Vec<SpendingDetail>,
}

/// One resource's share of a spending entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawDetail")]
pub struct SpendingDetail {
    /// Upstream resource identifier.
    pub resource_uuid: Option<String>,

    /// Human-readable resource name.
    pub resource_name: Option<String>,

    /// Resource type reported on the detail itself (`type` upstream).
    pub kind: Option<String>,

    /// Cost attributed to this detail.
    pub spending: Option<f64>,

    /// Time-sliced inventory arrays, one group per upstream array field.
    pub inventories: Vec<InventorySlices>,

    /// Remaining scalar fields, kept verbatim for diagnostics.
    pub extra: Map<String, Value>,
}

impl SpendingDetail {
    /// Rebuild the detail as it arrived on the wire, for the `raw_json`
    /// diagnostic column. Only called on details without inventory arrays,
    /// so `extra` plus the named fields is the full original object.
    #[must_use]
    pub fn to_diagnostic_json(&self) -> Value {
        let mut object = self.extra.clone();
        if let Some(uuid) = &self.resource_uuid {
            object.insert("resourceUuid".into(), Value::String(uuid.clone()));
        }
        if let Some(name) = &self.resource_name {
            object.insert("resourceName".into(), Value::String(name.clone()));
        }
        if let Some(kind) = &self.kind {
            object.insert("type".into(), Value::String(kind.clone()));
        }
        if let Some(spending) = self.spending {
            if let Some(number) = serde_json::Number::from_f64(spending) {
                object.insert("spending".into(), Value::Number(number));
            }
        }
        Value::Object(object)
    }
}

/// Wire shape of a detail; converted into [`SpendingDetail`] on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetail {
    #[serde(default)]
    resource_uuid: Option<String>,
    #[serde(default)]
    resource_name: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    spending: Option<f64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawDetail> for SpendingDetail {
    fn from(raw: RawDetail) -> Self {
        let mut inventories = Vec::new();
        let mut extra = Map::new();

        for (key, value) in raw.extra {
            match try_parse_slices(&key, &value) {
                Some(slices) => inventories.push(slices),
                None => {
                    extra.insert(key, value);
                }
            }
        }

        Self {
            resource_uuid: raw.resource_uuid,
            resource_name: raw.resource_name,
            kind: raw.kind,
            spending: raw.spending,
            inventories,
            extra,
        }
    }
}

/// Parse an array-of-objects field into an inventory group. Non-array and
/// non-object-element fields stay in `extra`.
fn try_parse_slices(key: &str, value: &Value) -> Option<InventorySlices> {
    let items = value.as_array()?;
    if !items.iter().all(Value::is_object) {
        return None;
    }

    let entries = items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect();

    Some(InventorySlices {
        kind: InventoryKind::from_key(key),
        key: key.to_string(),
        entries,
    })
}

/// One time-sliced inventory array on a detail.
#[derive(Debug, Clone)]
pub struct InventorySlices {
    /// The recognized kind of this array.
    pub kind: InventoryKind,

    /// The upstream field name the array arrived under.
    pub key: String,

    /// The slices themselves, in upstream order.
    pub entries: Vec<InventoryUsage>,
}

/// Recognized inventory-array kinds.
///
/// Unknown array fields are carried as [`InventoryKind::Other`] rather than
/// dropped, so newly introduced upstream breakdowns still produce records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryKind {
    /// CPU allocation slices (`cpuInventory`).
    Cpu,

    /// Memory allocation slices (`memoryInventory`).
    Memory,

    /// Volume size slices (`sizeInventory`).
    Size,

    /// Any other array field, keyed by its upstream name.
    Other(String),
}

impl InventoryKind {
    fn from_key(key: &str) -> Self {
        match key {
            "cpuInventory" => Self::Cpu,
            "memoryInventory" => Self::Memory,
            "sizeInventory" => Self::Size,
            _ => Self::Other(key.to_string()),
        }
    }

    /// Canonical price-table resource name for this kind, when one exists.
    #[must_use]
    pub fn canonical_resource(&self) -> Option<&'static str> {
        match self {
            Self::Cpu => Some("cpu"),
            Self::Memory => Some("memory"),
            Self::Size => Some("data volume"),
            Self::Other(_) => None,
        }
    }
}

/// One fine-grained usage slice within an inventory array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUsage {
    /// Slice start in epoch milliseconds.
    #[serde(default)]
    pub start_time: Option<i64>,

    /// Slice end in epoch milliseconds.
    #[serde(default)]
    pub end_time: Option<i64>,

    /// Cost attributed to this slice.
    #[serde(default)]
    pub spending: Option<f64>,

    /// Resource size in bytes, present on volume slices.
    #[serde(default)]
    pub size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_splits_inventory_arrays() {
        let detail: SpendingDetail = serde_json::from_value(json!({
            "resourceUuid": "vol-1",
            "resourceName": "data-volume-1",
            "type": "dataVolume",
            "spending": 0.48,
            "sizeInventory": [
                { "startTime": 1000, "endTime": 2000, "spending": 0.24, "size": 107_374_182_400_i64 },
                { "startTime": 2000, "endTime": 3000, "spending": 0.24, "size": 214_748_364_800_i64 }
            ],
            "note": "unrelated scalar"
        }))
        .unwrap();

        assert_eq!(detail.inventories.len(), 1);
        let slices = &detail.inventories[0];
        assert_eq!(slices.kind, InventoryKind::Size);
        assert_eq!(slices.key, "sizeInventory");
        assert_eq!(slices.entries.len(), 2);
        assert_eq!(slices.entries[1].size, Some(214_748_364_800));
        assert!(detail.extra.contains_key("note"));
    }

    #[test]
    fn unknown_array_key_becomes_other() {
        let detail: SpendingDetail = serde_json::from_value(json!({
            "resourceUuid": "x",
            "gpuInventory": [ { "startTime": 1, "endTime": 2, "spending": 0.1 } ]
        }))
        .unwrap();

        assert_eq!(detail.inventories.len(), 1);
        assert_eq!(
            detail.inventories[0].kind,
            InventoryKind::Other("gpuInventory".into())
        );
        assert!(detail.inventories[0].kind.canonical_resource().is_none());
    }

    #[test]
    fn scalar_arrays_stay_in_extra() {
        let detail: SpendingDetail = serde_json::from_value(json!({
            "resourceUuid": "x",
            "tags": ["a", "b"]
        }))
        .unwrap();

        assert!(detail.inventories.is_empty());
        assert!(detail.extra.contains_key("tags"));
    }

    #[test]
    fn diagnostic_json_round_trips_named_fields() {
        let detail: SpendingDetail = serde_json::from_value(json!({
            "resourceUuid": "vm-1",
            "resourceName": "web-1",
            "type": "vm",
            "spending": 1.5,
            "zoneUuid": "zone-a"
        }))
        .unwrap();

        let raw = detail.to_diagnostic_json();
        assert_eq!(raw["resourceUuid"], "vm-1");
        assert_eq!(raw["type"], "vm");
        assert_eq!(raw["zoneUuid"], "zone-a");
        assert!((raw["spending"].as_f64().unwrap() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entry_defaults_missing_fields() {
        let entry: SpendingEntry = serde_json::from_value(json!({
            "spendingType": "vm"
        }))
        .unwrap();

        assert_eq!(entry.spending_type.as_deref(), Some("vm"));
        assert!(entry.details.is_empty());
        assert!(entry.date_start.is_none());
    }
}
