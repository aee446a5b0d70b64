//! The usage normalizer: raw spending payload in, flat priced records out.
//!
//! This is a pure transform. Reference data (price list, VM topology) is
//! passed in explicitly and may be absent; missing reference data degrades
//! the derived usage quantity to `None`, it never blocks record emission.

use chrono::Utc;
use serde_json::Value;

use crate::price::{PriceEntry, PriceList};
use crate::record::BillingRecord;
use crate::spending::{SpendingDetail, SpendingEntry};
use crate::topology::{VmRecord, VmTopology};
use crate::window::BillingWindow;

const MS_PER_HOUR: f64 = 3_600_000.0;
const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Reference data consulted while normalizing. Both halves are best-effort;
/// either may be absent when the corresponding fetch failed.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    /// The account's price list, when the price-table fetch succeeded.
    pub prices: Option<PriceList>,

    /// VM inventory with the volume reverse index, when the fetch succeeded.
    pub topology: Option<VmTopology>,
}

impl ReferenceData {
    /// Reference data with nothing resolved.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Flatten the upstream spending payload into warehouse records.
///
/// One record per inventory slice when a detail carries inventory arrays,
/// otherwise exactly one record for the whole detail with the raw detail
/// attached as a diagnostic payload.
#[must_use]
pub fn normalize(
    entries: &[SpendingEntry],
    window: &BillingWindow,
    account_id: &str,
    refs: &ReferenceData,
) -> Vec<BillingRecord> {
    let mut records = Vec::new();
    for entry in entries {
        for detail in &entry.details {
            emit_detail(entry, detail, window, account_id, refs, &mut records);
        }
    }
    records
}

fn emit_detail(
    entry: &SpendingEntry,
    detail: &SpendingDetail,
    window: &BillingWindow,
    account_id: &str,
    refs: &ReferenceData,
    out: &mut Vec<BillingRecord>,
) {
    let resource_type = detail.kind.clone().or_else(|| entry.spending_type.clone());
    let vm = resolve_vm(detail, resource_type.as_deref(), refs.topology.as_ref());

    let base = RecordBase {
        window,
        account_id,
        entry,
        detail,
        resource_type: resource_type.as_deref(),
        vm,
        prices: refs.prices.as_ref(),
    };

    if detail.inventories.is_empty() {
        let start = entry.date_start.unwrap_or(window.start_ms);
        let end = entry.date_end.unwrap_or(window.end_ms);
        let cost = detail.spending.or(entry.spending).unwrap_or(0.0);

        out.push(base.build(
            start,
            end,
            cost,
            None,
            CandidateExtra::default(),
            Some(detail.to_diagnostic_json()),
        ));
        return;
    }

    for slices in &detail.inventories {
        let canonical = slices.kind.canonical_resource();
        for usage in &slices.entries {
            let start = usage
                .start_time
                .or(entry.date_start)
                .unwrap_or(window.start_ms);
            let end = usage.end_time.or(entry.date_end).unwrap_or(window.end_ms);
            let cost = usage.spending.or(detail.spending).unwrap_or(0.0);

            out.push(base.build(
                start,
                end,
                cost,
                Some(slices.key.as_str()),
                CandidateExtra {
                    canonical,
                    slice_size: usage.size,
                },
                None,
            ));
        }
    }
}

/// CPU and memory context comes from the VM record: directly for VM-typed
/// details, via the volume reverse index for everything else.
fn resolve_vm<'a>(
    detail: &SpendingDetail,
    resource_type: Option<&str>,
    topology: Option<&'a VmTopology>,
) -> Option<&'a VmRecord> {
    let topology = topology?;
    let resource_id = detail.resource_uuid.as_deref()?;

    if resource_type.is_some_and(|kind| kind.eq_ignore_ascii_case("vm")) {
        topology.vm(resource_id)
    } else {
        topology.vm_for_volume(resource_id)
    }
}

/// Fields shared by every record a detail emits.
struct RecordBase<'a> {
    window: &'a BillingWindow,
    account_id: &'a str,
    entry: &'a SpendingEntry,
    detail: &'a SpendingDetail,
    resource_type: Option<&'a str>,
    vm: Option<&'a VmRecord>,
    prices: Option<&'a PriceList>,
}

/// Per-slice additions to the price-candidate list and size context.
#[derive(Default)]
struct CandidateExtra {
    canonical: Option<&'static str>,
    slice_size: Option<i64>,
}

impl RecordBase<'_> {
    fn build(
        &self,
        start_ms: i64,
        end_ms: i64,
        cost: f64,
        inventory_type: Option<&str>,
        extra: CandidateExtra,
        raw: Option<Value>,
    ) -> BillingRecord {
        let mut candidates: Vec<&str> = Vec::with_capacity(3);
        if let Some(kind) = self.resource_type {
            candidates.push(kind);
        }
        if let Some(spending_type) = self.entry.spending_type.as_deref() {
            candidates.push(spending_type);
        }
        if let Some(canonical) = extra.canonical {
            candidates.push(canonical);
        }

        let matched = self
            .prices
            .and_then(|prices| prices.lookup(&candidates, start_ms));
        let (resource_used, resource_unit) = match matched {
            Some(price) => derive_usage(
                price,
                start_ms,
                end_ms,
                cost,
                self.vm,
                self.detail.resource_uuid.as_deref(),
                extra.slice_size,
            ),
            None => (None, None),
        };

        BillingRecord {
            billing_date: self.window.date,
            account_id: self.account_id.to_string(),
            resource_id: self.detail.resource_uuid.clone(),
            resource_name: self.detail.resource_name.clone(),
            spending_type: self.entry.spending_type.clone(),
            resource_type: self.resource_type.map(str::to_string),
            cpu_core: self.vm.and_then(|vm| vm.cpu_num),
            memory: self.vm.and_then(|vm| vm.memory_bytes),
            inventory_type: inventory_type.map(str::to_string),
            resource_used,
            resource_unit,
            cost,
            date_start_ms: start_ms,
            date_end_ms: end_ms,
            raw_json: raw.map(|value| value.to_string()),
            collected_at: Utc::now(),
        }
    }
}

/// Turn a matched price into a usage quantity and unit.
///
/// Per-hour CPU yields vCPU-hours (hours times the VM's CPU count, default
/// 1). Per-hour per-GB yields GB-hours from the slice size or the VM's
/// volume map. Anything else falls back to `cost / price` with the entry's
/// declared unit — preserved from the source system even though the
/// resulting quantity's unit can be inconsistent with physical units.
#[allow(clippy::cast_precision_loss)]
fn derive_usage(
    price: &PriceEntry,
    start_ms: i64,
    end_ms: i64,
    cost: f64,
    vm: Option<&VmRecord>,
    resource_id: Option<&str>,
    slice_size: Option<i64>,
) -> (Option<f64>, Option<String>) {
    if price.is_hourly() {
        let hours = (end_ms - start_ms).max(0) as f64 / MS_PER_HOUR;

        if price.resource_name.eq_ignore_ascii_case("cpu") {
            let cpu = vm.and_then(|vm| vm.cpu_num).unwrap_or(1);
            return (Some(hours * cpu as f64), Some("vCPU-hour".to_string()));
        }

        if price.is_per_gigabyte() {
            let size = slice_size.or_else(|| {
                vm.zip(resource_id)
                    .and_then(|(vm, id)| vm.volumes.get(id).copied())
            });
            if let Some(size) = size {
                let gigabytes = size as f64 / BYTES_PER_GB;
                return (Some(gigabytes * hours), Some("GB-hour".to_string()));
            }
        }
    }

    if price.price == 0.0 {
        return (None, None);
    }
    (Some(cost / price.price), price.resource_unit.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::VmInventory;
    use chrono::{FixedOffset, NaiveDate};
    use serde_json::json;

    const HOUR_MS: i64 = 3_600_000;

    fn window() -> BillingWindow {
        BillingWindow::for_date(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    fn price(name: &str, price: f64, time_unit: Option<&str>, resource_unit: Option<&str>) -> PriceEntry {
        serde_json::from_value(json!({
            "resourceName": name,
            "tableUuid": "table-1",
            "price": price,
            "timeUnit": time_unit,
            "resourceUnit": resource_unit,
            "effectiveFrom": 0
        }))
        .unwrap()
    }

    fn topology_with_vm() -> VmTopology {
        let inventory: Vec<VmInventory> = serde_json::from_value(json!([{
            "uuid": "vm-1",
            "cpuNum": 2,
            "memorySize": 4_294_967_296_i64,
            "allVolumes": [ { "uuid": "vol-1", "size": 107_374_182_400_i64 } ]
        }]))
        .unwrap();
        VmTopology::from_inventory(inventory)
    }

    fn entries(value: serde_json::Value) -> Vec<SpendingEntry> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn detail_with_two_inventory_arrays_emits_two_records() {
        let spending = entries(json!([{
            "spendingType": "vm",
            "details": [{
                "resourceUuid": "vm-1",
                "resourceName": "web-1",
                "type": "vm",
                "spending": 1.0,
                "cpuInventory": [ { "startTime": 0, "endTime": HOUR_MS, "spending": 0.5 } ],
                "memoryInventory": [ { "startTime": 0, "endTime": HOUR_MS, "spending": 0.5 } ]
            }]
        }]));

        let records = normalize(&spending, &window(), "acct", &ReferenceData::empty());

        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.resource_id.as_deref(), Some("vm-1"));
            assert_eq!(record.resource_name.as_deref(), Some("web-1"));
            assert_eq!(record.spending_type.as_deref(), Some("vm"));
            assert_eq!(record.resource_type.as_deref(), Some("vm"));
        }
        let kinds: Vec<_> = records
            .iter()
            .map(|r| r.inventory_type.clone().unwrap())
            .collect();
        assert_eq!(kinds, ["cpuInventory", "memoryInventory"]);
    }

    #[test]
    fn detail_without_inventories_emits_single_record_with_raw_json() {
        let spending = entries(json!([{
            "spendingType": "snapshot",
            "spending": 0.3,
            "dateStart": 100, "dateEnd": 200,
            "details": [{ "resourceUuid": "snap-1", "spending": 0.3 }]
        }]));

        let records = normalize(&spending, &window(), "acct", &ReferenceData::empty());

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!((record.cost - 0.3).abs() < f64::EPSILON);
        assert_eq!(record.date_start_ms, 100);
        assert_eq!(record.date_end_ms, 200);
        assert!(record.inventory_type.is_none());
        let raw: Value = serde_json::from_str(record.raw_json.as_ref().unwrap()).unwrap();
        assert_eq!(raw["resourceUuid"], "snap-1");
    }

    #[test]
    fn cpu_usage_scales_by_vcpu_count() {
        let refs = ReferenceData {
            prices: Some(PriceList::new(vec![price("cpu", 0.01, Some("Hour"), None)])),
            topology: Some(topology_with_vm()),
        };

        // 2-vCPU VM over a 2-hour slice: 4 vCPU-hours.
        let spending = entries(json!([{
            "spendingType": "vm",
            "details": [{
                "resourceUuid": "vm-1",
                "type": "vm",
                "cpuInventory": [ { "startTime": 0, "endTime": 2 * HOUR_MS, "spending": 0.04 } ]
            }]
        }]));

        let records = normalize(&spending, &window(), "acct", &refs);
        let record = &records[0];

        assert_eq!(record.resource_used, Some(4.0));
        assert_eq!(record.resource_unit.as_deref(), Some("vCPU-hour"));
        assert_eq!(record.cpu_core, Some(2));
        // Cost comes from upstream, unaffected by the derived quantity.
        assert!((record.cost - 0.04).abs() < f64::EPSILON);
    }

    #[test]
    fn volume_usage_yields_gb_hours_from_slice_size() {
        let refs = ReferenceData {
            prices: Some(PriceList::new(vec![price(
                "data volume",
                0.001,
                Some("Hour"),
                Some("GB"),
            )])),
            topology: Some(topology_with_vm()),
        };

        let spending = entries(json!([{
            "spendingType": "dataVolume",
            "details": [{
                "resourceUuid": "vol-1",
                "type": "dataVolume",
                "sizeInventory": [{
                    "startTime": 0, "endTime": HOUR_MS,
                    "spending": 0.1, "size": 107_374_182_400_i64
                }]
            }]
        }]));

        let records = normalize(&spending, &window(), "acct", &refs);
        let record = &records[0];

        // 100 GB for one hour.
        assert_eq!(record.resource_used, Some(100.0));
        assert_eq!(record.resource_unit.as_deref(), Some("GB-hour"));
        // Volume resolves to its owning VM through the reverse index.
        assert_eq!(record.cpu_core, Some(2));
    }

    #[test]
    fn volume_size_falls_back_to_vm_volume_map() {
        let refs = ReferenceData {
            prices: Some(PriceList::new(vec![price(
                "data volume",
                0.001,
                Some("Hour"),
                Some("GB"),
            )])),
            topology: Some(topology_with_vm()),
        };

        let spending = entries(json!([{
            "spendingType": "dataVolume",
            "details": [{
                "resourceUuid": "vol-1",
                "type": "dataVolume",
                "sizeInventory": [ { "startTime": 0, "endTime": HOUR_MS, "spending": 0.1 } ]
            }]
        }]));

        let records = normalize(&spending, &window(), "acct", &refs);
        assert_eq!(records[0].resource_used, Some(100.0));
    }

    #[test]
    fn unmatched_price_leaves_usage_null() {
        let refs = ReferenceData {
            prices: Some(PriceList::new(vec![price("cpu", 0.01, Some("Hour"), None)])),
            topology: None,
        };

        let spending = entries(json!([{
            "spendingType": "snapshot",
            "details": [{ "resourceUuid": "snap-1", "spending": 0.5 }]
        }]));

        let records = normalize(&spending, &window(), "acct", &refs);
        let record = &records[0];

        assert!(record.resource_used.is_none());
        assert!(record.resource_unit.is_none());
        assert!((record.cost - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn non_hourly_price_falls_back_to_cost_over_price() {
        let refs = ReferenceData {
            prices: Some(PriceList::new(vec![price(
                "snapshot",
                0.05,
                None,
                Some("GB"),
            )])),
            topology: None,
        };

        let spending = entries(json!([{
            "spendingType": "snapshot",
            "details": [{ "resourceUuid": "snap-1", "spending": 0.5 }]
        }]));

        let records = normalize(&spending, &window(), "acct", &refs);
        let record = &records[0];

        assert_eq!(record.resource_used, Some(10.0));
        assert_eq!(record.resource_unit.as_deref(), Some("GB"));
    }

    #[test]
    fn inventory_kind_canonical_name_is_last_candidate() {
        // No "dataVolume" price, but a "data volume" canonical entry exists.
        let refs = ReferenceData {
            prices: Some(PriceList::new(vec![price(
                "data volume",
                0.001,
                Some("Hour"),
                Some("GB"),
            )])),
            topology: None,
        };

        let spending = entries(json!([{
            "spendingType": "dataVolume",
            "details": [{
                "resourceUuid": "vol-x",
                "type": "dataVolume",
                "sizeInventory": [{
                    "startTime": 0, "endTime": HOUR_MS,
                    "spending": 0.1, "size": 1_073_741_824_i64
                }]
            }]
        }]));

        let records = normalize(&spending, &window(), "acct", &refs);
        assert_eq!(records[0].resource_used, Some(1.0));
        assert_eq!(records[0].resource_unit.as_deref(), Some("GB-hour"));
    }

    #[test]
    fn slice_times_fall_back_to_entry_then_window() {
        let w = window();
        let spending = entries(json!([{
            "spendingType": "vm",
            "dateStart": 5_000,
            "details": [{
                "resourceUuid": "vm-1",
                "type": "vm",
                "cpuInventory": [ { "spending": 0.1 } ]
            }]
        }]));

        let records = normalize(&spending, &w, "acct", &ReferenceData::empty());
        assert_eq!(records[0].date_start_ms, 5_000);
        assert_eq!(records[0].date_end_ms, w.end_ms);
    }

    #[test]
    fn resource_type_falls_back_to_spending_type() {
        let spending = entries(json!([{
            "spendingType": "rootVolume",
            "details": [{ "resourceUuid": "vol-9", "spending": 0.2 }]
        }]));

        let records = normalize(&spending, &window(), "acct", &ReferenceData::empty());
        assert_eq!(records[0].resource_type.as_deref(), Some("rootVolume"));
    }

    #[test]
    fn zero_price_yields_null_usage() {
        let refs = ReferenceData {
            prices: Some(PriceList::new(vec![price("snapshot", 0.0, None, None)])),
            topology: None,
        };

        let spending = entries(json!([{
            "spendingType": "snapshot",
            "details": [{ "resourceUuid": "snap-1", "spending": 0.5 }]
        }]));

        let records = normalize(&spending, &window(), "acct", &refs);
        assert!(records[0].resource_used.is_none());
        assert!(records[0].resource_unit.is_none());
    }
}
