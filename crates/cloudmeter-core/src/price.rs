//! Price table entries and the effective-interval lookup.

use serde::Deserialize;

/// A reference linking an account to its price table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTableRef {
    /// The account the table applies to.
    pub account_uuid: String,

    /// The table identifier.
    pub table_uuid: String,
}

/// One rate-card entry: the price for a named resource over an effective
/// interval.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    /// Resource name the price applies to (e.g. `"cpu"`, `"data volume"`).
    pub resource_name: String,

    /// Owning price table.
    #[serde(default)]
    pub table_uuid: Option<String>,

    /// Unit price.
    pub price: f64,

    /// Billing time unit, e.g. `"Hour"`.
    #[serde(default)]
    pub time_unit: Option<String>,

    /// Billing resource unit, e.g. `"GB"`.
    #[serde(default)]
    pub resource_unit: Option<String>,

    /// Start of the effective interval, epoch milliseconds.
    pub effective_from: i64,

    /// End of the effective interval, epoch milliseconds; open-ended when
    /// absent.
    #[serde(default)]
    pub effective_until: Option<i64>,
}

impl PriceEntry {
    /// Whether the effective interval covers the given timestamp.
    #[must_use]
    pub fn covers(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.effective_from
            && self
                .effective_until
                .map_or(true, |until| timestamp_ms < until)
    }

    /// Whether this entry bills per hour.
    #[must_use]
    pub fn is_hourly(&self) -> bool {
        self.time_unit
            .as_deref()
            .is_some_and(|unit| unit.eq_ignore_ascii_case("hour"))
    }

    /// Whether this entry bills per gigabyte.
    #[must_use]
    pub fn is_per_gigabyte(&self) -> bool {
        self.resource_unit
            .as_deref()
            .is_some_and(|unit| unit.eq_ignore_ascii_case("gb"))
    }
}

/// The price entries of one price table, with candidate-ordered lookup.
#[derive(Debug, Clone, Default)]
pub struct PriceList {
    entries: Vec<PriceEntry>,
}

impl PriceList {
    /// Build a list from entries already filtered to one table.
    #[must_use]
    pub fn new(entries: Vec<PriceEntry>) -> Self {
        Self { entries }
    }

    /// Build a list by filtering the full upstream price listing to one
    /// table.
    #[must_use]
    pub fn for_table(entries: Vec<PriceEntry>, table_uuid: &str) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|entry| entry.table_uuid.as_deref() == Some(table_uuid))
                .collect(),
        }
    }

    /// Whether the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the price for the first candidate resource name with an entry
    /// whose effective interval covers `timestamp_ms`.
    ///
    /// Overlapping intervals for the same resource are tolerated: the entry
    /// with the latest `effective_from` that still covers the timestamp wins.
    #[must_use]
    pub fn lookup(&self, candidates: &[&str], timestamp_ms: i64) -> Option<&PriceEntry> {
        candidates.iter().find_map(|candidate| {
            self.entries
                .iter()
                .filter(|entry| {
                    entry.resource_name.eq_ignore_ascii_case(candidate)
                        && entry.covers(timestamp_ms)
                })
                .max_by_key(|entry| entry.effective_from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, price: f64, from: i64, until: Option<i64>) -> PriceEntry {
        PriceEntry {
            resource_name: name.into(),
            table_uuid: Some("table-1".into()),
            price,
            time_unit: Some("Hour".into()),
            resource_unit: None,
            effective_from: from,
            effective_until: until,
        }
    }

    #[test]
    fn open_ended_entry_covers_later_timestamps() {
        let list = PriceList::new(vec![entry("cpu", 0.01, 1_000, None)]);
        let matched = list.lookup(&["cpu"], 2_000).unwrap();
        assert!((matched.price - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn entry_does_not_cover_before_effective_from() {
        let list = PriceList::new(vec![entry("cpu", 0.01, 5_000, None)]);
        assert!(list.lookup(&["cpu"], 4_999).is_none());
        assert!(list.lookup(&["cpu"], 5_000).is_some());
    }

    #[test]
    fn latest_effective_start_wins_on_overlap() {
        let list = PriceList::new(vec![
            entry("cpu", 0.01, 1_000, None),
            entry("cpu", 0.02, 2_000, None),
        ]);

        let matched = list.lookup(&["cpu"], 3_000).unwrap();
        assert!((matched.price - 0.02).abs() < f64::EPSILON);

        // Before the second interval opens, the first still applies.
        let matched = list.lookup(&["cpu"], 1_500).unwrap();
        assert!((matched.price - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn candidate_order_decides() {
        let list = PriceList::new(vec![
            entry("vm", 0.10, 0, None),
            entry("cpu", 0.01, 0, None),
        ]);

        let matched = list.lookup(&["missing", "vm", "cpu"], 1_000).unwrap();
        assert_eq!(matched.resource_name, "vm");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let list = PriceList::new(vec![entry("CPU", 0.01, 0, None)]);
        assert!(list.lookup(&["cpu"], 1).is_some());
    }

    #[test]
    fn for_table_filters_other_tables() {
        let mut other = entry("cpu", 0.05, 0, None);
        other.table_uuid = Some("table-2".into());

        let list = PriceList::for_table(vec![entry("cpu", 0.01, 0, None), other], "table-1");
        let matched = list.lookup(&["cpu"], 1).unwrap();
        assert!((matched.price - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn closed_interval_excludes_end() {
        let list = PriceList::new(vec![entry("cpu", 0.01, 1_000, Some(2_000))]);
        assert!(list.lookup(&["cpu"], 1_999).is_some());
        assert!(list.lookup(&["cpu"], 2_000).is_none());
    }
}
