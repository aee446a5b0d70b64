//! The fixed destination table schema.
//!
//! One table, day-partitioned on `billing_date`; columns match
//! [`cloudmeter_core::BillingRecord`] field for field.

use serde_json::{json, Value};

/// The partition column.
pub const PARTITION_FIELD: &str = "billing_date";

/// Column definitions: name, warehouse type, nullable.
pub const FIELDS: &[(&str, &str, bool)] = &[
    ("billing_date", "DATE", false),
    ("account_id", "STRING", false),
    ("resource_id", "STRING", true),
    ("resource_name", "STRING", true),
    ("spending_type", "STRING", true),
    ("resource_type", "STRING", true),
    ("cpu_core", "INTEGER", true),
    ("memory", "INTEGER", true),
    ("inventory_type", "STRING", true),
    ("resource_used", "FLOAT", true),
    ("resource_unit", "STRING", true),
    ("cost", "FLOAT", false),
    ("date_start_ms", "INTEGER", false),
    ("date_end_ms", "INTEGER", false),
    ("raw_json", "STRING", true),
    ("collected_at", "TIMESTAMP", false),
];

/// The schema as the table-creation endpoint expects it.
#[must_use]
pub fn fields_json() -> Value {
    Value::Array(
        FIELDS
            .iter()
            .map(|(name, field_type, nullable)| {
                json!({
                    "name": name,
                    "type": field_type,
                    "mode": if *nullable { "NULLABLE" } else { "REQUIRED" },
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_covers_all_record_columns() {
        assert_eq!(FIELDS.len(), 16);
        assert!(FIELDS.iter().any(|(name, _, _)| *name == PARTITION_FIELD));
    }

    #[test]
    fn partition_field_is_required_date() {
        let (_, field_type, nullable) = FIELDS
            .iter()
            .find(|(name, _, _)| *name == PARTITION_FIELD)
            .unwrap();
        assert_eq!(*field_type, "DATE");
        assert!(!nullable);
    }

    #[test]
    fn fields_json_shape() {
        let fields = fields_json();
        let first = &fields.as_array().unwrap()[0];
        assert_eq!(first["name"], "billing_date");
        assert_eq!(first["mode"], "REQUIRED");
    }
}
