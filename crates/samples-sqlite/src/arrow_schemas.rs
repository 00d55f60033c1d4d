use arrow::datatypes::{DataType, Field, Schema};

pub fn samples_schema() -> Schema {
    Schema::new(vec![
        Field::new("sample_id", DataType::Int64, false),
        Field::new("target", DataType::Utf8, false),
        Field::new("reachable", DataType::Boolean, true),
        Field::new("tls_valid", DataType::Boolean, true),
        Field::new("tls_days_remaining", DataType::Int64, true),
        Field::new("tls_expires_at_ms", DataType::Int64, true),
        Field::new("observed_at_ms", DataType::Int64, false),
    ])
}
