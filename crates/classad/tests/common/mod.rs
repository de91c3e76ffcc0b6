//! Common test utilities for classad integration tests.

use classad::{Record, TypeRegistry};

/// Parse a record from newline- or comma-separated assignments.
#[allow(dead_code)]
pub fn record_from(text: &str) -> Record {
    Record::parse(text).unwrap_or_else(|e| panic!("failed to parse record {:?}: {}", text, e))
}

/// Parse a record and tag it with `MyType`/`TargetType`.
#[allow(dead_code)]
pub fn typed_record(registry: &TypeRegistry, my_type: &str, target_type: &str, text: &str) -> Record {
    let mut record = record_from(text);
    record.set_my_type(registry, my_type);
    record.set_target_type(registry, target_type);
    record
}

/// Send `tracing` output to the test harness.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
