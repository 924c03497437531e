//! Descriptor trace files
//!
//! A trace is a JSON capture of one device enumeration: the attributes the
//! USB stack reported plus the parsed descriptors in arrival order.

use anyhow::{Context, Result};
use bastion_core::{Descriptor, FieldLimits, Rule};
use bastion_enumerate::{DeviceAttributes, DeviceSession};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default)]
    pub device: DeviceAttributes,
    #[serde(default)]
    pub descriptors: Vec<Descriptor>,
}

impl Trace {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace {}", path.display()))?;
        let trace: Trace = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse trace {}", path.display()))?;
        Ok(trace)
    }

    /// Replay the trace through a fresh session and build the device rule
    pub fn replay(&self, limits: FieldLimits, include_port: bool) -> Result<Rule> {
        let mut session = DeviceSession::with_limits(&self.device, limits)?;
        let count = session.ingest_all(&self.descriptors)?;
        let rule = session.rule(include_port)?;
        info!(
            descriptors = count,
            vendor_id = %rule.vendor_id,
            product_id = %rule.product_id,
            "Replayed descriptor trace"
        );
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::{DeviceError, Target};
    use bastion_enumerate::SessionError;
    use tempfile::TempDir;

    const STORAGE_TRACE: &str = r#"{
        "device": { "name": "Cruzer Blade", "serial_number": "4C530001", "port": "2-1" },
        "descriptors": [
            { "type": "device", "vendor_id": 1921, "product_id": 21863, "num_configurations": 1 },
            { "type": "configuration", "configuration_value": 1, "num_interfaces": 1 },
            { "type": "interface", "class": 8, "subclass": 6, "protocol": 80, "num_endpoints": 2 },
            { "type": "endpoint", "address": 129 },
            { "type": "endpoint", "address": 2 }
        ]
    }"#;

    fn write_trace(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("trace.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_replay_storage_device() {
        let temp_dir = TempDir::new().unwrap();
        let trace = Trace::from_file(&write_trace(&temp_dir, STORAGE_TRACE)).unwrap();
        assert_eq!(trace.descriptors.len(), 5);

        let rule = trace.replay(FieldLimits::default(), true).unwrap();
        assert_eq!(rule.target, Target::Unknown);
        assert_eq!(rule.vendor_id, "0781");
        assert_eq!(rule.product_id, "5567");
        assert_eq!(
            rule.to_string(),
            format!(
                "unknown id 0781:5567 serial \"4C530001\" name \"Cruzer Blade\" hash \"{}\" via-port \"2-1\" with-interface 08:06:50",
                rule.device_hash
            )
        );
    }

    #[test]
    fn test_replay_out_of_order_trace_fails() {
        let content = r#"{
            "device": { "port": "1-1" },
            "descriptors": [
                { "type": "device", "vendor_id": 1, "product_id": 2, "num_configurations": 1 },
                { "type": "endpoint", "address": 129 }
            ]
        }"#;
        let temp_dir = TempDir::new().unwrap();
        let trace = Trace::from_file(&write_trace(&temp_dir, content)).unwrap();

        let err = trace.replay(FieldLimits::default(), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SessionError>(),
            Some(SessionError::Device(DeviceError::MissingParent { .. }))
        ));
    }

    #[test]
    fn test_unreadable_trace() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_trace(&temp_dir, "{ not json");
        assert!(Trace::from_file(&path).is_err());
        assert!(Trace::from_file(&temp_dir.path().join("missing.json")).is_err());
    }
}
