//! Exclusive access guard around a device record
//!
//! Descriptor ingestion and rule generation may run on different threads.
//! Every composite operation takes the lock once and holds it for the
//! whole read or event, so a rule is never built from a half-applied event.

use std::sync::{Mutex, MutexGuard};

use crate::descriptor::{Descriptor, DescriptorOracle};
use crate::error::DeviceError;
use crate::record::{DeviceRecord, FieldLimits};
use crate::rule::Rule;

/// A device record together with its lock
#[derive(Debug, Default)]
pub struct Device {
    record: Mutex<DeviceRecord>,
}

impl Device {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: DeviceRecord) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }

    /// Rebuild a device from a stored rule
    pub fn from_rule(rule: &Rule) -> Result<Self, DeviceError> {
        Ok(Self::from_record(DeviceRecord::from_rule(rule)?))
    }

    pub fn from_rule_with_limits(rule: &Rule, limits: FieldLimits) -> Result<Self, DeviceError> {
        Ok(Self::from_record(DeviceRecord::from_rule_with_limits(
            rule, limits,
        )?))
    }

    /// Acquire exclusive access to the record.
    ///
    /// A lock poisoned by a panic mid-update is refused rather than
    /// recovered, since the record may hold a partial event.
    pub fn lock(&self) -> Result<MutexGuard<'_, DeviceRecord>, DeviceError> {
        self.record.lock().map_err(|_| DeviceError::Poisoned)
    }

    /// Copy of the record as of one point in time
    pub fn snapshot(&self) -> Result<DeviceRecord, DeviceError> {
        Ok(self.lock()?.clone())
    }

    pub fn device_hash(&self) -> Result<String, DeviceError> {
        self.lock()?.device_hash()
    }

    /// Generate a rule for the device; see [`DeviceRecord::to_rule`]
    pub fn rule(&self, include_port: bool) -> Result<Rule, DeviceError> {
        self.lock()?.to_rule(include_port)
    }

    /// Apply one descriptor event under a single acquisition.
    ///
    /// A rejected event marks the record failed in the same acquisition,
    /// after which further events and rule generation are refused.
    pub fn ingest(
        &self,
        oracle: &mut dyn DescriptorOracle,
        descriptor: &Descriptor,
    ) -> Result<(), DeviceError> {
        let mut record = self.lock()?;
        if record.is_failed() {
            return Err(DeviceError::EnumerationFailed);
        }
        let result = record.load_descriptor(oracle, descriptor);
        if result.is_err() {
            record.mark_failed();
        }
        result
    }
}
