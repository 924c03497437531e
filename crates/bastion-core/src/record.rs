//! Device identity record
//!
//! The mutable attribute set for one attached device. Every text setter
//! checks its bound before touching the stored value, so a record never
//! holds an out-of-range field.

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Field};
use crate::rule::{InterfaceType, Rule, Target};

pub const USB_GENERIC_STRING_MAX_LENGTH: usize = 126;
pub const USB_VID_STRING_MAX_LENGTH: usize = 4;
pub const USB_PID_STRING_MAX_LENGTH: usize = 4;
/// Port strings are sysfs device paths, bounded like any filesystem path
pub const USB_PORT_STRING_MAX_LENGTH: usize = 4096;

/// Maximum byte length of each bounded text field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLimits {
    /// Bound for the device name and serial number
    #[serde(default = "default_generic")]
    pub generic_string: usize,
    #[serde(default = "default_vendor_id")]
    pub vendor_id: usize,
    #[serde(default = "default_product_id")]
    pub product_id: usize,
    #[serde(default = "default_port")]
    pub port: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            generic_string: default_generic(),
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            port: default_port(),
        }
    }
}

fn default_generic() -> usize {
    USB_GENERIC_STRING_MAX_LENGTH
}

fn default_vendor_id() -> usize {
    USB_VID_STRING_MAX_LENGTH
}

fn default_product_id() -> usize {
    USB_PID_STRING_MAX_LENGTH
}

fn default_port() -> usize {
    USB_PORT_STRING_MAX_LENGTH
}

impl FieldLimits {
    pub fn max_for(&self, field: Field) -> usize {
        match field {
            Field::Name | Field::SerialNumber => self.generic_string,
            Field::VendorId => self.vendor_id,
            Field::ProductId => self.product_id,
            Field::Port => self.port,
        }
    }

    /// Check a candidate value against the bound for `field`
    pub fn check(&self, field: Field, value: &str) -> Result<(), DeviceError> {
        let max = self.max_for(field);
        if value.len() > max {
            return Err(DeviceError::Validation {
                field,
                max,
                actual: value.len(),
            });
        }
        Ok(())
    }
}

/// Identity and capability attributes of one physical device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    id: u32,
    target: Target,
    name: String,
    vendor_id: String,
    product_id: String,
    serial_number: String,
    port: String,
    interface_types: Vec<InterfaceType>,
    num_configurations: i32,
    limits: FieldLimits,
    failed: bool,
}

impl Default for DeviceRecord {
    fn default() -> Self {
        Self::with_limits(FieldLimits::default())
    }
}

impl DeviceRecord {
    /// Create an empty record for a fresh enumeration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record with custom field bounds
    pub fn with_limits(limits: FieldLimits) -> Self {
        Self {
            id: Rule::DEFAULT_ID,
            target: Target::Unknown,
            name: String::new(),
            vendor_id: String::new(),
            product_id: String::new(),
            serial_number: String::new(),
            port: String::new(),
            interface_types: Vec::new(),
            num_configurations: -1,
            limits,
            failed: false,
        }
    }

    /// Rebuild a record from a device rule (policy replay).
    ///
    /// A device rule carries at most one port; the first entry of the port
    /// set is used and an empty set leaves the port empty.
    pub fn from_rule(rule: &Rule) -> Result<Self, DeviceError> {
        Self::from_rule_with_limits(rule, FieldLimits::default())
    }

    /// Rebuild a record from a device rule, checking fields against `limits`
    pub fn from_rule_with_limits(rule: &Rule, limits: FieldLimits) -> Result<Self, DeviceError> {
        let mut record = Self::with_limits(limits);
        record.set_id(rule.id);
        record.set_target(rule.target);
        record.set_name(&rule.device_name)?;
        record.set_vendor_id(&rule.vendor_id)?;
        record.set_product_id(&rule.product_id)?;
        record.set_serial_number(&rule.serial_number)?;
        if let Some(port) = rule.device_ports.values.first() {
            record.set_port(port)?;
        }
        record.interface_types = rule.interface_types.values.clone();
        record.num_configurations = rule.device_configurations;
        Ok(record)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor_id(&self) -> &str {
        &self.vendor_id
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn interface_types(&self) -> &[InterfaceType] {
        &self.interface_types
    }

    /// Number of configurations reported by the device descriptor, -1 if unknown
    pub fn num_configurations(&self) -> i32 {
        self.num_configurations
    }

    pub fn limits(&self) -> FieldLimits {
        self.limits
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), DeviceError> {
        self.limits.check(Field::Name, name)?;
        self.name = name.to_string();
        Ok(())
    }

    pub fn set_vendor_id(&mut self, vendor_id: &str) -> Result<(), DeviceError> {
        self.limits.check(Field::VendorId, vendor_id)?;
        self.vendor_id = vendor_id.to_string();
        Ok(())
    }

    pub fn set_product_id(&mut self, product_id: &str) -> Result<(), DeviceError> {
        self.limits.check(Field::ProductId, product_id)?;
        self.product_id = product_id.to_string();
        Ok(())
    }

    pub fn set_serial_number(&mut self, serial_number: &str) -> Result<(), DeviceError> {
        self.limits.check(Field::SerialNumber, serial_number)?;
        self.serial_number = serial_number.to_string();
        Ok(())
    }

    pub fn set_port(&mut self, port: &str) -> Result<(), DeviceError> {
        self.limits.check(Field::Port, port)?;
        self.port = port.to_string();
        Ok(())
    }

    /// Whether enumeration of this device was abandoned
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Mark the device as not identified; rule generation is refused from
    /// here on and the mark is never cleared
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    pub(crate) fn set_num_configurations(&mut self, num_configurations: i32) {
        self.num_configurations = num_configurations;
    }

    /// In-place access for the ingestion state machine
    pub(crate) fn interface_types_mut(&mut self) -> &mut Vec<InterfaceType> {
        &mut self.interface_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RuleSet, SetOperator};

    #[test]
    fn test_new_record_defaults() {
        let record = DeviceRecord::new();
        assert_eq!(record.id(), Rule::DEFAULT_ID);
        assert_eq!(record.target(), Target::Unknown);
        assert_eq!(record.num_configurations(), -1);
        assert!(record.interface_types().is_empty());
        assert!(record.vendor_id().is_empty());
    }

    #[test]
    fn test_setter_rejects_oversized_value() {
        let mut record = DeviceRecord::new();
        record.set_vendor_id("1d6b").unwrap();

        let err = record.set_vendor_id("1d6b0").unwrap_err();
        assert_eq!(
            err,
            DeviceError::Validation {
                field: Field::VendorId,
                max: 4,
                actual: 5
            }
        );
        assert_eq!(record.vendor_id(), "1d6b");
    }

    #[test]
    fn test_every_bound_is_enforced() {
        let mut record = DeviceRecord::new();
        let long = "x".repeat(USB_GENERIC_STRING_MAX_LENGTH + 1);

        assert!(record.set_name(&long).is_err());
        assert!(record.set_serial_number(&long).is_err());
        assert!(record.set_product_id("00001").is_err());
        assert!(record
            .set_port(&"1".repeat(USB_PORT_STRING_MAX_LENGTH + 1))
            .is_err());

        assert_eq!(record, DeviceRecord::new());

        // Exactly at the bound is accepted
        let max_name = "x".repeat(USB_GENERIC_STRING_MAX_LENGTH);
        record.set_name(&max_name).unwrap();
        record.set_port(&"1".repeat(USB_PORT_STRING_MAX_LENGTH)).unwrap();
        assert_eq!(record.name(), max_name);
    }

    #[test]
    fn test_deep_hub_ports_accepted() {
        let mut record = DeviceRecord::new();
        for port in ["1-1.4.2.3", "10-1.2.3", "3-2.1.4.1.2.3.1"] {
            record.set_port(port).unwrap();
            assert_eq!(record.port(), port);
        }
    }

    #[test]
    fn test_custom_limits() {
        let limits = FieldLimits {
            generic_string: 8,
            ..FieldLimits::default()
        };
        let mut record = DeviceRecord::with_limits(limits);
        assert!(record.set_name("Keyboard").is_ok());
        assert!(record.set_name("Keyboard2").is_err());
        assert_eq!(record.name(), "Keyboard");
    }

    #[test]
    fn test_clone_copies_id_and_target() {
        let mut record = DeviceRecord::new();
        record.set_id(7);
        record.set_target(Target::Allow);
        record.set_name("Flash Drive").unwrap();

        let copy = record.clone();
        assert_eq!(copy.id(), 7);
        assert_eq!(copy.target(), Target::Allow);
        assert_eq!(copy, record);
    }

    #[test]
    fn test_from_rule() {
        let rule = Rule {
            id: 12,
            target: Target::Block,
            vendor_id: "0781".to_string(),
            product_id: "5567".to_string(),
            serial_number: "4C530001".to_string(),
            device_name: "Cruzer Blade".to_string(),
            device_ports: RuleSet::new(SetOperator::OneOf, vec!["1-4".to_string(), "2-1".to_string()]),
            interface_types: RuleSet::equals(vec![InterfaceType::new(0x08, 0x06, 0x50)]),
            device_configurations: 1,
            ..Rule::default()
        };

        let record = DeviceRecord::from_rule(&rule).unwrap();
        assert_eq!(record.id(), 12);
        assert_eq!(record.target(), Target::Block);
        assert_eq!(record.port(), "1-4");
        assert_eq!(record.interface_types().len(), 1);
        assert_eq!(record.num_configurations(), 1);
    }

    #[test]
    fn test_from_rule_without_port() {
        let rule = Rule {
            vendor_id: "046d".to_string(),
            product_id: "c52b".to_string(),
            ..Rule::default()
        };
        let record = DeviceRecord::from_rule(&rule).unwrap();
        assert_eq!(record.port(), "");
    }

    #[test]
    fn test_from_rule_with_limits() {
        let rule = Rule {
            vendor_id: "046d".to_string(),
            product_id: "c52b".to_string(),
            device_name: "Unifying Receiver".to_string(),
            ..Rule::default()
        };
        let limits = FieldLimits {
            generic_string: 8,
            ..FieldLimits::default()
        };

        assert!(matches!(
            DeviceRecord::from_rule_with_limits(&rule, limits),
            Err(DeviceError::Validation {
                field: Field::Name,
                max: 8,
                ..
            })
        ));

        let record = DeviceRecord::from_rule_with_limits(&rule, FieldLimits::default()).unwrap();
        assert_eq!(record.limits(), FieldLimits::default());
        assert!(!record.is_failed());
    }

    #[test]
    fn test_from_rule_rejects_oversized_field() {
        let rule = Rule {
            vendor_id: "046d1".to_string(),
            ..Rule::default()
        };
        assert!(matches!(
            DeviceRecord::from_rule(&rule),
            Err(DeviceError::Validation {
                field: Field::VendorId,
                ..
            })
        ));
    }
}
