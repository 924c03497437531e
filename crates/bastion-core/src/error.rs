//! Error types shared by the record, ingestion and rule paths

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::DescriptorType;

/// Bounded text field of a device record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    VendorId,
    ProductId,
    SerialNumber,
    Port,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Name => "name",
            Field::VendorId => "vendor_id",
            Field::ProductId => "product_id",
            Field::SerialNumber => "serial_number",
            Field::Port => "port",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Value for {field} is {actual} bytes, maximum is {max}")]
    Validation {
        field: Field,
        max: usize,
        actual: usize,
    },
    #[error("Invalid descriptor data: multiple {0} descriptors for one device")]
    DuplicateDescriptor(DescriptorType),
    #[error("Invalid descriptor data: missing parent {parent} descriptor while loading {child}")]
    MissingParent {
        child: DescriptorType,
        parent: DescriptorType,
    },
    #[error("Cannot compute device hash: vendor ID and/or product ID empty")]
    IdentityIncomplete,
    #[error("Device enumeration failed, device is not identified")]
    EnumerationFailed,
    #[error("Device record lock poisoned")]
    Poisoned,
}

impl DeviceError {
    /// Whether the error means the descriptor stream itself is malformed
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DeviceError::DuplicateDescriptor(_) | DeviceError::MissingParent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DeviceError::Validation {
            field: Field::VendorId,
            max: 4,
            actual: 5,
        };
        assert_eq!(err.to_string(), "Value for vendor_id is 5 bytes, maximum is 4");

        let err = DeviceError::MissingParent {
            child: DescriptorType::Interface,
            parent: DescriptorType::Configuration,
        };
        assert_eq!(
            err.to_string(),
            "Invalid descriptor data: missing parent configuration descriptor while loading interface"
        );
    }

    #[test]
    fn test_structural_classification() {
        assert!(DeviceError::DuplicateDescriptor(DescriptorType::Device).is_structural());
        assert!(!DeviceError::IdentityIncomplete.is_structural());
        assert!(!DeviceError::Poisoned.is_structural());
        assert!(!DeviceError::EnumerationFailed.is_structural());
    }
}
