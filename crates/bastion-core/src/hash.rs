//! Device identity hash
//!
//! The hash covers name, vendor ID, product ID and serial number, fed to
//! SHA-256 in that order as raw bytes with no separator. Port, ID, target
//! and interface types are not part of the identity, so moving a device to
//! another port or re-enumerating it keeps the same hash.

use sha2::{Digest, Sha256};

use crate::error::DeviceError;
use crate::record::DeviceRecord;

/// Compute the identity hash as lowercase hex
pub fn device_hash(
    name: &str,
    vendor_id: &str,
    product_id: &str,
    serial_number: &str,
) -> Result<String, DeviceError> {
    if vendor_id.is_empty() || product_id.is_empty() {
        return Err(DeviceError::IdentityIncomplete);
    }

    let mut hasher = Sha256::new();
    for field in [name, vendor_id, product_id, serial_number] {
        hasher.update(field.as_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}

impl DeviceRecord {
    /// Identity hash of the record's current attributes
    pub fn device_hash(&self) -> Result<String, DeviceError> {
        device_hash(
            self.name(),
            self.vendor_id(),
            self.product_id(),
            self.serial_number(),
        )
    }
}
