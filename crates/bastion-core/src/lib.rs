//! Bastion Core - Device identity, descriptor ingestion and rule generation
//!
//! This crate models one physically attached USB device for an
//! authorization daemon:
//! - Identity record holding the device attributes with bounded setters
//! - Exclusive access guard serializing ingestion and rule generation
//! - Descriptor ingestion state machine enforcing the USB hierarchy
//! - Identity hash used as a stable device matching key
//! - Rule materialization for the policy engine

pub mod descriptor;
pub mod device;
pub mod error;
pub mod hash;
pub mod ingest;
pub mod record;
pub mod rule;

pub use descriptor::{
    ConfigurationDescriptor, Descriptor, DescriptorOracle, DescriptorType, DeviceDescriptor,
    EndpointDescriptor, InterfaceDescriptor,
};
pub use device::Device;
pub use error::{DeviceError, Field};
pub use hash::device_hash;
pub use ingest::IngestState;
pub use record::{DeviceRecord, FieldLimits};
pub use rule::{InterfaceType, InvalidValue, Rule, RuleSet, SetOperator, Target};
