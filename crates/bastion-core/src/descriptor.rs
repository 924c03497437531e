//! Typed USB descriptor records
//!
//! These are the records handed over by the descriptor parser after it has
//! validated the raw bytes. Nothing in this crate looks at descriptor bytes.

use serde::{Deserialize, Serialize};

/// USB descriptor type codes (USB 2.0 table 9-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorType {
    Device,
    Configuration,
    Interface,
    Endpoint,
}

impl DescriptorType {
    /// The `bDescriptorType` value on the wire
    pub fn code(self) -> u8 {
        match self {
            DescriptorType::Device => 0x01,
            DescriptorType::Configuration => 0x02,
            DescriptorType::Interface => 0x04,
            DescriptorType::Endpoint => 0x05,
        }
    }

    /// Descriptor level that must be present before this one is accepted
    pub fn parent(self) -> Option<DescriptorType> {
        match self {
            DescriptorType::Device => None,
            DescriptorType::Configuration => Some(DescriptorType::Device),
            DescriptorType::Interface => Some(DescriptorType::Configuration),
            DescriptorType::Endpoint => Some(DescriptorType::Interface),
        }
    }
}

impl TryFrom<u8> for DescriptorType {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x01 => Ok(DescriptorType::Device),
            0x02 => Ok(DescriptorType::Configuration),
            0x04 => Ok(DescriptorType::Interface),
            0x05 => Ok(DescriptorType::Endpoint),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for DescriptorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DescriptorType::Device => "device",
            DescriptorType::Configuration => "configuration",
            DescriptorType::Interface => "interface",
            DescriptorType::Endpoint => "endpoint",
        };
        f.write_str(name)
    }
}

/// Standard device descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// USB specification release (BCD)
    #[serde(default)]
    pub usb_version: u16,
    #[serde(default)]
    pub class: u8,
    #[serde(default)]
    pub subclass: u8,
    #[serde(default)]
    pub protocol: u8,
    #[serde(default)]
    pub max_packet_size: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Device release number (BCD)
    #[serde(default)]
    pub device_release: u16,
    pub num_configurations: u8,
}

/// Standard configuration descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigurationDescriptor {
    #[serde(default)]
    pub total_length: u16,
    #[serde(default)]
    pub num_interfaces: u8,
    #[serde(default)]
    pub configuration_value: u8,
    #[serde(default)]
    pub attributes: u8,
    /// Maximum power draw in 2 mA units
    #[serde(default)]
    pub max_power: u8,
}

/// Standard interface descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    #[serde(default)]
    pub interface_number: u8,
    #[serde(default)]
    pub alternate_setting: u8,
    #[serde(default)]
    pub num_endpoints: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
}

/// Standard endpoint descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub address: u8,
    #[serde(default)]
    pub attributes: u8,
    #[serde(default)]
    pub max_packet_size: u16,
    #[serde(default)]
    pub interval: u8,
}

/// One descriptor event from the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Descriptor {
    Device(DeviceDescriptor),
    Configuration(ConfigurationDescriptor),
    Interface(InterfaceDescriptor),
    Endpoint(EndpointDescriptor),
}

impl Descriptor {
    pub fn kind(&self) -> DescriptorType {
        match self {
            Descriptor::Device(_) => DescriptorType::Device,
            Descriptor::Configuration(_) => DescriptorType::Configuration,
            Descriptor::Interface(_) => DescriptorType::Interface,
            Descriptor::Endpoint(_) => DescriptorType::Endpoint,
        }
    }
}

/// The parser's running record of which descriptor types it has accepted
/// for the current ingestion session.
///
/// The ingestion state machine queries this before accepting a child
/// descriptor and asks it to forget interface and endpoint state when a
/// configuration descriptor restarts the hierarchy.
pub trait DescriptorOracle {
    fn have_descriptor(&self, kind: DescriptorType) -> bool;

    fn del_descriptor(&mut self, kind: DescriptorType);
}
