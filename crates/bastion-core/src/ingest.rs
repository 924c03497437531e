//! Descriptor ingestion state machine
//!
//! Descriptors nest as device > configuration > interface > endpoint. A
//! child descriptor is only accepted once the parser has recorded its
//! parent for the current ingestion session; anything else is rejected
//! before the record is touched.

use tracing::trace;

use crate::descriptor::{
    ConfigurationDescriptor, Descriptor, DescriptorOracle, DescriptorType, DeviceDescriptor,
    EndpointDescriptor, InterfaceDescriptor,
};
use crate::error::DeviceError;
use crate::record::DeviceRecord;
use crate::rule::InterfaceType;

/// Most recent descriptor level confirmed present by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestState {
    NoDevice,
    HasDevice,
    HasConfiguration,
    HasInterface,
    HasEndpoint,
}

impl IngestState {
    /// Derive the current state from the parser's record of seen descriptors
    pub fn observe(oracle: &dyn DescriptorOracle) -> Self {
        if !oracle.have_descriptor(DescriptorType::Device) {
            IngestState::NoDevice
        } else if !oracle.have_descriptor(DescriptorType::Configuration) {
            IngestState::HasDevice
        } else if !oracle.have_descriptor(DescriptorType::Interface) {
            IngestState::HasConfiguration
        } else if !oracle.have_descriptor(DescriptorType::Endpoint) {
            IngestState::HasInterface
        } else {
            IngestState::HasEndpoint
        }
    }
}

fn require_parent(oracle: &dyn DescriptorOracle, child: DescriptorType) -> Result<(), DeviceError> {
    match child.parent() {
        Some(parent) if !oracle.have_descriptor(parent) => {
            Err(DeviceError::MissingParent { child, parent })
        }
        _ => Ok(()),
    }
}

impl DeviceRecord {
    /// Dispatch one descriptor event to its handler
    pub fn load_descriptor(
        &mut self,
        oracle: &mut dyn DescriptorOracle,
        descriptor: &Descriptor,
    ) -> Result<(), DeviceError> {
        match descriptor {
            Descriptor::Device(d) => self.load_device_descriptor(oracle, d),
            Descriptor::Configuration(d) => self.load_configuration_descriptor(oracle, d),
            Descriptor::Interface(d) => self.load_interface_descriptor(oracle, d),
            Descriptor::Endpoint(d) => self.load_endpoint_descriptor(oracle, d),
        }
    }

    /// Start a new device cycle
    pub fn load_device_descriptor(
        &mut self,
        oracle: &mut dyn DescriptorOracle,
        descriptor: &DeviceDescriptor,
    ) -> Result<(), DeviceError> {
        if oracle.have_descriptor(DescriptorType::Device) {
            return Err(DeviceError::DuplicateDescriptor(DescriptorType::Device));
        }
        self.set_num_configurations(i32::from(descriptor.num_configurations));
        self.interface_types_mut().clear();
        trace!(
            configurations = descriptor.num_configurations,
            "Loaded device descriptor"
        );
        Ok(())
    }

    /// A configuration restarts the interface/endpoint hierarchy
    pub fn load_configuration_descriptor(
        &mut self,
        oracle: &mut dyn DescriptorOracle,
        descriptor: &ConfigurationDescriptor,
    ) -> Result<(), DeviceError> {
        require_parent(oracle, DescriptorType::Configuration)?;
        oracle.del_descriptor(DescriptorType::Interface);
        oracle.del_descriptor(DescriptorType::Endpoint);
        trace!(
            value = descriptor.configuration_value,
            interfaces = descriptor.num_interfaces,
            "Loaded configuration descriptor"
        );
        Ok(())
    }

    pub fn load_interface_descriptor(
        &mut self,
        oracle: &mut dyn DescriptorOracle,
        descriptor: &InterfaceDescriptor,
    ) -> Result<(), DeviceError> {
        require_parent(oracle, DescriptorType::Interface)?;
        let interface_type = InterfaceType::from(descriptor);
        trace!(interface = %interface_type, "Loaded interface descriptor");
        self.interface_types_mut().push(interface_type);
        Ok(())
    }

    /// Endpoints are checked for placement only
    pub fn load_endpoint_descriptor(
        &mut self,
        oracle: &mut dyn DescriptorOracle,
        descriptor: &EndpointDescriptor,
    ) -> Result<(), DeviceError> {
        require_parent(oracle, DescriptorType::Endpoint)?;
        trace!(address = descriptor.address, "Loaded endpoint descriptor");
        Ok(())
    }
}
