//! Device enumeration sessions
//!
//! A session owns the device record for one enumeration pass and the parser
//! state for its descriptor stream. The first rejected descriptor abandons
//! the session: no further events are applied and no rule is produced.

use bastion_core::{
    Descriptor, DescriptorOracle, DescriptorType, Device, DeviceError, DeviceRecord, Field,
    FieldLimits, Rule,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::parser::DescriptorParser;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("Enumeration abandoned after an earlier error")]
    Abandoned,
    #[error("No device descriptor ingested yet")]
    Incomplete,
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Accepting descriptor events
    Enumerating,
    /// A descriptor was rejected; the device stays unidentified
    Failed,
}

/// Attributes reported by the USB stack outside the descriptor stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub port: String,
}

/// One enumeration pass over one attached device
#[derive(Debug)]
pub struct DeviceSession {
    device: Arc<Device>,
    parser: DescriptorParser,
    state: SessionState,
}

impl DeviceSession {
    /// Start a session with the default field bounds
    pub fn new(attributes: &DeviceAttributes) -> Result<Self, SessionError> {
        Self::with_limits(attributes, FieldLimits::default())
    }

    pub fn with_limits(
        attributes: &DeviceAttributes,
        limits: FieldLimits,
    ) -> Result<Self, SessionError> {
        let mut record = DeviceRecord::with_limits(limits);
        record.set_name(&attributes.name)?;
        record.set_serial_number(&attributes.serial_number)?;
        record.set_port(&attributes.port)?;

        debug!(port = %attributes.port, name = %attributes.name, "Started device session");

        Ok(Self {
            device: Arc::new(Device::from_record(record)),
            parser: DescriptorParser::new(),
            state: SessionState::Enumerating,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Shared handle for rule generation from other threads
    pub fn device(&self) -> Arc<Device> {
        Arc::clone(&self.device)
    }

    pub fn parser(&self) -> &DescriptorParser {
        &self.parser
    }

    /// Apply one descriptor event
    pub fn ingest(&mut self, descriptor: &Descriptor) -> Result<(), SessionError> {
        if self.state == SessionState::Failed {
            return Err(SessionError::Abandoned);
        }

        if let Err(e) = apply(&self.device, &mut self.parser, descriptor) {
            warn!(
                kind = %descriptor.kind(),
                error = %e,
                "Rejected descriptor, abandoning enumeration"
            );
            self.state = SessionState::Failed;
            return Err(e.into());
        }
        Ok(())
    }

    /// Apply events in order, stopping at the first error
    pub fn ingest_all<'a, I>(&mut self, descriptors: I) -> Result<usize, SessionError>
    where
        I: IntoIterator<Item = &'a Descriptor>,
    {
        let mut count = 0;
        for descriptor in descriptors {
            self.ingest(descriptor)?;
            count += 1;
        }
        info!(descriptors = count, "Device enumeration complete");
        Ok(count)
    }

    /// Generate a rule for the enumerated device.
    ///
    /// Refused for failed sessions and for sessions that never saw a device
    /// descriptor, so a half-populated device is never handed out.
    pub fn rule(&self, include_port: bool) -> Result<Rule, SessionError> {
        match self.state {
            SessionState::Failed => Err(SessionError::Abandoned),
            SessionState::Enumerating if !self.parser.have_descriptor(DescriptorType::Device) => {
                Err(SessionError::Incomplete)
            }
            SessionState::Enumerating => Ok(self.device.rule(include_port)?),
        }
    }
}

/// One event under one lock acquisition; a rejected event marks the
/// record failed before the lock is released
fn apply(
    device: &Device,
    parser: &mut DescriptorParser,
    descriptor: &Descriptor,
) -> Result<(), DeviceError> {
    let mut record = device.lock()?;
    let result = load(&mut record, parser, descriptor);
    if result.is_err() {
        record.mark_failed();
    }
    result
}

fn load(
    record: &mut DeviceRecord,
    parser: &mut DescriptorParser,
    descriptor: &Descriptor,
) -> Result<(), DeviceError> {
    // Ids are checked before the state machine touches the record
    let ids = match descriptor {
        Descriptor::Device(d) => {
            let vendor_id = format!("{:04x}", d.vendor_id);
            let product_id = format!("{:04x}", d.product_id);
            record.limits().check(Field::VendorId, &vendor_id)?;
            record.limits().check(Field::ProductId, &product_id)?;
            Some((vendor_id, product_id))
        }
        _ => None,
    };

    record.load_descriptor(parser, descriptor)?;
    if let Some((vendor_id, product_id)) = ids {
        record.set_vendor_id(&vendor_id)?;
        record.set_product_id(&product_id)?;
    }
    parser.record(*descriptor);
    Ok(())
}
