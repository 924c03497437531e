//! Descriptor parser state for one ingestion session

use bastion_core::{Descriptor, DescriptorOracle, DescriptorType};
use std::collections::BTreeMap;
use tracing::debug;

/// Descriptors accepted so far, grouped by type
#[derive(Debug, Clone, Default)]
pub struct DescriptorParser {
    accepted: BTreeMap<DescriptorType, Vec<Descriptor>>,
}

impl DescriptorParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a descriptor the device record has accepted
    pub fn record(&mut self, descriptor: Descriptor) {
        self.accepted
            .entry(descriptor.kind())
            .or_default()
            .push(descriptor);
    }

    /// Descriptors of one type accepted in this session
    pub fn descriptors(&self, kind: DescriptorType) -> &[Descriptor] {
        self.accepted
            .get(&kind)
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// Forget everything; the next event starts a new ingestion session
    pub fn reset(&mut self) {
        self.accepted.clear();
    }
}

impl DescriptorOracle for DescriptorParser {
    fn have_descriptor(&self, kind: DescriptorType) -> bool {
        self.accepted.get(&kind).is_some_and(|d| !d.is_empty())
    }

    fn del_descriptor(&mut self, kind: DescriptorType) {
        if let Some(removed) = self.accepted.remove(&kind) {
            debug!(kind = %kind, count = removed.len(), "Discarded descriptor state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::{EndpointDescriptor, InterfaceDescriptor};

    #[test]
    fn test_record_and_query() {
        let mut parser = DescriptorParser::new();
        assert!(!parser.have_descriptor(DescriptorType::Interface));

        parser.record(Descriptor::Interface(InterfaceDescriptor::default()));
        parser.record(Descriptor::Interface(InterfaceDescriptor {
            interface_number: 1,
            ..Default::default()
        }));

        assert!(parser.have_descriptor(DescriptorType::Interface));
        assert_eq!(parser.descriptors(DescriptorType::Interface).len(), 2);
        assert!(parser.descriptors(DescriptorType::Endpoint).is_empty());
    }

    #[test]
    fn test_del_descriptor() {
        let mut parser = DescriptorParser::new();
        parser.record(Descriptor::Endpoint(EndpointDescriptor::default()));
        parser.del_descriptor(DescriptorType::Endpoint);
        assert!(!parser.have_descriptor(DescriptorType::Endpoint));

        // Deleting an absent type is a no-op
        parser.del_descriptor(DescriptorType::Endpoint);
    }

    #[test]
    fn test_reset() {
        let mut parser = DescriptorParser::new();
        parser.record(Descriptor::Endpoint(EndpointDescriptor::default()));
        parser.reset();
        assert!(!parser.have_descriptor(DescriptorType::Endpoint));
    }
}
