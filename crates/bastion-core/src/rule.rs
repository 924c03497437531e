//! Declarative device rules consumed by the policy engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::trace;

use crate::descriptor::InterfaceDescriptor;
use crate::error::DeviceError;
use crate::record::DeviceRecord;

/// Disposition a rule assigns to a matching device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Unknown,
    Allow,
    Block,
    Reject,
}

impl Default for Target {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Target::Unknown => "unknown",
            Target::Allow => "allow",
            Target::Block => "block",
            Target::Reject => "reject",
        };
        f.write_str(name)
    }
}

impl FromStr for Target {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Target::Unknown),
            "allow" => Ok(Target::Allow),
            "block" => Ok(Target::Block),
            "reject" => Ok(Target::Reject),
            other => Err(InvalidValue::Target(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidValue {
    #[error("Invalid rule target: {0}")]
    Target(String),
    #[error("Invalid interface type: {0}")]
    InterfaceType(String),
}

/// How the values of a multi-valued attribute are matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SetOperator {
    AllOf,
    OneOf,
    NoneOf,
    Equals,
    EqualsOrdered,
    MatchAll,
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetOperator::AllOf => "all-of",
            SetOperator::OneOf => "one-of",
            SetOperator::NoneOf => "none-of",
            SetOperator::Equals => "equals",
            SetOperator::EqualsOrdered => "equals-ordered",
            SetOperator::MatchAll => "match-all",
        };
        f.write_str(name)
    }
}

/// A multi-valued rule attribute; an empty set places no constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct RuleSet<T> {
    pub operator: SetOperator,
    #[serde(default)]
    pub values: Vec<T>,
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self {
            operator: SetOperator::Equals,
            values: Vec::new(),
        }
    }
}

impl<T> RuleSet<T> {
    pub fn new(operator: SetOperator, values: Vec<T>) -> Self {
        Self { operator, values }
    }

    /// Exact-match set
    pub fn equals(values: Vec<T>) -> Self {
        Self::new(SetOperator::Equals, values)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

const MATCH_CLASS: u8 = 1 << 7;
const MATCH_SUBCLASS: u8 = 1 << 6;
const MATCH_PROTOCOL: u8 = 1 << 5;
const MATCH_ALL: u8 = MATCH_CLASS | MATCH_SUBCLASS | MATCH_PROTOCOL;

/// Interface class/subclass/protocol triple, written `cc:ss:pp`.
///
/// Trailing parts may be `*` (`08:*:*`, `03:01:*`); wildcard parts are
/// stored as zero with their mask bit cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InterfaceType {
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub mask: u8,
}

impl InterfaceType {
    pub fn new(class: u8, subclass: u8, protocol: u8) -> Self {
        Self {
            class,
            subclass,
            protocol,
            mask: MATCH_ALL,
        }
    }

    /// Whether `other` is covered by this (possibly wildcard) type
    pub fn applies_to(&self, other: &InterfaceType) -> bool {
        (self.mask & MATCH_CLASS == 0 || self.class == other.class)
            && (self.mask & MATCH_SUBCLASS == 0 || self.subclass == other.subclass)
            && (self.mask & MATCH_PROTOCOL == 0 || self.protocol == other.protocol)
    }
}

impl From<&InterfaceDescriptor> for InterfaceType {
    fn from(descriptor: &InterfaceDescriptor) -> Self {
        Self::new(descriptor.class, descriptor.subclass, descriptor.protocol)
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |bit: u8, value: u8| {
            if self.mask & bit != 0 {
                format!("{:02x}", value)
            } else {
                "*".to_string()
            }
        };
        write!(
            f,
            "{}:{}:{}",
            part(MATCH_CLASS, self.class),
            part(MATCH_SUBCLASS, self.subclass),
            part(MATCH_PROTOCOL, self.protocol)
        )
    }
}

impl FromStr for InterfaceType {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidValue::InterfaceType(s.to_string());
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let parse = |part: &str| -> Result<Option<u8>, InvalidValue> {
            match part {
                "*" => Ok(None),
                digits if digits.len() == 2 && digits.bytes().all(|b| b.is_ascii_hexdigit()) => {
                    u8::from_str_radix(digits, 16).map(Some).map_err(|_| invalid())
                }
                _ => Err(invalid()),
            }
        };

        match (parse(parts[0])?, parse(parts[1])?, parse(parts[2])?) {
            (Some(class), Some(subclass), Some(protocol)) => Ok(Self::new(class, subclass, protocol)),
            (Some(class), Some(subclass), None) => Ok(Self {
                class,
                subclass,
                protocol: 0,
                mask: MATCH_CLASS | MATCH_SUBCLASS,
            }),
            (Some(class), None, None) => Ok(Self {
                class,
                subclass: 0,
                protocol: 0,
                mask: MATCH_CLASS,
            }),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for InterfaceType {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InterfaceType> for String {
    fn from(value: InterfaceType) -> Self {
        value.to_string()
    }
}

/// Device rule handed to the policy engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: u32,
    pub target: Target,
    #[serde(default)]
    pub vendor_id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub device_name: String,
    /// Identity hash, always computed without the port
    #[serde(default)]
    pub device_hash: String,
    #[serde(default)]
    pub device_ports: RuleSet<String>,
    #[serde(default)]
    pub interface_types: RuleSet<InterfaceType>,
    #[serde(default = "default_configurations")]
    pub device_configurations: i32,
}

fn default_configurations() -> i32 {
    -1
}

impl Rule {
    /// ID of a rule or device not yet assigned one
    pub const DEFAULT_ID: u32 = u32::MAX - 2;
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            id: Self::DEFAULT_ID,
            target: Target::Unknown,
            vendor_id: String::new(),
            product_id: String::new(),
            serial_number: String::new(),
            device_name: String::new(),
            device_hash: String::new(),
            device_ports: RuleSet::default(),
            interface_types: RuleSet::default(),
            device_configurations: default_configurations(),
        }
    }
}

/// Quote a string value, escaping anything outside printable ASCII
fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for byte in value.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(byte as char),
            other => out.push_str(&format!("\\x{:02x}", other)),
        }
    }
    out.push('"');
    out
}

fn write_set<T>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    set: &RuleSet<T>,
    render: impl Fn(&T) -> String,
) -> fmt::Result {
    match set.values.as_slice() {
        [] => Ok(()),
        [single] if set.operator == SetOperator::Equals => write!(f, " {} {}", name, render(single)),
        values => {
            write!(f, " {} {} {{", name, set.operator)?;
            for value in values {
                write!(f, " {}", render(value))?;
            }
            f.write_str(" }")
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;

        if !self.vendor_id.is_empty() || !self.product_id.is_empty() {
            let or_any = |s: &str| if s.is_empty() { "*".to_string() } else { s.to_string() };
            write!(f, " id {}:{}", or_any(&self.vendor_id), or_any(&self.product_id))?;
        }
        if !self.serial_number.is_empty() {
            write!(f, " serial {}", quoted(&self.serial_number))?;
        }
        if !self.device_name.is_empty() {
            write!(f, " name {}", quoted(&self.device_name))?;
        }
        if !self.device_hash.is_empty() {
            write!(f, " hash {}", quoted(&self.device_hash))?;
        }
        write_set(f, "via-port", &self.device_ports, |port| quoted(port))?;
        write_set(f, "with-interface", &self.interface_types, |t| t.to_string())
    }
}

impl DeviceRecord {
    /// Build a rule from the record.
    ///
    /// The port constraint is attached only when `include_port` is set; the
    /// identity hash never includes the port. A record marked failed by
    /// ingestion yields no rule. Callers sharing the record
    /// across threads go through [`crate::Device::rule`], which holds the
    /// guard for the whole read.
    pub fn to_rule(&self, include_port: bool) -> Result<Rule, DeviceError> {
        if self.is_failed() {
            return Err(DeviceError::EnumerationFailed);
        }

        trace!(
            vendor_id = %self.vendor_id(),
            product_id = %self.product_id(),
            port = %self.port(),
            name = %self.name(),
            include_port,
            "Generating device rule"
        );

        let device_ports = if include_port {
            RuleSet::equals(vec![self.port().to_string()])
        } else {
            RuleSet::default()
        };

        Ok(Rule {
            id: self.id(),
            target: self.target(),
            vendor_id: self.vendor_id().to_string(),
            product_id: self.product_id().to_string(),
            serial_number: self.serial_number().to_string(),
            device_name: self.name().to_string(),
            device_hash: self.device_hash()?,
            device_ports,
            interface_types: RuleSet::equals(self.interface_types().to_vec()),
            device_configurations: self.num_configurations(),
        })
    }
}
