//! Bastion Enumerate - Drives descriptor events into device records
//!
//! This crate provides:
//! - An in-memory descriptor parser state implementing the parser oracle
//! - Device sessions that apply events under the record lock and fail
//!   closed on the first malformed descriptor

pub mod parser;
pub mod session;

pub use parser::DescriptorParser;
pub use session::{DeviceAttributes, DeviceSession, SessionError, SessionState};
