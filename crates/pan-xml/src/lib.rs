//! # pan-xml
//!
//! PAN-OS configuration trees and management API response envelopes.
//!
//! [`ConfigDocument`] holds an exported firewall or Panorama configuration:
//! it lists device groups, reads the rules of a [`zone_engine::RulebaseScope`]
//! and exposes a [`ScopedRulebase`] that implements
//! [`zone_engine::MemberTree`] so the engine can edit it in place.
//! [`ApiResponse`] interprets `<response status="...">` bodies returned by
//! the live API.

mod document;
mod error;
mod response;
mod tree;

pub use document::{ConfigDocument, ScopedRulebase};
pub use error::{DocumentError, ResponseError};
pub use response::ApiResponse;

/// Kind of management device a configuration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Firewall,
    Panorama,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Firewall => f.write_str("firewall"),
            DeviceType::Panorama => f.write_str("Panorama"),
        }
    }
}
