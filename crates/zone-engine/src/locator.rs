use std::fmt;

use crate::schema::{xpath_literal, ZoneField};

/// Addresses one zone member: "the member equal to `value` inside field
/// `field` of rule `rule`".
///
/// The locator is relative to a [`RulebaseScope`](crate::RulebaseScope); each
/// backend resolves it in its own way (an XPath suffix for the management API,
/// a tree walk for an in-memory document).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberLocator {
    pub rule: String,
    pub field: ZoneField,
    pub value: String,
}

impl MemberLocator {
    pub fn new(rule: impl Into<String>, field: ZoneField, value: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            field,
            value: value.into(),
        }
    }

    /// XPath suffix appended to the scope's `rules` path.
    pub fn xpath_suffix(&self) -> String {
        format!(
            "/entry[@name={}]/{}/member[text()={}]",
            xpath_literal(&self.rule),
            self.field.tag(),
            xpath_literal(&self.value)
        )
    }
}

impl fmt::Display for MemberLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.xpath_suffix())
    }
}
