use std::fmt;

/// One policy rule as seen by the engine: its name and the ordered zone
/// members of its `to` and `from` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    /// Unique within its rulebase scope.
    pub name: String,
    pub to: Vec<String>,
    pub from: Vec<String>,
}

impl RuleRecord {
    pub fn new(
        name: impl Into<String>,
        to: impl IntoIterator<Item = impl Into<String>>,
        from: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            to: to.into_iter().map(Into::into).collect(),
            from: from.into_iter().map(Into::into).collect(),
        }
    }

    /// Zone members of the given field.
    pub fn zones(&self, field: ZoneField) -> &[String] {
        match field {
            ZoneField::To => &self.to,
            ZoneField::From => &self.from,
        }
    }
}

/// A zone field of a rule. Traversal order is always `To` then `From`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZoneField {
    To,
    From,
}

impl ZoneField {
    pub const ALL: [ZoneField; 2] = [ZoneField::To, ZoneField::From];

    /// The element name used by the configuration tree.
    pub fn tag(self) -> &'static str {
        match self {
            ZoneField::To => "to",
            ZoneField::From => "from",
        }
    }
}

impl fmt::Display for ZoneField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Rulebase category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulebaseCategory {
    Security,
    Nat,
    Decryption,
    Authentication,
}

impl RulebaseCategory {
    /// Menu order.
    pub const ALL: [RulebaseCategory; 4] = [
        RulebaseCategory::Security,
        RulebaseCategory::Nat,
        RulebaseCategory::Decryption,
        RulebaseCategory::Authentication,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            RulebaseCategory::Security => "security",
            RulebaseCategory::Nat => "nat",
            RulebaseCategory::Decryption => "decryption",
            RulebaseCategory::Authentication => "authentication",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RulebaseCategory::Security => "Security",
            RulebaseCategory::Nat => "NAT",
            RulebaseCategory::Decryption => "Decryption",
            RulebaseCategory::Authentication => "Authentication",
        }
    }
}

impl fmt::Display for RulebaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Pre or post rulebase of a Panorama device group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulebasePosition {
    Pre,
    Post,
}

impl RulebasePosition {
    pub const ALL: [RulebasePosition; 2] = [RulebasePosition::Pre, RulebasePosition::Post];

    pub fn tag(self) -> &'static str {
        match self {
            RulebasePosition::Pre => "pre-rulebase",
            RulebasePosition::Post => "post-rulebase",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RulebasePosition::Pre => "Pre-Rulebase",
            RulebasePosition::Post => "Post-Rulebase",
        }
    }
}

/// Where a rulebase lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulebaseLocation {
    /// The firewall's local vsys policy.
    Firewall,
    /// One device group's pre or post rules on Panorama.
    DeviceGroup {
        name: String,
        position: RulebasePosition,
    },
}

/// One step of a path through the configuration tree: an element name and,
/// optionally, the value its `name` attribute must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub tag: String,
    pub name: Option<String>,
}

impl PathStep {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: None,
        }
    }

    pub fn named(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[@name={}]", self.tag, xpath_literal(name)),
            None => f.write_str(&self.tag),
        }
    }
}

/// `value` as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so a value holding both quote kinds is
/// spliced together with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// A rulebase category at a location: addresses the `rules` container every
/// locator in a plan is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulebaseScope {
    pub category: RulebaseCategory,
    pub location: RulebaseLocation,
}

impl RulebaseScope {
    pub fn firewall(category: RulebaseCategory) -> Self {
        Self {
            category,
            location: RulebaseLocation::Firewall,
        }
    }

    pub fn device_group(
        category: RulebaseCategory,
        name: impl Into<String>,
        position: RulebasePosition,
    ) -> Self {
        Self {
            category,
            location: RulebaseLocation::DeviceGroup {
                name: name.into(),
                position,
            },
        }
    }

    /// Steps from the `<config>` root to the `rules` element.
    pub fn steps(&self) -> Vec<PathStep> {
        let mut steps = vec![PathStep::tag("devices"), PathStep::tag("entry")];
        match &self.location {
            RulebaseLocation::Firewall => {
                steps.push(PathStep::tag("vsys"));
                steps.push(PathStep::tag("entry"));
                steps.push(PathStep::tag("rulebase"));
            }
            RulebaseLocation::DeviceGroup { name, position } => {
                steps.push(PathStep::tag("device-group"));
                steps.push(PathStep::named("entry", name.clone()));
                steps.push(PathStep::tag(position.tag()));
            }
        }
        steps.push(PathStep::tag(self.category.tag()));
        steps.push(PathStep::tag("rules"));
        steps
    }

    /// Absolute XPath of the `rules` element, as the management API expects it.
    pub fn xpath(&self) -> String {
        let mut out = String::from("/config");
        for step in self.steps() {
            out.push('/');
            out.push_str(&step.to_string());
        }
        out
    }
}

impl fmt::Display for RulebaseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            RulebaseLocation::Firewall => write!(f, "{} rulebase", self.category),
            RulebaseLocation::DeviceGroup { name, position } => {
                write!(f, "{} {} of device group '{}'", self.category, position.tag(), name)
            }
        }
    }
}
