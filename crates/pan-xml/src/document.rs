use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use xmltree::{EmitterConfig, Element, XMLNode};
use zone_engine::{ApplyError, MemberLocator, MemberTree, PathStep, RuleRecord, RulebaseScope};

use crate::error::DocumentError;
use crate::tree::{child, child_mut, children, rule_records, text, walk, walk_all, walk_all_mut};
use crate::DeviceType;

/// A full firewall or Panorama configuration loaded into memory.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    root: Element,
    source: Option<PathBuf>,
}

impl ConfigDocument {
    /// Load and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let root = Element::parse(BufReader::new(file))?;
        info!(path = %path.display(), root = %root.name, "configuration loaded");
        Ok(Self {
            root,
            source: Some(path.to_path_buf()),
        })
    }

    /// Parse a configuration held in memory.
    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        Ok(Self {
            root: Element::parse(xml.as_bytes())?,
            source: None,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn device_group_container(&self) -> Option<&Element> {
        walk(
            &self.root,
            &[
                PathStep::tag("devices"),
                PathStep::tag("entry"),
                PathStep::tag("device-group"),
            ],
        )
    }

    /// Panorama when `devices/entry/device-group` has at least one entry.
    pub fn device_type(&self) -> DeviceType {
        match self.device_group_container() {
            Some(dg) if children(dg, "entry").next().is_some() => DeviceType::Panorama,
            _ => DeviceType::Firewall,
        }
    }

    /// Device-group names in document order.
    pub fn device_groups(&self) -> Vec<String> {
        self.device_group_container()
            .map(|dg| {
                children(dg, "entry")
                    .filter_map(|e| e.attributes.get("name").cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rules of `scope`, in document order. A firewall scope gathers the
    /// rulebase of every vsys. A scope whose `rules` element is absent has no
    /// rules.
    pub fn rules(&self, scope: &RulebaseScope) -> Vec<RuleRecord> {
        walk_all(&self.root, &scope.steps())
            .into_iter()
            .flat_map(rule_records)
            .collect()
    }

    /// Mutable view of every `rules` element of `scope`, for
    /// [`zone_engine::apply_to_document`].
    pub fn rulebase_mut(&mut self, scope: &RulebaseScope) -> Result<ScopedRulebase<'_>, DocumentError> {
        let mut rules = Vec::new();
        walk_all_mut(&mut self.root, &scope.steps(), &mut rules);
        if rules.is_empty() {
            return Err(DocumentError::ScopeNotFound {
                xpath: scope.xpath(),
            });
        }
        debug!(%scope, containers = rules.len(), "rulebase opened for editing");
        Ok(ScopedRulebase { rules })
    }

    /// Serialise the whole document to `out`.
    pub fn write_to(&self, out: impl Write) -> Result<(), DocumentError> {
        let config = EmitterConfig::new().perform_indent(true);
        self.root.write_with_config(out, config)?;
        Ok(())
    }

    /// `<dir>/<prefix><file name>` for the loaded file.
    pub fn edited_path(&self, prefix: &str) -> Option<PathBuf> {
        let source = self.source.as_ref()?;
        let name = source.file_name()?.to_string_lossy();
        Some(source.with_file_name(format!("{prefix}{name}")))
    }

    /// Write the document next to its source under `prefix`, never over the
    /// source itself. Returns the path written.
    pub fn save_edited(&self, prefix: &str) -> Result<PathBuf, DocumentError> {
        let source = self.source.as_deref().ok_or(DocumentError::NoSource)?;
        let path = self
            .edited_path(prefix)
            .filter(|p| p != source)
            .ok_or_else(|| DocumentError::WouldOverwrite {
                path: source.to_path_buf(),
            })?;

        let file = File::create(&path).map_err(|source| DocumentError::Create {
            path: path.clone(),
            source,
        })?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)?;
        out.flush().map_err(|source| DocumentError::Create {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "edited configuration written");
        Ok(path)
    }
}

/// The `rules` elements of one scope (one per vsys on a firewall), editable
/// member by member. Rules are resolved by name across all of them.
#[derive(Debug)]
pub struct ScopedRulebase<'a> {
    rules: Vec<&'a mut Element>,
}

impl ScopedRulebase<'_> {
    /// Field element and the child index of the addressed member.
    fn locate(&mut self, locator: &MemberLocator) -> Result<(&mut Element, usize), ApplyError> {
        self.rules
            .iter_mut()
            .filter_map(|rules| child_mut(&mut **rules, "entry", Some(locator.rule.as_str())))
            .filter_map(|entry| child_mut(entry, locator.field.tag(), None))
            .find_map(|field| member_index(field, &locator.value).map(|idx| (field, idx)))
            .ok_or_else(|| ApplyError::MissingNode {
                locator: locator.clone(),
            })
    }
}

fn member_index(field: &Element, value: &str) -> Option<usize> {
    field.children.iter().position(|node| match node {
        XMLNode::Element(e) => e.name == "member" && text(e) == value,
        _ => false,
    })
}

impl MemberTree for ScopedRulebase<'_> {
    fn has_member(&self, locator: &MemberLocator) -> bool {
        self.rules.iter().any(|rules| {
            child(&**rules, "entry", Some(locator.rule.as_str()))
                .and_then(|entry| child(entry, locator.field.tag(), None))
                .and_then(|field| member_index(field, &locator.value))
                .is_some()
        })
    }

    fn rename_member(&mut self, locator: &MemberLocator, new_value: &str) -> Result<(), ApplyError> {
        let (field, idx) = self.locate(locator)?;
        if let XMLNode::Element(member) = &mut field.children[idx] {
            member.children = vec![XMLNode::Text(new_value.to_string())];
        }
        debug!(%locator, new_value, "renamed member");
        Ok(())
    }

    fn remove_member(&mut self, locator: &MemberLocator) -> Result<(), ApplyError> {
        let (field, idx) = self.locate(locator)?;
        field.children.remove(idx);
        debug!(%locator, "detached member");
        Ok(())
    }
}
