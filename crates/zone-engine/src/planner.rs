use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, trace};
use xml::escape::{escape_str_attribute, escape_str_pcdata};

use crate::locator::MemberLocator;
use crate::matcher::MatchSet;
use crate::schema::ZoneField;

/// Upper bound, in characters, for one additive request: chunk payload plus
/// the caller's fixed request overhead. Both are counted before the
/// transport percent-encodes the query, so the bytes on the wire can be
/// longer. The transport rejects requests of roughly 6000 characters.
pub const REQUEST_CHAR_LIMIT: usize = 5000;

/// Errors raised while building a [`Plan`].
#[derive(Debug, Error)]
pub enum PlanError {
    /// A single insert instruction does not fit in an empty request.
    #[error(
        "insert instruction for rule '{rule}' ({field}) is {fragment_len} characters; \
         with {overhead} characters of request overhead it exceeds the \
         {limit}-character request limit",
        limit = REQUEST_CHAR_LIMIT
    )]
    FragmentTooLarge {
        rule: String,
        field: ZoneField,
        fragment_len: usize,
        overhead: usize,
    },
}

/// The edit plan for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    add_chunks: Vec<String>,
    removals: IndexMap<String, Vec<MemberLocator>>,
}

impl Plan {
    /// Additive payloads, in send order. Each one is a concatenation of
    /// `<entry>` fragments inserting the replacement zone.
    pub fn add_chunks(&self) -> &[String] {
        &self.add_chunks
    }

    /// Removal pointers per rule, in rule order then `to`/`from` member order.
    pub fn removals(&self) -> impl Iterator<Item = (&str, &[MemberLocator])> {
        self.removals
            .iter()
            .map(|(rule, locs)| (rule.as_str(), locs.as_slice()))
    }

    pub fn removal_count(&self) -> usize {
        self.removals.values().map(Vec::len).sum()
    }

    pub fn rule_count(&self) -> usize {
        self.removals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.add_chunks.is_empty() && self.removals.is_empty()
    }
}

/// Build the add/remove plan for `matches`.
///
/// `overhead` is the length of the fixed part of an additive request (base
/// URL, locator, credentials) that every chunk is sent with. A new chunk is
/// started whenever the next fragment would push
/// `chunk + overhead + fragment` past [`REQUEST_CHAR_LIMIT`].
pub fn build_plan(matches: &MatchSet, replacement: &str, overhead: usize) -> Result<Plan, PlanError> {
    let mut plan = Plan::default();
    let mut chunk = String::new();
    let mut chunk_len = 0usize;

    for (rule, fields) in matches.iter() {
        for field in ZoneField::ALL {
            let zones = fields.zones(field);
            if zones.is_empty() {
                continue;
            }

            let fragment = insert_fragment(rule, field, replacement);
            let fragment_len = fragment.chars().count();
            if overhead + fragment_len > REQUEST_CHAR_LIMIT {
                return Err(PlanError::FragmentTooLarge {
                    rule: rule.to_string(),
                    field,
                    fragment_len,
                    overhead,
                });
            }
            if chunk_len + overhead + fragment_len > REQUEST_CHAR_LIMIT {
                trace!(chunk = plan.add_chunks.len(), len = chunk_len, "closing chunk");
                plan.add_chunks.push(std::mem::take(&mut chunk));
                chunk_len = 0;
            }
            chunk.push_str(&fragment);
            chunk_len += fragment_len;

            let pointers = plan.removals.entry(rule.to_string()).or_default();
            pointers.extend(
                zones
                    .iter()
                    .map(|zone| MemberLocator::new(rule, field, zone.as_str())),
            );
        }
    }

    if !chunk.is_empty() {
        plan.add_chunks.push(chunk);
    }

    debug!(
        chunks = plan.add_chunks.len(),
        rules = plan.rule_count(),
        removals = plan.removal_count(),
        overhead,
        "plan built"
    );
    Ok(plan)
}

/// `<entry name='R'><to><member>Z</member></to></entry>` with the rule name
/// escaped as an attribute value and the zone as element text.
fn insert_fragment(rule: &str, field: ZoneField, zone: &str) -> String {
    let tag = field.tag();
    format!(
        "<entry name='{}'><{tag}><member>{}</member></{tag}></entry>",
        escape_str_attribute(rule),
        escape_str_pcdata(zone),
    )
}
