use std::collections::BTreeSet;

use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, trace};

use crate::schema::{RuleRecord, ZoneField};

/// The operator's search pattern, anchored at the start of the zone name.
///
/// A zone matches when the pattern matches a prefix of it; the pattern does
/// not have to consume the whole name (`dmz` matches `dmz-old`).
#[derive(Debug, Clone)]
pub struct ZonePattern {
    source: String,
    regex: Regex,
}

impl ZonePattern {
    /// Compile `source` as a prefix-anchored regular expression.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{source})"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern as the operator typed it.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, zone: &str) -> bool {
        self.regex.is_match(zone)
    }

    /// Whether the pattern would also select `replacement`. Such zones are
    /// never matched, so rules already holding the replacement keep it.
    pub fn matches_replacement(&self, replacement: &str) -> bool {
        self.is_match(replacement)
    }
}

/// Matched zones of a single rule, in member order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMatches {
    pub to: Vec<String>,
    pub from: Vec<String>,
}

impl FieldMatches {
    pub fn zones(&self, field: ZoneField) -> &[String] {
        match field {
            ZoneField::To => &self.to,
            ZoneField::From => &self.from,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to.is_empty() && self.from.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to.len() + self.from.len()
    }
}

/// Rules with at least one matched zone, keyed by rule name in the order the
/// rules were scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    rules: IndexMap<String, FieldMatches>,
}

impl MatchSet {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, rule: &str) -> Option<&FieldMatches> {
        self.rules.get(rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldMatches)> {
        self.rules.iter().map(|(name, m)| (name.as_str(), m))
    }

    /// Every matched zone value across all rules, deduplicated and sorted.
    /// Advisory output for the operator.
    pub fn distinct_zones(&self) -> BTreeSet<&str> {
        self.rules
            .values()
            .flat_map(|m| m.to.iter().chain(m.from.iter()))
            .map(String::as_str)
            .collect()
    }

    /// Number of matched zone members, counting repeats.
    pub fn total_zone_count(&self) -> usize {
        self.rules.values().map(FieldMatches::len).sum()
    }

    fn insert(&mut self, rule: String, matches: FieldMatches) {
        self.rules.insert(rule, matches);
    }
}

/// Scan `rules` for zones matching `pattern`.
///
/// Zones equal to `replacement` are never matched, whatever the pattern says,
/// so the zone being introduced is never scheduled for removal.
pub fn find_matches(rules: &[RuleRecord], pattern: &ZonePattern, replacement: &str) -> MatchSet {
    let mut set = MatchSet::default();

    for rule in rules {
        let select = |zones: &[String]| -> Vec<String> {
            zones
                .iter()
                .filter(|z| pattern.is_match(z) && z.as_str() != replacement)
                .cloned()
                .collect()
        };
        let matches = FieldMatches {
            to: select(&rule.to),
            from: select(&rule.from),
        };
        if matches.is_empty() {
            continue;
        }
        trace!(rule = %rule.name, to = ?matches.to, from = ?matches.from, "rule matched");
        set.insert(rule.name.clone(), matches);
    }

    debug!(
        pattern = pattern.as_str(),
        replacement,
        scanned = rules.len(),
        matched = set.len(),
        zones = set.total_zone_count(),
        "zone scan complete"
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(p: &str) -> ZonePattern {
        ZonePattern::new(p).expect("test pattern should compile")
    }

    #[test]
    fn prefix_anchored_not_full() {
        let p = pattern("dmz");
        assert!(p.is_match("dmz"));
        assert!(p.is_match("dmz-old"));
        assert!(!p.is_match("old-dmz"));
    }

    #[test]
    fn alternation_is_anchored_as_a_whole() {
        let p = pattern("a|b");
        assert!(p.is_match("b-zone"));
        assert!(!p.is_match("zone-b"));
    }

    #[test]
    fn detects_pattern_that_covers_the_replacement() {
        assert!(pattern("dmz").matches_replacement("dmz-new"));
        assert!(!pattern("dmz-old").matches_replacement("dmz-new"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(ZonePattern::new("[unclosed").is_err());
    }

    #[test]
    fn example_scenario() {
        let rules = vec![RuleRecord::new("R1", ["dmz-old", "trust"], ["untrust"])];
        let set = find_matches(&rules, &pattern("^dmz-.*"), "dmz-new");

        assert_eq!(set.len(), 1);
        let m = set.get("R1").unwrap();
        assert_eq!(m.to, vec!["dmz-old"]);
        assert!(m.from.is_empty());
    }

    #[test]
    fn rule_without_matches_is_absent() {
        let rules = vec![
            RuleRecord::new("keep", ["trust"], ["untrust"]),
            RuleRecord::new("hit", ["trust"], ["dmz-a"]),
        ];
        let set = find_matches(&rules, &pattern("dmz"), "dmz-new");
        assert!(set.get("keep").is_none());
        assert_eq!(set.get("hit").unwrap().from, vec!["dmz-a"]);
    }

    #[test]
    fn replacement_zone_excluded_even_when_pattern_matches_it() {
        let rules = vec![
            RuleRecord::new("already", ["dmz-new"], Vec::<String>::new()),
            RuleRecord::new("mixed", ["dmz-new", "dmz-a"], ["dmz-b"]),
        ];
        let set = find_matches(&rules, &pattern("dmz"), "dmz-new");

        assert!(set.get("already").is_none());
        let mixed = set.get("mixed").unwrap();
        assert_eq!(mixed.to, vec!["dmz-a"]);
        assert_eq!(mixed.from, vec!["dmz-b"]);
    }

    #[test]
    fn member_order_and_rule_order_preserved() {
        let rules = vec![
            RuleRecord::new("z-last", ["dmz-2", "lan", "dmz-1"], Vec::<String>::new()),
            RuleRecord::new("a-first", Vec::<String>::new(), ["dmz-3"]),
        ];
        let set = find_matches(&rules, &pattern("dmz"), "new");

        let names: Vec<&str> = set.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["z-last", "a-first"]);
        assert_eq!(set.get("z-last").unwrap().to, vec!["dmz-2", "dmz-1"]);
    }

    #[test]
    fn distinct_zones_and_counts() {
        let rules = vec![
            RuleRecord::new("r1", ["dmz-a"], ["dmz-b"]),
            RuleRecord::new("r2", ["dmz-a"], Vec::<String>::new()),
        ];
        let set = find_matches(&rules, &pattern("dmz"), "new");

        let distinct: Vec<&str> = set.distinct_zones().into_iter().collect();
        assert_eq!(distinct, vec!["dmz-a", "dmz-b"]);
        assert_eq!(set.total_zone_count(), 3);
    }

    #[test]
    fn empty_rulebase_yields_empty_set() {
        let set = find_matches(&[], &pattern(".*"), "new");
        assert!(set.is_empty());
        assert_eq!(set.total_zone_count(), 0);
    }
}
