use tracing::{debug, info};

use crate::applier::ApplyError;
use crate::locator::MemberLocator;
use crate::matcher::MatchSet;
use crate::report::DocumentReport;
use crate::schema::ZoneField;

/// An in-memory rulebase that can be edited member by member.
///
/// Lookups resolve the first member of the addressed field whose text equals
/// `locator.value`.
pub trait MemberTree {
    /// Whether the addressed member exists.
    fn has_member(&self, locator: &MemberLocator) -> bool;

    /// Replace the text of the addressed member, keeping its position.
    fn rename_member(&mut self, locator: &MemberLocator, new_value: &str) -> Result<(), ApplyError>;

    /// Detach the addressed member from its field.
    fn remove_member(&mut self, locator: &MemberLocator) -> Result<(), ApplyError>;
}

/// Edit `tree` so that every matched field ends up holding `replacement`
/// once and none of its matched zones.
///
/// The first matched member of a field is renamed in place; the rest are
/// detached. When the field already contains `replacement`, every matched
/// member is detached instead. A node that cannot be found is fatal: the
/// tree no longer looks like it did when `matches` was built.
pub fn apply_to_document<D>(
    matches: &MatchSet,
    replacement: &str,
    tree: &mut D,
) -> Result<DocumentReport, ApplyError>
where
    D: MemberTree + ?Sized,
{
    let mut report = DocumentReport::default();

    for (rule, fields) in matches.iter() {
        for field in ZoneField::ALL {
            let zones = fields.zones(field);
            if zones.is_empty() {
                continue;
            }

            let present = tree.has_member(&MemberLocator::new(rule, field, replacement));
            let mut zones = zones.iter();
            if !present {
                if let Some(first) = zones.next() {
                    tree.rename_member(&MemberLocator::new(rule, field, first.as_str()), replacement)?;
                    debug!(rule, %field, from = %first, to = replacement, "member renamed");
                    report.renamed += 1;
                }
            }
            for zone in zones {
                tree.remove_member(&MemberLocator::new(rule, field, zone.as_str()))?;
                debug!(rule, %field, zone = %zone, "member removed");
                report.removed += 1;
            }
        }
    }

    info!(
        rules = matches.len(),
        renamed = report.renamed,
        removed = report.removed,
        "configuration updated in memory"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{find_matches, ZonePattern};
    use crate::schema::RuleRecord;

    /// Rule records standing in for a configuration tree.
    struct Records(Vec<RuleRecord>);

    impl Records {
        fn field_mut(&mut self, locator: &MemberLocator) -> Option<&mut Vec<String>> {
            let rule = self.0.iter_mut().find(|r| r.name == locator.rule)?;
            Some(match locator.field {
                ZoneField::To => &mut rule.to,
                ZoneField::From => &mut rule.from,
            })
        }

        fn position(&mut self, locator: &MemberLocator) -> Result<(&mut Vec<String>, usize), ApplyError> {
            let missing = || ApplyError::MissingNode {
                locator: locator.clone(),
            };
            let members = self.field_mut(locator).ok_or_else(missing)?;
            let idx = members
                .iter()
                .position(|m| *m == locator.value)
                .ok_or_else(missing)?;
            Ok((members, idx))
        }
    }

    impl MemberTree for Records {
        fn has_member(&self, locator: &MemberLocator) -> bool {
            self.0
                .iter()
                .find(|r| r.name == locator.rule)
                .is_some_and(|r| r.zones(locator.field).contains(&locator.value))
        }

        fn rename_member(&mut self, locator: &MemberLocator, new_value: &str) -> Result<(), ApplyError> {
            let (members, idx) = self.position(locator)?;
            members[idx] = new_value.to_string();
            Ok(())
        }

        fn remove_member(&mut self, locator: &MemberLocator) -> Result<(), ApplyError> {
            let (members, idx) = self.position(locator)?;
            members.remove(idx);
            Ok(())
        }
    }

    fn run(rules: Vec<RuleRecord>, pattern: &str, replacement: &str) -> (Records, MatchSet, DocumentReport) {
        let pattern = ZonePattern::new(pattern).unwrap();
        let set = find_matches(&rules, &pattern, replacement);
        let mut tree = Records(rules);
        let report = apply_to_document(&set, replacement, &mut tree).unwrap();
        (tree, set, report)
    }

    #[test]
    fn first_match_renamed_in_place_others_removed() {
        let rules = vec![RuleRecord::new("r", ["dmz-1", "lan", "dmz-2", "dmz-3"], ["wan"])];
        let (tree, _, report) = run(rules, "dmz", "dmz-new");

        assert_eq!(tree.0[0].to, vec!["dmz-new", "lan"]);
        assert_eq!(tree.0[0].from, vec!["wan"]);
        assert_eq!(report, DocumentReport { renamed: 1, removed: 2 });
    }

    #[test]
    fn end_state_has_one_replacement_and_no_old_values() {
        let rules = vec![
            RuleRecord::new("a", ["dmz-1", "dmz-2"], ["dmz-3", "trust"]),
            RuleRecord::new("b", ["trust"], ["dmz-1", "dmz-1"]),
            RuleRecord::new("c", ["dmz-new", "dmz-9"], Vec::<String>::new()),
        ];
        let (tree, set, _) = run(rules, "dmz", "dmz-new");

        for (rule, fields) in set.iter() {
            let record = tree.0.iter().find(|r| r.name == rule).unwrap();
            for field in ZoneField::ALL {
                let matched = fields.zones(field);
                if matched.is_empty() {
                    continue;
                }
                let members = record.zones(field);
                assert_eq!(
                    members.iter().filter(|m| *m == "dmz-new").count(),
                    1,
                    "rule {rule} field {field}: {members:?}"
                );
                assert!(members.iter().all(|m| !matched.contains(m)));
            }
        }
    }

    #[test]
    fn existing_replacement_is_not_duplicated() {
        let rules = vec![RuleRecord::new("c", ["dmz-a", "dmz-new", "dmz-b"], Vec::<String>::new())];
        let (tree, _, report) = run(rules, "dmz", "dmz-new");

        assert_eq!(tree.0[0].to, vec!["dmz-new"]);
        assert_eq!(report, DocumentReport { renamed: 0, removed: 2 });
    }

    #[test]
    fn missing_node_is_fatal() {
        let rules = vec![RuleRecord::new("r", ["dmz-1"], Vec::<String>::new())];
        let pattern = ZonePattern::new("dmz").unwrap();
        let set = find_matches(&rules, &pattern, "new");

        // The document changed after the scan.
        let mut tree = Records(vec![RuleRecord::new("r", ["lan"], Vec::<String>::new())]);
        let err = apply_to_document(&set, "new", &mut tree).unwrap_err();
        match err {
            ApplyError::MissingNode { locator } => {
                assert_eq!(locator, MemberLocator::new("r", ZoneField::To, "dmz-1"));
            }
            other => panic!("expected MissingNode, got {other:?}"),
        }
    }
}
