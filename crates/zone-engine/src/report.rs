use crate::applier::TransportError;
use crate::locator::MemberLocator;

/// Result of one removal request.
#[derive(Debug, Clone)]
pub struct RemovalOutcome {
    pub rule: String,
    pub locator: MemberLocator,
    pub status: RemovalStatus,
}

#[derive(Debug, Clone)]
pub enum RemovalStatus {
    Removed,
    Failed(TransportError),
}

impl RemovalOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self.status, RemovalStatus::Removed)
    }
}

/// Everything that happened during the removal phase.
#[derive(Debug, Clone, Default)]
pub struct RemovalReport {
    /// One entry per attempted removal, in request order.
    pub outcomes: Vec<RemovalOutcome>,
    /// Set when the observer stopped the phase before every pointer was sent.
    pub halted: bool,
}

impl RemovalReport {
    pub fn removed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_removed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RemovalOutcome> {
        self.outcomes.iter().filter(|o| !o.is_removed())
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }
}

/// Outcome of a full live apply (both phases).
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub chunks_applied: usize,
    pub removals: RemovalReport,
}

impl ApplyReport {
    /// True when every chunk and every removal went through.
    pub fn is_complete(&self) -> bool {
        !self.removals.halted && self.removals.failed() == 0
    }
}

/// Outcome of an in-memory document apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentReport {
    /// Members renamed in place to the replacement zone.
    pub renamed: usize,
    /// Members detached from their field.
    pub removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ZoneField;

    fn outcome(value: &str, status: RemovalStatus) -> RemovalOutcome {
        RemovalOutcome {
            rule: "r".to_string(),
            locator: MemberLocator::new("r", ZoneField::To, value),
            status,
        }
    }

    #[test]
    fn counts_removed_and_failed() {
        let report = RemovalReport {
            outcomes: vec![
                outcome("a", RemovalStatus::Removed),
                outcome(
                    "b",
                    RemovalStatus::Failed(TransportError::new("delete b", "object not found")),
                ),
                outcome("c", RemovalStatus::Removed),
            ],
            halted: false,
        };
        assert_eq!(report.removed(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures().next().unwrap().locator.value, "b");
    }

    #[test]
    fn halted_report_is_not_complete() {
        let report = ApplyReport {
            chunks_applied: 1,
            removals: RemovalReport {
                outcomes: vec![outcome("a", RemovalStatus::Removed)],
                halted: true,
            },
        };
        assert!(!report.is_complete());
    }

    #[test]
    fn default_report_is_complete() {
        assert!(ApplyReport::default().is_complete());
    }
}
