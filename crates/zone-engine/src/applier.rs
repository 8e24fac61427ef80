use std::ops::ControlFlow;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::locator::MemberLocator;
use crate::planner::Plan;
use crate::report::{ApplyReport, RemovalOutcome, RemovalReport, RemovalStatus};
use crate::schema::RulebaseScope;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A request the backend did not accept.
///
/// `request` is the literal request as sent (credentials redacted) so the
/// operator can inspect or replay it by hand.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub request: String,
    pub message: String,
}

impl TransportError {
    pub fn new(request: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            message: message.into(),
        }
    }
}

/// Fatal apply failures.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// An additive chunk was rejected. Later chunks and every removal were
    /// skipped.
    #[error("additive request {number} of {total} was rejected: {source}")]
    ChunkRejected {
        /// 1-based position of the rejected chunk.
        number: usize,
        total: usize,
        payload: String,
        #[source]
        source: TransportError,
    },

    /// The document no longer contains a node the match set refers to.
    #[error("expected node not found in configuration: {locator}")]
    MissingNode { locator: MemberLocator },
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// A live backend that accepts merge ("set") and point-delete requests
/// against a rulebase.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Merge `payload` (concatenated `<entry>` fragments) into the scope's
    /// `rules` element.
    async fn set_members(&self, scope: &RulebaseScope, payload: &str) -> Result<(), TransportError>;

    /// Delete the single member addressed by `locator`.
    async fn delete_member(
        &self,
        scope: &RulebaseScope,
        locator: &MemberLocator,
    ) -> Result<(), TransportError>;
}

/// Receives each removal result as it happens and decides whether the phase
/// keeps going.
pub trait RemovalObserver {
    fn on_removal(&mut self, outcome: &RemovalOutcome) -> ControlFlow<()>;
}

impl<F> RemovalObserver for F
where
    F: FnMut(&RemovalOutcome) -> ControlFlow<()>,
{
    fn on_removal(&mut self, outcome: &RemovalOutcome) -> ControlFlow<()> {
        self(outcome)
    }
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Phase 1: send every additive chunk in order.
///
/// Stops at the first rejected chunk; nothing after it is sent. Returns the
/// number of chunks applied.
pub async fn apply_additions<T>(
    plan: &Plan,
    scope: &RulebaseScope,
    transport: &T,
) -> Result<usize, ApplyError>
where
    T: Transport + ?Sized,
{
    let total = plan.add_chunks().len();
    for (idx, payload) in plan.add_chunks().iter().enumerate() {
        debug!(chunk = idx + 1, total, len = payload.len(), "sending additive chunk");
        if let Err(source) = transport.set_members(scope, payload).await {
            error!(
                chunk = idx + 1,
                total,
                request = %source.request,
                error = %source.message,
                "additive chunk rejected; aborting apply"
            );
            return Err(ApplyError::ChunkRejected {
                number: idx + 1,
                total,
                payload: payload.clone(),
                source,
            });
        }
    }
    info!(chunks = total, %scope, "replacement zone added");
    Ok(total)
}

/// Phase 2: delete every matched member, one request per pointer.
///
/// A failed delete is recorded and the phase carries on unless `observer`
/// breaks.
pub async fn apply_removals<T, O>(
    plan: &Plan,
    scope: &RulebaseScope,
    transport: &T,
    observer: &mut O,
) -> RemovalReport
where
    T: Transport + ?Sized,
    O: RemovalObserver + ?Sized,
{
    let mut report = RemovalReport::default();

    for (rule, pointers) in plan.removals() {
        for locator in pointers {
            let status = match transport.delete_member(scope, locator).await {
                Ok(()) => {
                    debug!(rule, %locator, "member removed");
                    RemovalStatus::Removed
                }
                Err(err) => {
                    warn!(rule, request = %err.request, error = %err.message, "member removal failed");
                    RemovalStatus::Failed(err)
                }
            };
            let outcome = RemovalOutcome {
                rule: rule.to_string(),
                locator: locator.clone(),
                status,
            };
            let flow = observer.on_removal(&outcome);
            report.outcomes.push(outcome);
            if flow.is_break() {
                info!(sent = report.outcomes.len(), "removal phase halted by operator");
                report.halted = true;
                return report;
            }
        }
    }

    info!(
        removed = report.removed(),
        failed = report.failed(),
        "removal phase complete"
    );
    report
}

/// Both phases back to back. The removal phase only runs after every
/// additive chunk was accepted.
pub async fn apply<T, O>(
    plan: &Plan,
    scope: &RulebaseScope,
    transport: &T,
    observer: &mut O,
) -> Result<ApplyReport, ApplyError>
where
    T: Transport + ?Sized,
    O: RemovalObserver + ?Sized,
{
    let chunks_applied = apply_additions(plan, scope, transport).await?;
    let removals = apply_removals(plan, scope, transport, observer).await;
    Ok(ApplyReport {
        chunks_applied,
        removals,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::matcher::{find_matches, ZonePattern};
    use crate::planner::{build_plan, REQUEST_CHAR_LIMIT};
    use crate::schema::{RuleRecord, RulebaseCategory, ZoneField};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Set(String),
        Delete(MemberLocator),
    }

    /// Records every request; fails the n-th set (1-based) or any delete of
    /// the listed values.
    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<Call>>,
        fail_set: Option<usize>,
        fail_delete: Vec<String>,
    }

    impl RecordingTransport {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn sets(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Set(_)))
                .count()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn set_members(&self, _scope: &RulebaseScope, payload: &str) -> Result<(), TransportError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call::Set(payload.to_string()));
            let n = calls.iter().filter(|c| matches!(c, Call::Set(_))).count();
            if self.fail_set == Some(n) {
                return Err(TransportError::new(format!("set #{n}"), "invalid object"));
            }
            Ok(())
        }

        async fn delete_member(
            &self,
            _scope: &RulebaseScope,
            locator: &MemberLocator,
        ) -> Result<(), TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Delete(locator.clone()));
            if self.fail_delete.contains(&locator.value) {
                return Err(TransportError::new(locator.to_string(), "object doesn't exist"));
            }
            Ok(())
        }
    }

    fn scope() -> RulebaseScope {
        RulebaseScope::firewall(RulebaseCategory::Security)
    }

    fn plan_for(rules: &[RuleRecord], overhead: usize) -> Plan {
        let pattern = ZonePattern::new("dmz").unwrap();
        let set = find_matches(rules, &pattern, "dmz-new");
        build_plan(&set, "dmz-new", overhead).unwrap()
    }

    /// Enough rules to force three chunks.
    fn three_chunk_plan() -> Plan {
        let rules: Vec<RuleRecord> = (0..30)
            .map(|i| RuleRecord::new(format!("rule-{i:02}"), ["dmz-a"], Vec::<String>::new()))
            .collect();
        let fragment_len = "<entry name='rule-00'><to><member>dmz-new</member></to></entry>".len();
        let plan = plan_for(&rules, REQUEST_CHAR_LIMIT - 10 * fragment_len);
        assert_eq!(plan.add_chunks().len(), 3);
        plan
    }

    fn keep_going(_: &RemovalOutcome) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    #[tokio::test]
    async fn adds_before_removes() {
        let rules = vec![RuleRecord::new("R1", ["dmz-old", "trust"], ["dmz-x"])];
        let plan = plan_for(&rules, 0);
        let transport = RecordingTransport::default();

        let report = apply(&plan, &scope(), &transport, &mut keep_going)
            .await
            .unwrap();

        assert_eq!(report.chunks_applied, 1);
        assert!(report.is_complete());
        assert_eq!(
            transport.calls(),
            vec![
                Call::Set(plan.add_chunks()[0].clone()),
                Call::Delete(MemberLocator::new("R1", ZoneField::To, "dmz-old")),
                Call::Delete(MemberLocator::new("R1", ZoneField::From, "dmz-x")),
            ]
        );
    }

    #[tokio::test]
    async fn chunk_failure_aborts_everything_after_it() {
        let plan = three_chunk_plan();
        let transport = RecordingTransport {
            fail_set: Some(2),
            ..Default::default()
        };

        let err = apply(&plan, &scope(), &transport, &mut keep_going)
            .await
            .unwrap_err();

        match err {
            ApplyError::ChunkRejected {
                number,
                total,
                payload,
                source,
            } => {
                assert_eq!(number, 2);
                assert_eq!(total, 3);
                assert_eq!(payload, plan.add_chunks()[1]);
                assert_eq!(source.request, "set #2");
            }
            other => panic!("expected ChunkRejected, got {other:?}"),
        }
        // Chunk 3 never sent, no deletes.
        assert_eq!(transport.sets(), 2);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn removal_failure_is_not_fatal() {
        let rules = vec![
            RuleRecord::new("a", ["dmz-1"], Vec::<String>::new()),
            RuleRecord::new("b", ["dmz-2"], Vec::<String>::new()),
            RuleRecord::new("c", ["dmz-3"], Vec::<String>::new()),
        ];
        let plan = plan_for(&rules, 0);
        let transport = RecordingTransport {
            fail_delete: vec!["dmz-2".to_string()],
            ..Default::default()
        };

        let report = apply(&plan, &scope(), &transport, &mut keep_going)
            .await
            .unwrap();

        assert_eq!(report.removals.outcomes.len(), 3);
        assert_eq!(report.removals.removed(), 2);
        assert_eq!(report.removals.failed(), 1);
        assert!(!report.removals.halted);
        assert!(!report.is_complete());
        let failure = report.removals.failures().next().unwrap();
        assert_eq!(failure.rule, "b");
    }

    #[tokio::test]
    async fn observer_can_halt_removals() {
        let rules = vec![RuleRecord::new("r", ["dmz-1", "dmz-2", "dmz-3"], Vec::<String>::new())];
        let plan = plan_for(&rules, 0);
        let transport = RecordingTransport {
            fail_delete: vec!["dmz-1".to_string()],
            ..Default::default()
        };

        let mut seen = 0;
        let mut stop_on_failure = |o: &RemovalOutcome| {
            seen += 1;
            if o.is_removed() {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        };
        let report = apply_removals(&plan, &scope(), &transport, &mut stop_on_failure).await;

        assert!(report.halted);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(seen, 1);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_plan_sends_nothing() {
        let transport = RecordingTransport::default();
        let report = apply(&Plan::default(), &scope(), &transport, &mut keep_going)
            .await
            .unwrap();
        assert_eq!(report.chunks_applied, 0);
        assert!(transport.calls().is_empty());
    }
}
