//! # zone-engine
//!
//! Match, batch and apply zone replacements across a firewall or Panorama
//! rulebase. The crate performs no I/O: callers hand it resolved rule records
//! and a backend, and get structured results back.
//!
//! 1. [`find_matches`] scans rules for `to`/`from` zones matching a
//!    prefix-anchored [`ZonePattern`].
//! 2. [`build_plan`] turns the [`MatchSet`] into size-bounded additive
//!    payloads plus one removal [`MemberLocator`] per matched zone.
//! 3. [`apply`] (or [`apply_additions`] then [`apply_removals`]) runs the
//!    plan against a live [`Transport`]; [`apply_to_document`] edits an
//!    in-memory [`MemberTree`] instead.
//!
//! ## Quick start
//!
//! ```rust
//! use zone_engine::{build_plan, find_matches, RuleRecord, ZonePattern};
//!
//! let rules = vec![RuleRecord::new("R1", ["dmz-old", "trust"], ["untrust"])];
//! let pattern = ZonePattern::new("dmz-").unwrap();
//! let matches = find_matches(&rules, &pattern, "dmz-new");
//! let plan = build_plan(&matches, "dmz-new", 200).unwrap();
//! assert_eq!(plan.add_chunks().len(), 1);
//! assert_eq!(plan.removal_count(), 1);
//! ```

mod applier;
mod document;
pub mod locator;
pub mod matcher;
pub mod planner;
mod report;
mod schema;

// Re-export primary public API at crate root.
pub use applier::{
    apply, apply_additions, apply_removals, ApplyError, RemovalObserver, Transport,
    TransportError,
};
pub use document::{apply_to_document, MemberTree};
pub use locator::MemberLocator;
pub use matcher::{find_matches, FieldMatches, MatchSet, ZonePattern};
pub use planner::{build_plan, Plan, PlanError, REQUEST_CHAR_LIMIT};
pub use report::{ApplyReport, DocumentReport, RemovalOutcome, RemovalReport, RemovalStatus};
pub use schema::{
    xpath_literal, PathStep, RuleRecord, RulebaseCategory, RulebaseLocation, RulebasePosition,
    RulebaseScope, ZoneField,
};
