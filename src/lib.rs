//! Decision engine for automatically approving bot-authored pull requests.
//!
//! A PR is approved only when its author and title match a configured policy
//! entry, every changed file is either vouched for by an ecosystem rule (a
//! dependency bump within bounds, a release with a changelog) or explicitly
//! listed by the policy, and no reviewer is requesting changes at the head
//! commit. Anything not positively recognized is rejected, with a reason.

pub mod config;
pub mod engine;
pub mod pattern;
pub mod pr;
pub mod report;

pub use config::{Config, Configuration, ValidPr};
pub use engine::{Catalog, Evaluator, RuleRegistry};
pub use report::{Evaluation, Reason};
