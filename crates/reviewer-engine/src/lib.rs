//! Reviewer assignment engine.
//!
//! Picks the least-loaded eligible reviewer for a pull request:
//!
//! - [`team`]: repository → team matching, membership merge with the live
//!   directory, eligibility after exclusions
//! - [`cache`]: write-once cache of directory lookups
//! - [`workload`]: completed/pending review counts and normalized scores
//! - [`assign`]: the end-to-end assignment flow
//!
//! # Example
//!
//! ```ignore
//! use reviewer_engine::{AssignmentRequest, Collaborators, ReviewerAssignment};
//!
//! let assignment = ReviewerAssignment::new(Collaborators::from_host(github, chat));
//! let outcome = assignment
//!     .assign(&config, AssignmentRequest::new("acme/api", 42))
//!     .await?;
//! println!("{}", outcome.reviewer.github_login);
//! ```

pub mod assign;
pub mod cache;
pub mod team;
pub mod workload;

pub use assign::{
    assignment_message, AssignError, AssignmentOutcome, AssignmentReport, AssignmentRequest,
    Collaborators, ReviewerAssignment, Stage,
};
pub use cache::{CachedMembers, MembershipCache};
pub use team::{
    available_members, find_team_by_name, is_team_repository, merge_members,
    resolve_team_for_repository, TeamResolver,
};
pub use workload::{ReviewerSelection, WorkloadScorer, DEFAULT_SCORING_CONCURRENCY};
