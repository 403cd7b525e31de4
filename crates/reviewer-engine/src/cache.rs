//! Directory membership cache.
//!
//! Entries are written once per `(org, team_slug)` and never refreshed for
//! the lifetime of the cache. Concurrent misses may both fetch; the last
//! write wins, which is harmless because the roster is assumed stable.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use reviewer_core::TeamMember;

/// Members fetched for one directory team.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMembers {
    pub members: Vec<TeamMember>,
    pub fetched_at: DateTime<Utc>,
}

/// In-memory cache of directory lookups, keyed by `(org, team_slug)`.
#[derive(Debug, Default)]
pub struct MembershipCache {
    entries: RwLock<HashMap<(String, String), CachedMembers>>,
}

impl MembershipCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry for `org/team_slug`, if any.
    pub fn get(&self, org: &str, team_slug: &str) -> Option<CachedMembers> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(org.to_string(), team_slug.to_string()))
            .cloned()
    }

    /// Store the members fetched for `org/team_slug`.
    pub fn insert(&self, org: &str, team_slug: &str, members: Vec<TeamMember>) {
        let entry = CachedMembers {
            members,
            fetched_at: Utc::now(),
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert((org.to_string(), team_slug.to_string()), entry);
    }

    /// Drop every entry. Nothing in the engine calls this on its own.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
