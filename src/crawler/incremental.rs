// src/crawler/incremental.rs

//! Incremental fetch policy.
//!
//! Sources list records newest first. Records are admitted while they are
//! strictly newer than the cutoff; the first one that is not marks the
//! boundary and everything after it is dropped.

use chrono::{DateTime, FixedOffset};

use crate::models::Scope;

/// Records admitted from one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission<T> {
    pub kept: Vec<T>,
    /// An older-or-equal record was seen; no further pages are needed.
    pub boundary_reached: bool,
}

/// Filters records against the last checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncrementalPolicy {
    cutoff: Option<DateTime<FixedOffset>>,
}

impl IncrementalPolicy {
    pub fn new(cutoff: Option<DateTime<FixedOffset>>) -> Self {
        Self { cutoff }
    }

    /// Policy for a run: `scope = all` never filters.
    pub fn for_scope(scope: Scope, checkpoint: Option<DateTime<FixedOffset>>) -> Self {
        match scope {
            Scope::New => Self::new(checkpoint),
            Scope::All => Self::new(None),
        }
    }

    pub fn cutoff(&self) -> Option<DateTime<FixedOffset>> {
        self.cutoff
    }

    pub fn is_active(&self) -> bool {
        self.cutoff.is_some()
    }

    /// Keep the leading run of records newer than the cutoff.
    ///
    /// Records without a timestamp are always kept.
    pub fn admit<T, F>(&self, records: Vec<T>, timestamp: F) -> Admission<T>
    where
        F: Fn(&T) -> Option<DateTime<FixedOffset>>,
    {
        let Some(cutoff) = self.cutoff else {
            return Admission {
                kept: records,
                boundary_reached: false,
            };
        };

        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            match timestamp(&record) {
                Some(ts) if ts <= cutoff => {
                    return Admission {
                        kept,
                        boundary_reached: true,
                    };
                }
                _ => kept.push(record),
            }
        }

        Admission {
            kept,
            boundary_reached: false,
        }
    }
}
