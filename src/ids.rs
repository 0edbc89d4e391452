use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entry::EntryId;

/// Source of fresh entry identities.
pub trait IdGenerator {
    fn next_id(&mut self) -> EntryId;
}

/// Random v4 UUIDs; the default for live timetables.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> EntryId {
        EntryId::new(Uuid::new_v4().to_string())
    }
}

/// Deterministic `prefix-1`, `prefix-2`, ... ids.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    /// Continues numbering after `last`, e.g. when ids were restored from disk.
    pub fn starting_after(prefix: impl Into<String>, last: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: last + 1,
        }
    }

    /// Continues after the highest `prefix-N` among `existing`.
    pub fn resume<'a, I>(prefix: impl Into<String>, existing: I) -> Self
    where
        I: IntoIterator<Item = &'a EntryId>,
    {
        let prefix = prefix.into();
        let marker = format!("{prefix}-");
        let last = existing
            .into_iter()
            .filter_map(|id| id.as_str().strip_prefix(marker.as_str()))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self::starting_after(prefix, last)
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("entry")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> EntryId {
        let id = EntryId::new(format!("{}-{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sequential_ids_are_predictable() {
        let mut ids = SequentialIds::new("t");
        assert_eq!(ids.next_id().as_str(), "t-1");
        assert_eq!(ids.next_id().as_str(), "t-2");
        let mut resumed = SequentialIds::starting_after("t", 41);
        assert_eq!(resumed.next_id().as_str(), "t-42");
    }

    #[test]
    fn resume_skips_foreign_ids() {
        let existing = [EntryId::from("t-3"), EntryId::from("t-10"), EntryId::from("x-99")];
        let mut ids = SequentialIds::resume("t", existing.iter());
        assert_eq!(ids.next_id().as_str(), "t-11");
    }

    #[test]
    fn uuid_ids_do_not_repeat() {
        let mut ids = UuidIds;
        let generated: HashSet<_> = (0..64).map(|_| ids.next_id()).collect();
        assert_eq!(generated.len(), 64);
    }
}
