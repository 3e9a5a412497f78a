//! Selection state for a single chapter's progress selector.
//!
//! `StatusControl` is pure: it never talks to a store. It turns query results
//! and user selections into at most one `WriteIntent` at a time, and the
//! caller reports back how each write settled.
//!
//! Lifecycle:
//! 1. inert until the first scoped read is applied (`apply_snapshot`)
//! 2. `select` compares against the baseline and either does nothing or
//!    produces a create (no record yet) or update (first record's id)
//! 3. while a write is outstanding further distinct selections queue up and
//!    are released one by one from `write_succeeded` / `write_failed`
//! 4. every later read overwrites the baseline

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{
    NewProgressRecord, ProgressId, ProgressKey, ProgressRecord, ProgressStatus, ProgressUpdate,
    StatusIcon,
};

/// The last synchronized (or optimistically selected) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub status: ProgressStatus,
    pub record: Option<ProgressId>,
}

/// A write the caller must send to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteIntent {
    Create(NewProgressRecord),
    Update {
        id: ProgressId,
        update: ProgressUpdate,
    },
}

impl WriteIntent {
    #[must_use]
    pub fn progress(&self) -> ProgressStatus {
        match self {
            WriteIntent::Create(record) => record.progress,
            WriteIntent::Update { update, .. } => update.progress,
        }
    }
}

/// Result of a user selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No baseline yet; the selection was dropped.
    Ignored,
    /// Same value as the baseline; nothing to write.
    Unchanged,
    /// Send this write now.
    Dispatch(WriteIntent),
    /// Another write is outstanding; this one is released when it settles.
    Queued,
}

/// One entry of the three-option selector, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusOption {
    pub status: ProgressStatus,
    pub label: &'static str,
    pub icon: StatusIcon,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct StatusControl {
    key: ProgressKey,
    baseline: Option<Baseline>,
    in_flight: bool,
    queued: VecDeque<ProgressStatus>,
    diverged: bool,
    duplicates: usize,
}

impl StatusControl {
    #[must_use]
    pub fn new(key: ProgressKey) -> Self {
        Self {
            key,
            baseline: None,
            in_flight: false,
            queued: VecDeque::new(),
            diverged: false,
            duplicates: 0,
        }
    }

    #[must_use]
    pub fn key(&self) -> &ProgressKey {
        &self.key
    }

    #[must_use]
    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    /// Status to display, or `None` while the first read is outstanding.
    #[must_use]
    pub fn displayed(&self) -> Option<ProgressStatus> {
        self.baseline.map(|b| b.status)
    }

    #[must_use]
    pub fn is_established(&self) -> bool {
        self.baseline.is_some()
    }

    #[must_use]
    pub fn has_write_in_flight(&self) -> bool {
        self.in_flight
    }

    /// True after a failed write until the next read lands.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        self.diverged
    }

    /// Extra records seen for this key on the last read.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Applies the result of a scoped read. The first record wins; any others
    /// are counted but otherwise ignored. Always overwrites the baseline.
    pub fn apply_snapshot(&mut self, records: &[ProgressRecord]) -> ProgressStatus {
        let first = records.first();
        let baseline = Baseline {
            status: first.map_or(ProgressStatus::NotStarted, |r| r.progress),
            record: first.map(|r| r.id),
        };
        self.baseline = Some(baseline);
        self.duplicates = records.len().saturating_sub(1);
        self.diverged = false;
        baseline.status
    }

    /// Handles a user selection.
    ///
    /// The baseline moves to `status` before any write is produced.
    pub fn select(&mut self, status: ProgressStatus, now: DateTime<Utc>) -> Selection {
        let Some(baseline) = self.baseline.as_mut() else {
            return Selection::Ignored;
        };
        if baseline.status == status {
            return Selection::Unchanged;
        }
        baseline.status = status;

        if self.in_flight {
            self.queued.push_back(status);
            return Selection::Queued;
        }

        self.in_flight = true;
        Selection::Dispatch(self.intent_for(status, now))
    }

    /// Reports a successful write. `created` carries the id a create returned.
    ///
    /// Returns the next queued write, if any.
    pub fn write_succeeded(
        &mut self,
        created: Option<ProgressId>,
        now: DateTime<Utc>,
    ) -> Option<WriteIntent> {
        if let (Some(id), Some(baseline)) = (created, self.baseline.as_mut()) {
            baseline.record.get_or_insert(id);
        }
        self.release_next(now)
    }

    /// Reports a rejected write. The optimistic baseline stays in place but is
    /// flagged as diverged until the next read.
    pub fn write_failed(&mut self, now: DateTime<Utc>) -> Option<WriteIntent> {
        self.diverged = true;
        self.release_next(now)
    }

    /// The selector options in stable order; empty while inert.
    #[must_use]
    pub fn options(&self) -> Vec<StatusOption> {
        let Some(current) = self.displayed() else {
            return Vec::new();
        };
        ProgressStatus::ALL
            .into_iter()
            .map(|status| StatusOption {
                status,
                label: status.label(),
                icon: status.icon(),
                selected: status == current,
            })
            .collect()
    }

    fn release_next(&mut self, now: DateTime<Utc>) -> Option<WriteIntent> {
        match self.queued.pop_front() {
            Some(status) => Some(self.intent_for(status, now)),
            None => {
                self.in_flight = false;
                None
            }
        }
    }

    fn intent_for(&self, status: ProgressStatus, now: DateTime<Utc>) -> WriteIntent {
        match self.baseline.and_then(|b| b.record) {
            Some(id) => WriteIntent::Update {
                id,
                update: ProgressUpdate {
                    progress: status,
                    created_at: now,
                },
            },
            None => WriteIntent::Create(NewProgressRecord::for_key(&self.key, status, now)),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryKey, ChapterKey, ContentType, UserId};
    use crate::time::fixed_now;

    fn key() -> ProgressKey {
        ProgressKey::new(
            UserId::new("u1"),
            CategoryKey::new("micro").unwrap(),
            ChapterKey::new("supply-and-demand").unwrap(),
            ContentType::Slide,
        )
    }

    fn record(id: u64, progress: ProgressStatus) -> ProgressRecord {
        NewProgressRecord::for_key(&key(), progress, fixed_now()).assign_id(ProgressId::new(id))
    }

    #[test]
    fn selections_before_first_read_are_ignored() {
        let mut control = StatusControl::new(key());
        assert_eq!(control.select(ProgressStatus::Completed, fixed_now()), Selection::Ignored);
        assert!(control.options().is_empty());
        assert_eq!(control.displayed(), None);
    }

    #[test]
    fn reselecting_the_baseline_never_writes() {
        for status in ProgressStatus::ALL {
            let mut control = StatusControl::new(key());
            let records = if status == ProgressStatus::NotStarted {
                vec![]
            } else {
                vec![record(1, status)]
            };
            control.apply_snapshot(&records);
            assert_eq!(control.select(status, fixed_now()), Selection::Unchanged);
        }
    }

    #[test]
    fn empty_read_leads_to_create_then_updates() {
        let mut control = StatusControl::new(key());
        assert_eq!(control.apply_snapshot(&[]), ProgressStatus::NotStarted);

        let Selection::Dispatch(WriteIntent::Create(new)) =
            control.select(ProgressStatus::InProgress, fixed_now())
        else {
            panic!("expected create");
        };
        assert_eq!(new.progress, ProgressStatus::InProgress);
        assert_eq!(new.chapter.as_str(), "supply-and-demand");
        assert!(control.write_succeeded(Some(ProgressId::new(7)), fixed_now()).is_none());

        let selection = control.select(ProgressStatus::Completed, fixed_now());
        assert!(matches!(
            selection,
            Selection::Dispatch(WriteIntent::Update { id, .. }) if id == ProgressId::new(7)
        ));
    }

    #[test]
    fn first_record_wins_over_duplicates() {
        let mut control = StatusControl::new(key());
        let status = control.apply_snapshot(&[
            record(4, ProgressStatus::Completed),
            record(9, ProgressStatus::InProgress),
        ]);
        assert_eq!(status, ProgressStatus::Completed);
        assert_eq!(control.duplicates(), 1);

        let selection = control.select(ProgressStatus::NotStarted, fixed_now());
        assert!(matches!(
            selection,
            Selection::Dispatch(WriteIntent::Update { id, .. }) if id == ProgressId::new(4)
        ));
    }

    #[test]
    fn selections_during_an_outstanding_write_queue_in_order() {
        let mut control = StatusControl::new(key());
        control.apply_snapshot(&[]);

        assert!(matches!(
            control.select(ProgressStatus::InProgress, fixed_now()),
            Selection::Dispatch(WriteIntent::Create(_))
        ));
        assert_eq!(control.select(ProgressStatus::Completed, fixed_now()), Selection::Queued);
        assert_eq!(control.select(ProgressStatus::Completed, fixed_now()), Selection::Unchanged);
        assert_eq!(control.displayed(), Some(ProgressStatus::Completed));

        let next = control
            .write_succeeded(Some(ProgressId::new(2)), fixed_now())
            .expect("queued selection released");
        assert_eq!(
            next,
            WriteIntent::Update {
                id: ProgressId::new(2),
                update: ProgressUpdate {
                    progress: ProgressStatus::Completed,
                    created_at: fixed_now(),
                },
            }
        );
        assert!(control.has_write_in_flight());
        assert!(control.write_succeeded(None, fixed_now()).is_none());
        assert!(!control.has_write_in_flight());
    }

    #[test]
    fn failed_write_diverges_until_next_read() {
        let mut control = StatusControl::new(key());
        control.apply_snapshot(&[record(1, ProgressStatus::InProgress)]);
        control.select(ProgressStatus::Completed, fixed_now());
        assert!(control.write_failed(fixed_now()).is_none());
        assert!(control.is_diverged());
        assert_eq!(control.displayed(), Some(ProgressStatus::Completed));

        control.apply_snapshot(&[record(1, ProgressStatus::InProgress)]);
        assert!(!control.is_diverged());
        assert_eq!(control.displayed(), Some(ProgressStatus::InProgress));
    }

    #[test]
    fn failed_create_keeps_creating() {
        let mut control = StatusControl::new(key());
        control.apply_snapshot(&[]);
        control.select(ProgressStatus::InProgress, fixed_now());
        control.write_failed(fixed_now());

        assert!(matches!(
            control.select(ProgressStatus::Completed, fixed_now()),
            Selection::Dispatch(WriteIntent::Create(_))
        ));
    }

    #[test]
    fn options_mark_the_current_status() {
        let mut control = StatusControl::new(key());
        control.apply_snapshot(&[record(1, ProgressStatus::InProgress)]);
        let options = control.options();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].label, "Not Started");
        assert_eq!(options[1].icon, StatusIcon::OpenBook);
        let selected: Vec<_> = options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].status, ProgressStatus::InProgress);
    }
}
