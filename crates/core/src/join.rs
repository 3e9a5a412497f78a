//! Join point for the three dashboard sources.
//!
//! Slide, MCQ and FRQ reads resolve independently. `DashboardJoin` keeps one
//! slot per source and rebuilds the snapshot only when all three slots hold a
//! resolved value, so a half-loaded dashboard is never produced.

use crate::aggregate::{DashboardInputs, DashboardSnapshot, build_dashboard};
use crate::model::{ChapterFrqRequirement, FrqScoreEntry, McqScoreEntry, ProgressRecord};

/// A source that has either delivered a value or not yet.
///
/// `Resolved(vec![])` (the store answered with nothing) is distinct from
/// `Pending` (no answer yet).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Resolution<T> {
    #[default]
    Pending,
    Resolved(T),
}

impl<T> Resolution<T> {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    #[must_use]
    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Resolution::Pending => None,
            Resolution::Resolved(value) => Some(value),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardJoin {
    requirements: Vec<ChapterFrqRequirement>,
    slides: Resolution<Vec<ProgressRecord>>,
    mcqs: Resolution<Vec<McqScoreEntry>>,
    frqs: Resolution<Vec<FrqScoreEntry>>,
    snapshot: Option<DashboardSnapshot>,
    builds: u64,
}

impl DashboardJoin {
    #[must_use]
    pub fn new(requirements: Vec<ChapterFrqRequirement>) -> Self {
        Self {
            requirements,
            ..Self::default()
        }
    }

    pub fn resolve_slides(&mut self, slides: Vec<ProgressRecord>) -> Option<&DashboardSnapshot> {
        self.slides = Resolution::Resolved(slides);
        self.try_build()
    }

    pub fn resolve_mcqs(&mut self, mcqs: Vec<McqScoreEntry>) -> Option<&DashboardSnapshot> {
        self.mcqs = Resolution::Resolved(mcqs);
        self.try_build()
    }

    pub fn resolve_frqs(&mut self, frqs: Vec<FrqScoreEntry>) -> Option<&DashboardSnapshot> {
        self.frqs = Resolution::Resolved(frqs);
        self.try_build()
    }

    /// Marks every source pending again (e.g. after a cache invalidation).
    ///
    /// The last built snapshot stays readable until a full set of new results
    /// arrives.
    pub fn reset(&mut self) {
        self.slides = Resolution::Pending;
        self.mcqs = Resolution::Pending;
        self.frqs = Resolution::Pending;
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.slides.is_resolved() && self.mcqs.is_resolved() && self.frqs.is_resolved()
    }

    /// Last snapshot built from a complete set of inputs.
    #[must_use]
    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.snapshot.as_ref()
    }

    /// How many times a snapshot has been built.
    #[must_use]
    pub fn builds(&self) -> u64 {
        self.builds
    }

    fn try_build(&mut self) -> Option<&DashboardSnapshot> {
        let (Some(slides), Some(mcqs), Some(frqs)) =
            (self.slides.as_ref(), self.mcqs.as_ref(), self.frqs.as_ref())
        else {
            return None;
        };

        let inputs = DashboardInputs {
            slides: slides.clone(),
            mcqs: mcqs.clone(),
            frqs: frqs.clone(),
        };
        self.snapshot = Some(build_dashboard(&inputs, &self.requirements));
        self.builds += 1;
        self.snapshot.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryKey, ChapterKey, NewFrqScore, ProgressStatus, ScoreId, UserId};
    use crate::time::fixed_now;

    fn requirement(n: u32) -> ChapterFrqRequirement {
        ChapterFrqRequirement {
            category: CategoryKey::new("micro").unwrap(),
            chapter: ChapterKey::new("supply-and-demand").unwrap(),
            number_of_frqs: n,
        }
    }

    fn frq(id: u64, item: u32) -> FrqScoreEntry {
        NewFrqScore::new(
            CategoryKey::new("micro").unwrap(),
            ChapterKey::new("supply-and-demand").unwrap(),
            UserId::new("u"),
            item,
            3,
            4,
            fixed_now(),
        )
        .unwrap()
        .assign_id(ScoreId::new(id))
    }

    #[test]
    fn does_not_build_until_all_sources_resolve() {
        let mut join = DashboardJoin::new(vec![requirement(2)]);
        assert!(join.resolve_frqs(vec![frq(1, 1)]).is_none());
        assert!(join.resolve_mcqs(vec![]).is_none());
        assert!(join.snapshot().is_none());
        assert_eq!(join.builds(), 0);

        let snap = join.resolve_slides(vec![]).expect("all sources resolved");
        assert_eq!(snap.data.frq_data[0].frq_progress, ProgressStatus::InProgress);
        assert_eq!(join.builds(), 1);
    }

    #[test]
    fn reset_keeps_previous_snapshot_until_complete_again() {
        let mut join = DashboardJoin::new(vec![requirement(2)]);
        join.resolve_slides(vec![]);
        join.resolve_mcqs(vec![]);
        join.resolve_frqs(vec![frq(1, 1)]);

        join.reset();
        assert!(!join.is_ready());
        assert!(join.resolve_frqs(vec![frq(1, 1), frq(2, 2)]).is_none());
        assert!(join.resolve_slides(vec![]).is_none());

        let previous = join.snapshot().unwrap();
        assert_eq!(previous.data.frq_data[0].frq_progress, ProgressStatus::InProgress);

        let rebuilt = join.resolve_mcqs(vec![]).unwrap();
        assert_eq!(rebuilt.data.frq_data[0].frq_progress, ProgressStatus::Completed);
        assert_eq!(join.builds(), 2);
    }

    #[test]
    fn resolved_empty_is_not_pending() {
        let mut join = DashboardJoin::new(vec![requirement(1)]);
        join.resolve_slides(vec![]);
        join.resolve_mcqs(vec![]);
        let snap = join.resolve_frqs(vec![]).unwrap();
        assert!(snap.data.frq_data.is_empty());
        assert!(snap.completed.completed_slides.is_empty());
    }
}
