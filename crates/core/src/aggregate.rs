//! Folds the three per-item progress streams into per-chapter dashboard data.
//!
//! Every function here is a full recompute over its inputs. Nothing is
//! cached or updated incrementally, so the output always reflects exactly the
//! slices passed in.

use serde::Serialize;

use crate::model::{
    CategoryKey, ChapterFrqRequirement, ChapterKey, FrqScoreEntry, McqScoreEntry,
    ProgressRecord, ProgressStatus,
};

//
// ─── OUTPUT TYPES ──────────────────────────────────────────────────────────────
//

/// Derived FRQ status for one chapter. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedChapterStatus {
    pub category: CategoryKey,
    pub chapter: ChapterKey,
    pub frq_progress: ProgressStatus,
}

impl AggregatedChapterStatus {
    /// Looks up a chapter's FRQ status; chapters missing from the list are
    /// `NotStarted`.
    #[must_use]
    pub fn status_for(
        list: &[AggregatedChapterStatus],
        category: &CategoryKey,
        chapter: &ChapterKey,
    ) -> ProgressStatus {
        list.iter()
            .find(|s| &s.category == category && &s.chapter == chapter)
            .map_or(ProgressStatus::NotStarted, |s| s.frq_progress)
    }
}

/// Raw records for one subject, as delivered by the three scoped reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardInputs {
    pub slides: Vec<ProgressRecord>,
    pub mcqs: Vec<McqScoreEntry>,
    pub frqs: Vec<FrqScoreEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedDashboardData {
    pub slide_data: Vec<ProgressRecord>,
    pub mcq_data: Vec<McqScoreEntry>,
    pub frq_data: Vec<AggregatedChapterStatus>,
}

/// Completed subsets backing the summary tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTallies {
    pub completed_slides: Vec<ProgressRecord>,
    #[serde(rename = "completedMCQs")]
    pub completed_mcqs: Vec<McqScoreEntry>,
    #[serde(rename = "completedFRQs")]
    pub completed_frqs: Vec<AggregatedChapterStatus>,
}

/// Per-chapter roll-up across all three streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub slide: ProgressStatus,
    pub mcq_attempts: usize,
    pub frq: ProgressStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub data: CombinedDashboardData,
    pub completed: CompletedTallies,
}

impl DashboardSnapshot {
    #[must_use]
    pub fn chapter_summary(&self, category: &CategoryKey, chapter: &ChapterKey) -> ChapterSummary {
        let slide = self
            .data
            .slide_data
            .iter()
            .find(|r| &r.category == category && &r.chapter == chapter)
            .map_or(ProgressStatus::NotStarted, |r| r.progress);
        let mcq_attempts = self
            .data
            .mcq_data
            .iter()
            .filter(|m| &m.category == category && &m.chapter == chapter)
            .count();
        let frq = AggregatedChapterStatus::status_for(&self.data.frq_data, category, chapter);

        ChapterSummary {
            slide,
            mcq_attempts,
            frq,
        }
    }
}

//
// ─── FRQ AGGREGATION ───────────────────────────────────────────────────────────
//

/// Number of submitted FRQ entries for a chapter. Resubmissions count again.
fn submitted_entries(entries: &[FrqScoreEntry], req: &ChapterFrqRequirement) -> u32 {
    let count = entries
        .iter()
        .filter(|e| e.category == req.category && e.chapter == req.chapter)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Derives per-chapter FRQ status from submitted entries.
///
/// Requirements are the outer loop, so the output follows curriculum order
/// and only contains chapters the curriculum knows about. For each chapter:
///
/// - submitted entries == `number_of_frqs` → `Completed`
/// - otherwise at least one entry → `InProgress` (this includes counts above
///   the requirement)
/// - no entries → omitted (consumers read absence as `NotStarted`)
///
/// A chapter that requires zero FRQs therefore always comes out `Completed`.
#[must_use]
pub fn aggregate_frq(
    requirements: &[ChapterFrqRequirement],
    entries: &[FrqScoreEntry],
) -> Vec<AggregatedChapterStatus> {
    requirements
        .iter()
        .filter_map(|req| {
            let count = submitted_entries(entries, req);
            let frq_progress = if count == req.number_of_frqs {
                ProgressStatus::Completed
            } else if count >= 1 {
                ProgressStatus::InProgress
            } else {
                return None;
            };
            Some(AggregatedChapterStatus {
                category: req.category.clone(),
                chapter: req.chapter.clone(),
                frq_progress,
            })
        })
        .collect()
}

/// Builds the combined dashboard view from fully resolved inputs.
#[must_use]
pub fn build_dashboard(
    inputs: &DashboardInputs,
    requirements: &[ChapterFrqRequirement],
) -> DashboardSnapshot {
    let frq_data = aggregate_frq(requirements, &inputs.frqs);

    let completed = CompletedTallies {
        completed_slides: inputs
            .slides
            .iter()
            .filter(|r| r.progress.is_completed())
            .cloned()
            .collect(),
        completed_mcqs: inputs.mcqs.clone(),
        completed_frqs: frq_data
            .iter()
            .filter(|s| s.frq_progress.is_completed())
            .cloned()
            .collect(),
    };

    DashboardSnapshot {
        data: CombinedDashboardData {
            slide_data: inputs.slides.clone(),
            mcq_data: inputs.mcqs.clone(),
            frq_data,
        },
        completed,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
