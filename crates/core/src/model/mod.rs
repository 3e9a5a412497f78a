mod curriculum;
mod ids;
mod keys;
mod progress;
mod score;
mod status;

pub use curriculum::{
    Category, Chapter, ChapterFrqRequirement, Curriculum, CurriculumBuilder, CurriculumError,
};
pub use ids::{AuthToken, ParseIdError, ProgressId, ScoreId, UserId};
pub use keys::{CategoryKey, ChapterKey, KeyError, kebab_case};
pub use progress::{
    CategoryScope, NewProgressRecord, PathError, ProgressKey, ProgressPath, ProgressQuery,
    ProgressRecord, ProgressUpdate,
};
pub use score::{FrqScoreEntry, McqScoreEntry, NewFrqScore, NewMcqScore, ScoreError};
pub use status::{ContentType, ProgressStatus, StatusError, StatusIcon};
