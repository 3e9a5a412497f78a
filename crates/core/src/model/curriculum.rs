use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::keys::{CategoryKey, ChapterKey, KeyError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("invalid curriculum json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("duplicate category: {0}")]
    DuplicateCategory(CategoryKey),

    #[error("duplicate chapter {chapter} in category {category}")]
    DuplicateChapter {
        category: CategoryKey,
        chapter: ChapterKey,
    },
}

//
// ─── REQUIREMENT ───────────────────────────────────────────────────────────────
//

/// Number of free-response submissions that complete a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterFrqRequirement {
    pub category: CategoryKey,
    pub chapter: ChapterKey,
    #[serde(rename = "numberOfFRQs")]
    pub number_of_frqs: u32,
}

//
// ─── CURRICULUM ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    key: ChapterKey,
    title: String,
    number_of_frqs: u32,
}

impl Chapter {
    #[must_use]
    pub fn key(&self) -> &ChapterKey {
        &self.key
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn number_of_frqs(&self) -> u32 {
        self.number_of_frqs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    key: CategoryKey,
    title: String,
    chapters: Vec<Chapter>,
}

impl Category {
    #[must_use]
    pub fn key(&self) -> &CategoryKey {
        &self.key
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }
}

/// Static curriculum metadata: categories and their chapters, in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Curriculum {
    categories: Vec<Category>,
}

#[derive(Deserialize)]
struct RawCurriculum {
    categories: Vec<RawCategory>,
}

#[derive(Deserialize)]
struct RawCategory {
    title: String,
    #[serde(default)]
    key: Option<String>,
    chapters: Vec<RawChapter>,
}

#[derive(Deserialize)]
struct RawChapter {
    title: String,
    #[serde(rename = "numberOfFRQs", alias = "numberOfFrqs")]
    number_of_frqs: u32,
}

impl Curriculum {
    /// Parses a curriculum from JSON.
    ///
    /// Category keys default to the kebab-cased title; chapter keys are always
    /// derived from the title.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError` for malformed JSON, titles that produce an
    /// empty key, or duplicate keys.
    pub fn from_json(json: &str) -> Result<Self, CurriculumError> {
        let raw: RawCurriculum = serde_json::from_str(json)?;
        let mut builder = CurriculumBuilder::default();
        for cat in raw.categories {
            let key = match cat.key {
                Some(key) => CategoryKey::new(key)?,
                None => CategoryKey::from_title(&cat.title)?,
            };
            let chapters = cat
                .chapters
                .into_iter()
                .map(|ch| (ch.title, ch.number_of_frqs))
                .collect::<Vec<_>>();
            builder = builder.category(key, cat.title, &chapters)?;
        }
        Ok(builder.build())
    }

    /// Built-in microeconomics curriculum.
    #[must_use]
    pub fn micro() -> Self {
        const CHAPTERS: [(&str, u32); 6] = [
            ("Basic Economic Concepts", 2),
            ("Supply and Demand", 2),
            ("Production, Cost, and the Perfect Competition Model", 3),
            ("Imperfect Competition", 3),
            ("Factor Markets", 2),
            ("Market Failure and the Role of Government", 2),
        ];

        let mut categories = Vec::with_capacity(1);
        let chapters = CHAPTERS
            .iter()
            .filter_map(|(title, frqs)| {
                ChapterKey::from_title(title).ok().map(|key| Chapter {
                    key,
                    title: (*title).to_owned(),
                    number_of_frqs: *frqs,
                })
            })
            .collect();
        if let Ok(key) = CategoryKey::new("micro") {
            categories.push(Category {
                key,
                title: "Micro".to_owned(),
                chapters,
            });
        }
        Self { categories }
    }

    #[must_use]
    pub fn builder() -> CurriculumBuilder {
        CurriculumBuilder::default()
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub fn category(&self, key: &CategoryKey) -> Option<&Category> {
        self.categories.iter().find(|c| &c.key == key)
    }

    /// Flattens every chapter into FRQ requirement rows, categories first
    /// then chapters, in declaration order.
    #[must_use]
    pub fn requirements(&self) -> Vec<ChapterFrqRequirement> {
        self.categories
            .iter()
            .flat_map(|cat| {
                cat.chapters.iter().map(move |ch| ChapterFrqRequirement {
                    category: cat.key.clone(),
                    chapter: ch.key.clone(),
                    number_of_frqs: ch.number_of_frqs,
                })
            })
            .collect()
    }

    /// Requirement rows restricted to one category.
    #[must_use]
    pub fn requirements_for(&self, category: &CategoryKey) -> Vec<ChapterFrqRequirement> {
        self.requirements()
            .into_iter()
            .filter(|req| &req.category == category)
            .collect()
    }
}

/// Incrementally assembles a `Curriculum`, rejecting duplicate keys.
#[derive(Debug, Default)]
pub struct CurriculumBuilder {
    categories: Vec<Category>,
}

impl CurriculumBuilder {
    /// Adds a category with `(title, number_of_frqs)` chapters.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError` for empty chapter keys or duplicates.
    pub fn category(
        mut self,
        key: CategoryKey,
        title: impl Into<String>,
        chapters: &[(impl AsRef<str>, u32)],
    ) -> Result<Self, CurriculumError> {
        if self.categories.iter().any(|c| c.key == key) {
            return Err(CurriculumError::DuplicateCategory(key));
        }

        let mut seen = HashSet::new();
        let mut built = Vec::with_capacity(chapters.len());
        for (title, number_of_frqs) in chapters {
            let title = title.as_ref();
            let chapter = ChapterKey::from_title(title)?;
            if !seen.insert(chapter.clone()) {
                return Err(CurriculumError::DuplicateChapter {
                    category: key,
                    chapter,
                });
            }
            built.push(Chapter {
                key: chapter,
                title: title.to_owned(),
                number_of_frqs: *number_of_frqs,
            });
        }

        self.categories.push(Category {
            key,
            title: title.into(),
            chapters: built,
        });
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> Curriculum {
        Curriculum {
            categories: self.categories,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
