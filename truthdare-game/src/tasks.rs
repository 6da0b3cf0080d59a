//! Task pool: categorized truth and dare prompts plus random selection.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::{DARE_TIME_LIMIT_SECS, TRUTH_PROBABILITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskType {
    Truth,
    Dare,
}

impl TaskType {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Truth => "TRUTH",
            Self::Dare => "DARE",
        }
    }

    /// Seconds the player gets to finish this kind of task, if timed.
    #[must_use]
    pub const fn time_limit_secs(self) -> Option<u32> {
        match self {
            Self::Truth => None,
            Self::Dare => Some(DARE_TIME_LIMIT_SECS),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A themed set of prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub truths: Vec<String>,
    #[serde(default, alias = "actions")]
    pub dares: Vec<String>,
}

impl Category {
    #[must_use]
    pub fn prompts(&self, task_type: TaskType) -> &[String] {
        match task_type {
            TaskType::Truth => &self.truths,
            TaskType::Dare => &self.dares,
        }
    }
}

/// Container for all prompt categories.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskPool {
    pub categories: Vec<Category>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskPoolError {
    #[error("unknown category \"{0}\"")]
    UnknownCategory(String),
    #[error("category \"{category}\" has no {task_type} prompts")]
    EmptyPool {
        category: String,
        task_type: TaskType,
    },
}

/// A prompt handed to the player, identified for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnTask {
    pub id: String,
    pub task_type: TaskType,
    pub category_id: String,
    pub prompt: String,
    pub time_limit_secs: Option<u32>,
    pub drawn_at: i64,
}

impl DrawnTask {
    /// Text a presentation layer can hand to a share sheet.
    #[must_use]
    pub fn share_text(&self) -> String {
        share_text(self.task_type, &self.prompt)
    }
}

/// Build the shareable message for a prompt.
#[must_use]
pub fn share_text(task_type: TaskType, prompt: &str) -> String {
    format!("Truth or Dare: I got \"{}\" - {prompt}", task_type.label())
}

/// Identifier for a drawn prompt: `"{TYPE}-{prompt}-{now_ms}"`.
#[must_use]
pub fn task_id(task_type: TaskType, prompt: &str, now_ms: i64) -> String {
    format!("{}-{prompt}-{now_ms}", task_type.label())
}

/// Roll the wheel: truths come up far more often than dares.
pub fn roll_task_type<R: Rng + ?Sized>(rng: &mut R) -> TaskType {
    if rng.gen_bool(TRUTH_PROBABILITY) {
        TaskType::Truth
    } else {
        TaskType::Dare
    }
}

impl TaskPool {
    /// Load a task pool from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a task pool.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The prompt set bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled asset is not valid task pool JSON.
    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(include_str!("../assets/tasks.json"))
    }

    #[must_use]
    pub fn find_category(&self, category_id: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|category| category.id == category_id)
    }

    /// First category, used as the initial selection.
    #[must_use]
    pub fn default_category_id(&self) -> Option<&str> {
        self.categories.first().map(|category| category.id.as_str())
    }

    /// Pick a prompt uniformly from the given category and type.
    ///
    /// # Errors
    ///
    /// Returns [`TaskPoolError::UnknownCategory`] when no such category
    /// exists and [`TaskPoolError::EmptyPool`] when it has no prompts of
    /// the requested type.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        category_id: &str,
        task_type: TaskType,
        now_ms: i64,
    ) -> Result<DrawnTask, TaskPoolError> {
        let category = self
            .find_category(category_id)
            .ok_or_else(|| TaskPoolError::UnknownCategory(category_id.to_string()))?;
        let prompts = category.prompts(task_type);
        if prompts.is_empty() {
            return Err(TaskPoolError::EmptyPool {
                category: category.name.clone(),
                task_type,
            });
        }
        let prompt = prompts[rng.gen_range(0..prompts.len())].clone();
        Ok(DrawnTask {
            id: task_id(task_type, &prompt, now_ms),
            task_type,
            category_id: category.id.clone(),
            time_limit_secs: task_type.time_limit_secs(),
            prompt,
            drawn_at: now_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn pool() -> TaskPool {
        TaskPool::from_json(
            r#"{
                "categories": [
                    {"id": "party", "name": "Party", "truths": ["t1", "t2"], "actions": ["d1"]},
                    {"id": "quiet", "name": "Quiet", "truths": ["q1"]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn bundled_pool_parses_and_is_populated() {
        let pool = TaskPool::bundled().unwrap();
        assert!(!pool.categories.is_empty());
        for category in &pool.categories {
            assert!(!category.truths.is_empty(), "{} has no truths", category.id);
            assert!(!category.dares.is_empty(), "{} has no dares", category.id);
        }
    }

    #[test]
    fn draw_picks_from_requested_list() {
        let mut rng = SmallRng::seed_from_u64(7);
        let task = pool().draw(&mut rng, "party", TaskType::Dare, 42).unwrap();
        assert_eq!(task.prompt, "d1");
        assert_eq!(task.id, "DARE-d1-42");
        assert_eq!(task.time_limit_secs, Some(DARE_TIME_LIMIT_SECS));

        let truth = pool().draw(&mut rng, "party", TaskType::Truth, 43).unwrap();
        assert!(["t1", "t2"].contains(&truth.prompt.as_str()));
        assert_eq!(truth.time_limit_secs, None);
    }

    #[test]
    fn empty_and_unknown_categories_are_reported() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(
            pool().draw(&mut rng, "quiet", TaskType::Dare, 0),
            Err(TaskPoolError::EmptyPool {
                category: "Quiet".to_string(),
                task_type: TaskType::Dare,
            })
        );
        assert_eq!(
            pool().draw(&mut rng, "missing", TaskType::Truth, 0),
            Err(TaskPoolError::UnknownCategory("missing".to_string()))
        );
    }

    #[test]
    fn roll_favors_truths() {
        let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
        let truths = (0..10_000)
            .filter(|_| roll_task_type(&mut rng) == TaskType::Truth)
            .count();
        assert!((7_500..8_500).contains(&truths), "truths rolled: {truths}");
    }

    #[test]
    fn share_text_names_type_and_prompt() {
        let text = share_text(TaskType::Truth, "Who was your first crush?");
        assert_eq!(
            text,
            "Truth or Dare: I got \"TRUTH\" - Who was your first crush?"
        );
    }
}
