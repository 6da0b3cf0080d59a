use std::fmt;

use clap::ValueEnum;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use truthdare_game::{DrawnTask, GameSession, TaskType};

/// What the simulated player does with a drawn task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    Complete,
    Share,
    Skip,
}

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub action: TaskAction,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(action: TaskAction, rationale: Option<String>) -> Self {
        Self { action, rationale }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick TRUTH or DARE manually, or `None` to spin the wheel.
    fn choose_task_type(&mut self, session: &GameSession) -> Option<TaskType>;

    /// Resolve the drawn task.
    fn decide(&mut self, session: &GameSession, task: &DrawnTask) -> PolicyDecision;

    /// Shop item to buy before the next turn, if any.
    fn shop(&mut self, session: &GameSession) -> Option<&'static str>;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameplayStrategy {
    /// Spin every turn and complete everything.
    Eager,
    /// Always pick truth; bank skip tokens.
    Cautious,
    /// Coin-flip through everything, including the surprise box.
    Random,
    /// Complete everything and spend points as soon as possible.
    Shopper,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [Self::Eager, Self::Cautious, Self::Random, Self::Shopper];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GameplayStrategy::Eager => "Eager",
            GameplayStrategy::Cautious => "Cautious",
            GameplayStrategy::Random => "Random",
            GameplayStrategy::Shopper => "Shopper",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            GameplayStrategy::Eager => Box::new(EagerPolicy),
            GameplayStrategy::Cautious => Box::new(CautiousPolicy::default()),
            GameplayStrategy::Random => Box::new(RandomPolicy::new(seed)),
            GameplayStrategy::Shopper => Box::new(ShopperPolicy),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct EagerPolicy;
struct ShopperPolicy;

#[derive(Default)]
struct CautiousPolicy {
    decided: usize,
}

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0x5EED_F00D),
        }
    }
}

fn can_afford(session: &GameSession, item_id: &str) -> bool {
    session
        .catalog()
        .find_item(item_id)
        .is_some_and(|item| item.price <= session.stats().points)
}

impl PlayerPolicy for EagerPolicy {
    fn name(&self) -> &'static str {
        "Eager"
    }

    fn choose_task_type(&mut self, _session: &GameSession) -> Option<TaskType> {
        None
    }

    fn decide(&mut self, _session: &GameSession, _task: &DrawnTask) -> PolicyDecision {
        PolicyDecision::new(TaskAction::Complete, None)
    }

    fn shop(&mut self, _session: &GameSession) -> Option<&'static str> {
        None
    }
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "Cautious"
    }

    fn choose_task_type(&mut self, _session: &GameSession) -> Option<TaskType> {
        Some(TaskType::Truth)
    }

    fn decide(&mut self, session: &GameSession, task: &DrawnTask) -> PolicyDecision {
        self.decided += 1;
        // Every tenth prompt is "too much"; a banked token keeps the streak.
        if self.decided % 10 == 0 {
            let tokens = session.stats().skip_tokens;
            return PolicyDecision::new(
                TaskAction::Skip,
                Some(format!("passing on '{}' with {tokens} tokens", task.prompt)),
            );
        }
        PolicyDecision::new(TaskAction::Complete, None)
    }

    fn shop(&mut self, session: &GameSession) -> Option<&'static str> {
        (session.stats().skip_tokens < 2 && can_afford(session, "skip")).then_some("skip")
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn choose_task_type(&mut self, _session: &GameSession) -> Option<TaskType> {
        match self.rng.gen_range(0..3) {
            0 => Some(TaskType::Truth),
            1 => Some(TaskType::Dare),
            _ => None,
        }
    }

    fn decide(&mut self, _session: &GameSession, _task: &DrawnTask) -> PolicyDecision {
        let roll: f64 = self.rng.r#gen();
        let action = if roll < 0.7 {
            TaskAction::Complete
        } else if roll < 0.8 {
            TaskAction::Share
        } else {
            TaskAction::Skip
        };
        PolicyDecision::new(action, Some(format!("roll {roll:.2}")))
    }

    fn shop(&mut self, session: &GameSession) -> Option<&'static str> {
        (can_afford(session, "surprise") && self.rng.gen_bool(0.25)).then_some("surprise")
    }
}

impl PlayerPolicy for ShopperPolicy {
    fn name(&self) -> &'static str {
        "Shopper"
    }

    fn choose_task_type(&mut self, _session: &GameSession) -> Option<TaskType> {
        None
    }

    fn decide(&mut self, _session: &GameSession, _task: &DrawnTask) -> PolicyDecision {
        PolicyDecision::new(TaskAction::Complete, None)
    }

    fn shop(&mut self, session: &GameSession) -> Option<&'static str> {
        let stats = session.stats();
        if stats.xp_boost_end_time.is_none() && can_afford(session, "xp_boost") {
            return Some("xp_boost");
        }
        if stats.cosmetics.is_empty() && can_afford(session, "theme") {
            return Some("theme");
        }
        can_afford(session, "surprise").then_some("surprise")
    }
}
