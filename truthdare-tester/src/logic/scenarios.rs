use std::sync::Arc;

use anyhow::{Result, ensure};
use truthdare_game::{ACHIEVEMENTS, Difficulty, GameState, SessionRules, calculate_level};

use crate::logic::policy::GameplayStrategy;
use crate::logic::tester::SimulationSummary;

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub turns: u32,
    pub difficulty: Difficulty,
    pub rules: SessionRules,
    pub setup: Option<fn(&mut GameState)>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: GameplayStrategy, turns: u32) -> Self {
        Self {
            strategy,
            turns,
            difficulty: Difficulty::default(),
            rules: SessionRules::default(),
            setup: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub const fn with_rules(mut self, rules: SessionRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub const fn with_turns(mut self, turns: u32) -> Self {
        self.turns = turns;
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut GameState)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// A named, runnable simulation.
#[derive(Debug, Clone)]
pub struct TestScenario {
    /// CLI key, also used for save directories.
    pub key: &'static str,
    pub name: &'static str,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub const fn new(key: &'static str, name: &'static str, plan: SimulationPlan) -> Self {
        Self { key, name, plan }
    }
}

const SCENARIO_KEYS: [(&str, &str); 8] = [
    ("smoke", "Ten quick turns complete cleanly"),
    ("streaks", "An unbroken evening fills the streak quests"),
    ("skip-tokens", "Banked skip tokens protect the streak"),
    ("shopping", "Points flow into the shop"),
    ("random", "Random play keeps every invariant"),
    ("hard-mode", "Hard prompts pay out hard rewards"),
    ("strict-quests", "Skipped prompts do not count toward quests"),
    ("veteran", "A seasoned profile keeps levelling"),
];

/// Every available scenario key with a one-line description.
#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIO_KEYS.to_vec()
}

/// Look up a scenario by key (case-insensitive).
#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let scenario = match name.to_lowercase().as_str() {
        "smoke" => TestScenario::new("smoke", "Smoke", smoke_plan()),
        "streaks" => TestScenario::new("streaks", "Streaks", streaks_plan()),
        "skip-tokens" => TestScenario::new("skip-tokens", "Skip Tokens", skip_token_plan()),
        "shopping" => TestScenario::new("shopping", "Shopping", shopping_plan()),
        "random" => TestScenario::new("random", "Random Play", random_plan()),
        "hard-mode" => TestScenario::new("hard-mode", "Hard Mode", hard_mode_plan()),
        "strict-quests" => {
            TestScenario::new("strict-quests", "Strict Quests", strict_quests_plan())
        }
        "veteran" => TestScenario::new("veteran", "Veteran", veteran_plan()),
        _ => return None,
    };
    Some(scenario)
}

fn stats_are_consistent(summary: &SimulationSummary) -> Result<()> {
    let stats = &summary.final_state.player_stats;
    ensure!(
        stats.level() == calculate_level(stats.experience),
        "level {} does not match {} xp",
        stats.level(),
        stats.experience
    );
    ensure!(
        stats.max_streak >= stats.current_streak,
        "max streak {} below current streak {}",
        stats.max_streak,
        stats.current_streak
    );
    ensure!(
        stats.tasks_completed >= stats.truths_answered + stats.dares_completed,
        "more truths and dares than completed tasks"
    );
    for id in &stats.achievements {
        ensure!(
            ACHIEVEMENTS.iter().any(|achievement| achievement.id == id),
            "unknown achievement {id}"
        );
    }
    Ok(())
}

fn smoke_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Eager, 10)
        .with_expectation(stats_are_consistent)
        .with_expectation(|summary: &SimulationSummary| {
            let stats = &summary.final_state.player_stats;
            ensure!(stats.tasks_completed == 10, "completed {}", stats.tasks_completed);
            ensure!(stats.points >= 250, "only {} points", stats.points);
            ensure!(
                stats.achievements.contains("beginner"),
                "beginner achievement missing"
            );
            Ok(())
        })
}

fn streaks_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Eager, 30)
        .with_expectation(stats_are_consistent)
        .with_expectation(|summary: &SimulationSummary| {
            let stats = &summary.final_state.player_stats;
            ensure!(stats.max_streak == 30, "streak stopped at {}", stats.max_streak);
            ensure!(
                stats.badges.contains("streak-daily"),
                "daily streak badge missing"
            );
            ensure!(summary.metrics.streak_breaks == 0, "streak broke");
            Ok(())
        })
}

fn skip_token_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Cautious, 60)
        .with_expectation(stats_are_consistent)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(summary.metrics.skip_tokens_used > 0, "no skip token was used");
            ensure!(
                summary.final_state.player_stats.max_streak > 10,
                "first skip broke the streak"
            );
            Ok(())
        })
}

fn shopping_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Shopper, 80)
        .with_expectation(stats_are_consistent)
        .with_expectation(|summary: &SimulationSummary| {
            let stats = &summary.final_state.player_stats;
            ensure!(summary.metrics.purchases >= 2, "bought {}", summary.metrics.purchases);
            ensure!(stats.xp_boost_end_time.is_some(), "boost never bought");
            ensure!(stats.cosmetics.contains("theme.party"), "theme never bought");
            Ok(())
        })
}

fn random_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Random, 100).with_expectation(stats_are_consistent)
}

fn hard_mode_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Eager, 40)
        .with_difficulty(Difficulty::Hard)
        .with_expectation(stats_are_consistent)
        .with_expectation(|summary: &SimulationSummary| {
            let stats = &summary.final_state.player_stats;
            ensure!(
                stats.hard_tasks_completed == 40,
                "hard tasks {}",
                stats.hard_tasks_completed
            );
            ensure!(
                summary
                    .turns
                    .iter()
                    .all(|turn| turn.points_gained == Difficulty::Hard.points_reward()),
                "hard turn paid the wrong amount"
            );
            Ok(())
        })
}

fn strict_quests_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Cautious, 20)
        .with_rules(SessionRules {
            count_skipped_personal_quests: false,
            ..SessionRules::default()
        })
        .with_expectation(stats_are_consistent)
        .with_expectation(|summary: &SimulationSummary| {
            let answered = summary.final_state.player_stats.truths_answered;
            for quest in summary
                .final_state
                .available_quests
                .iter()
                .filter(|quest| quest.kind.is_personal())
            {
                ensure!(
                    quest.current_progress <= answered,
                    "{} progressed past {answered} answered truths",
                    quest.id
                );
            }
            Ok(())
        })
}

fn veteran_setup(state: &mut GameState) {
    let stats = &mut state.player_stats;
    stats.gain_experience(5_000);
    stats.points = 1_000;
    stats.tasks_completed = 120;
    stats.truths_answered = 70;
    stats.dares_completed = 50;
    stats.skip_tokens = 3;
}

fn veteran_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Random, 40)
        .with_setup(veteran_setup)
        .with_expectation(stats_are_consistent)
        .with_expectation(|summary: &SimulationSummary| {
            let stats = &summary.final_state.player_stats;
            ensure!(stats.experience >= 5_000, "experience went backwards");
            ensure!(stats.tasks_completed >= 120, "task count went backwards");
            ensure!(
                stats.achievements.contains("champion"),
                "veteran unlocked nothing"
            );
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, _) in list_scenarios() {
            let scenario = get_scenario(key).unwrap();
            assert_eq!(scenario.key, key);
            assert!(!scenario.plan.expectations.is_empty());
        }
        assert!(get_scenario("SMOKE").is_some());
        assert!(get_scenario("nope").is_none());
    }

    #[test]
    fn builders_override_defaults() {
        let plan = SimulationPlan::new(GameplayStrategy::Eager, 5)
            .with_turns(9)
            .with_difficulty(Difficulty::Easy);
        assert_eq!(plan.turns, 9);
        assert_eq!(plan.difficulty, Difficulty::Easy);
        assert!(plan.setup.is_none());
    }
}
