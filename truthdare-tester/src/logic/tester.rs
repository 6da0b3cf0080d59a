use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use truthdare_game::{
    BundledLoader, DataLoader, GameEngine, GameSession, GameState, KeyValueStorage, MemoryStore,
    Notification,
};

use crate::common::{format_clock, save_dir, simulation_epoch_ms};
use crate::logic::policy::TaskAction;
use crate::logic::scenarios::{SimulationPlan, TestScenario};
use crate::logic::simulation::{SimulationConfig, SimulationSession, TurnOutcome};
use crate::store::FileStore;

/// Aggregated counters for one simulated run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetrics {
    pub turns: u32,
    pub points_earned: u64,
    pub xp_earned: u64,
    pub skips: u32,
    pub shares: u32,
    pub skip_tokens_used: u32,
    pub streak_breaks: u32,
    pub purchases: u32,
    pub quests_claimed: u32,
    pub level_ups: u32,
    pub achievements_unlocked: u32,
}

impl RunMetrics {
    fn record(&mut self, outcome: &TurnOutcome) {
        self.turns += 1;
        self.points_earned += outcome.points_gained;
        self.xp_earned += outcome.xp_gained;
        match outcome.decision.action {
            TaskAction::Skip => self.skips += 1,
            TaskAction::Share => self.shares += 1,
            TaskAction::Complete => {}
        }
        self.skip_tokens_used += u32::from(outcome.used_skip_token);
        self.purchases += u32::try_from(outcome.purchases.len()).unwrap_or(u32::MAX);
        self.quests_claimed += u32::try_from(outcome.claimed_quests.len()).unwrap_or(u32::MAX);
        for note in &outcome.notifications {
            match note {
                Notification::StreakBroken { .. } => self.streak_breaks += 1,
                Notification::LevelUp { .. } => self.level_ups += 1,
                Notification::AchievementUnlocked { .. } => self.achievements_unlocked += 1,
                _ => {}
            }
        }
    }
}

/// Everything an expectation may inspect after a run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub plan: SimulationPlan,
    pub turns: Vec<TurnOutcome>,
    pub metrics: RunMetrics,
    pub final_state: GameState,
    /// Whether committing and resuming reproduced `final_state`.
    pub persisted_roundtrip: bool,
}

/// Headless deterministic runner for the engine.
#[derive(Debug, Clone)]
pub struct GameTester {
    verbose: bool,
    save_root: Option<PathBuf>,
}

impl GameTester {
    pub const fn new(verbose: bool, save_root: Option<PathBuf>) -> Self {
        Self { verbose, save_root }
    }

    /// Play `plan` to completion with `seed`.
    pub fn run_plan(
        &self,
        scenario_key: &str,
        plan: &SimulationPlan,
        seed: u64,
    ) -> Result<SimulationSummary> {
        let pool = BundledLoader
            .load_task_pool()
            .context("bundled task pool is invalid")?;
        let config = SimulationConfig::new(plan.strategy, seed)
            .with_turns(plan.turns)
            .with_difficulty(plan.difficulty);
        let clock_ms = simulation_epoch_ms();
        let category = pool.default_category_id().unwrap_or_default().to_string();
        let mut state = GameState::initial(category, clock_ms);
        state.difficulty = plan.difficulty;
        if let Some(setup) = plan.setup {
            setup(&mut state);
        }
        let session = GameSession::from_parts(pool, plan.rules, state, BTreeSet::new(), clock_ms);
        let mut sim = SimulationSession::new(session, config, clock_ms);
        let mut policy = plan.strategy.create_policy(seed);

        let mut turns = Vec::new();
        let mut metrics = RunMetrics::default();
        for _ in 0..plan.turns {
            let outcome = sim
                .advance(policy.as_mut())
                .with_context(|| format!("turn {} failed", metrics.turns + 1))?;
            metrics.record(&outcome);
            if self.verbose {
                let decision = &outcome.decision;
                log::info!(
                    "[{seed}] turn {} at {} {} -> {:?} by {} (+{} pts){}",
                    decision.turn,
                    format_clock(decision.clock_ms),
                    decision.task_type,
                    decision.action,
                    decision.policy_name,
                    outcome.points_gained,
                    decision
                        .rationale
                        .as_deref()
                        .map(|why| format!(": {why}"))
                        .unwrap_or_default()
                );
            }
            turns.push(outcome);
        }

        let clock_ms = sim.clock_ms();
        let session = sim.into_session();
        let persisted_roundtrip = match &self.save_root {
            Some(root) => {
                let store = FileStore::open(save_dir(root, scenario_key, seed))?;
                let engine = GameEngine::new(BundledLoader, KeyValueStorage::new(store));
                engine.commit(&session)?;
                engine.resume_session(clock_ms)?.state() == session.state()
            }
            None => {
                let engine =
                    GameEngine::new(BundledLoader, KeyValueStorage::new(MemoryStore::default()));
                engine.commit(&session)?;
                engine.resume_session(clock_ms)?.state() == session.state()
            }
        };

        Ok(SimulationSummary {
            seed,
            plan: plan.clone(),
            turns,
            metrics,
            final_state: session.into_state(),
            persisted_roundtrip,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    tester: GameTester,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(tester: GameTester, verbose: bool) -> Self {
        Self { tester, verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
            }
            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let verdict = self
                .tester
                .run_plan(scenario.key, &scenario.plan, iteration_seed)
                .and_then(|summary| {
                    evaluate_expectations(&scenario.plan, &summary).map(|()| summary)
                });

            match verdict {
                Ok(summary) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if self.verbose {
                        let stats = &summary.final_state.player_stats;
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) points:{} level:{} streak:{}",
                            i + 1,
                            iterations,
                            stats.points,
                            stats.level(),
                            stats.max_streak
                        );
                    }
                }
                Err(err) => {
                    failures.push(format!(
                        "Iteration {} (strategy {}, seed {}): {err:#}",
                        i + 1,
                        scenario.plan.strategy,
                        iteration_seed
                    ));
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            format!("{err:#}").red()
                        );
                    }
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            performance_data,
        }
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.persisted_roundtrip,
        "resumed session differs from the committed one"
    );
    for expectation in &plan.expectations {
        expectation.evaluate(summary)?;
    }
    Ok(())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::GameplayStrategy;
    use crate::logic::scenarios::get_scenario;

    #[test]
    fn smoke_scenario_passes_for_several_seeds() {
        let scenario = get_scenario("smoke").unwrap();
        let tester = LogicTester::new(GameTester::new(false, None), false);
        let results = tester.run_scenario(&scenario, &[1, 2, 3], 2);
        assert_eq!(results.len(), 3);
        for result in results {
            assert!(result.passed, "{:?}", result.failures);
            assert_eq!(result.successful_iterations, 2);
        }
    }

    #[test]
    fn failing_expectation_is_reported() {
        let scenario = TestScenario::new(
            "impossible",
            "Impossible",
            SimulationPlan::new(GameplayStrategy::Eager, 3).with_expectation(
                |summary: &SimulationSummary| {
                anyhow::ensure!(summary.metrics.turns > 3, "needs more turns");
                Ok(())
            }),
        );
        let tester = LogicTester::new(GameTester::new(false, None), false);
        let result = &tester.run_scenario(&scenario, &[7], 1)[0];
        assert!(!result.passed);
        assert!(result.failures[0].contains("needs more turns"));
    }

    #[test]
    fn metrics_match_final_state() {
        let plan = SimulationPlan::new(GameplayStrategy::Eager, 15);
        let summary = GameTester::new(false, None).run_plan("check", &plan, 4).unwrap();
        let stats = &summary.final_state.player_stats;
        assert_eq!(summary.metrics.turns, 15);
        assert_eq!(stats.tasks_completed, 15);
        assert_eq!(summary.metrics.xp_earned + quest_xp(&summary), stats.experience);
        assert!(summary.persisted_roundtrip);
    }

    fn quest_xp(summary: &SimulationSummary) -> u64 {
        summary
            .final_state
            .available_quests
            .iter()
            .chain(&summary.final_state.community_quests)
            .filter(|quest| quest.reward.claimed)
            .map(|quest| quest.reward.xp)
            .sum()
    }

    #[test]
    fn scenario_result_serializes_durations_as_millis() {
        let result = ScenarioResult {
            scenario_name: "Smoke".to_string(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        assert_eq!(json["performance_data"][0], 12);
    }
}
