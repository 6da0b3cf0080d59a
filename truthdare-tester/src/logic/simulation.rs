use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use truthdare_game::constants::MS_PER_SECOND;
use truthdare_game::{Difficulty, GameSession, Notification, SessionError, TaskType};

use crate::logic::policy::{GameplayStrategy, PlayerPolicy, PolicyDecision, TaskAction};

/// Simulated minutes between the end of one turn and the next draw.
const DEFAULT_TURN_SPACING_MS: i64 = 20 * 60 * MS_PER_SECOND;
/// Simulated time a player spends on a truth before answering.
const TRUTH_THINK_MS: i64 = 15 * MS_PER_SECOND;

/// Configuration for a simulation session.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub difficulty: Difficulty,
    pub turns: u32,
    pub turn_spacing_ms: i64,
}

impl SimulationConfig {
    #[must_use]
    pub fn new(strategy: GameplayStrategy, seed: u64) -> Self {
        Self {
            seed,
            strategy,
            difficulty: Difficulty::default(),
            turns: 50,
            turn_spacing_ms: DEFAULT_TURN_SPACING_MS,
        }
    }

    #[must_use]
    pub fn with_turns(mut self, turns: u32) -> Self {
        self.turns = turns;
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }
}

/// Snapshot of a resolved task.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub turn: u32,
    pub clock_ms: i64,
    pub task_type: TaskType,
    pub prompt: String,
    pub action: TaskAction,
    pub policy_name: String,
    pub rationale: Option<String>,
}

/// Result of advancing the simulation by one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub decision: DecisionRecord,
    pub points_gained: u64,
    pub xp_gained: u64,
    pub used_skip_token: bool,
    pub purchases: Vec<String>,
    pub claimed_quests: Vec<String>,
    pub notifications: Vec<Notification>,
    pub finished: bool,
}

/// Core deterministic simulation harness used by the tester.
pub struct SimulationSession {
    session: GameSession,
    rng: ChaCha20Rng,
    clock_ms: i64,
    turn: u32,
    max_turns: u32,
    turn_spacing_ms: i64,
}

impl SimulationSession {
    /// Drive `session` starting from the simulated `clock_ms`.
    pub fn new(session: GameSession, config: SimulationConfig, clock_ms: i64) -> Self {
        Self {
            session,
            rng: ChaCha20Rng::seed_from_u64(config.seed),
            clock_ms,
            turn: 0,
            max_turns: config.turns,
            turn_spacing_ms: config.turn_spacing_ms,
        }
    }

    #[must_use]
    pub fn into_session(self) -> GameSession {
        self.session
    }

    #[must_use]
    pub const fn clock_ms(&self) -> i64 {
        self.clock_ms
    }

    pub fn advance(&mut self, policy: &mut dyn PlayerPolicy) -> Result<TurnOutcome, SessionError> {
        let mut notifications = Vec::new();
        let purchases = self.go_shopping(policy, &mut notifications);

        let choice = policy.choose_task_type(&self.session);
        let task = match choice {
            Some(task_type) => self.session.draw(&mut self.rng, task_type, self.clock_ms)?,
            None => self.session.draw_random(&mut self.rng, self.clock_ms)?,
        }
        .clone();

        let PolicyDecision { action, rationale } = policy.decide(&self.session, &task);
        let thinking_ms = task
            .time_limit_secs
            .map_or(TRUTH_THINK_MS, |secs| i64::from(secs) * MS_PER_SECOND / 2);
        self.clock_ms += thinking_ms;

        let report = match action {
            TaskAction::Complete => Some(self.session.resolve_pending(true, self.clock_ms)?),
            TaskAction::Skip => Some(self.session.resolve_pending(false, self.clock_ms)?),
            TaskAction::Share => self.session.share_pending(self.clock_ms)?.turn,
        };
        let (points_gained, xp_gained, used_skip_token) = report.as_ref().map_or(
            (0, 0, false),
            |turn| (turn.points_gained, turn.xp_gained, turn.used_skip_token),
        );
        if let Some(turn) = report {
            notifications.extend(turn.notifications);
        }

        let claimed_quests = self.claim_everything(&mut notifications);

        self.turn += 1;
        let decision = DecisionRecord {
            turn: self.turn,
            clock_ms: self.clock_ms,
            task_type: task.task_type,
            prompt: task.prompt,
            action,
            policy_name: policy.name().to_string(),
            rationale,
        };
        self.clock_ms += self.turn_spacing_ms;

        Ok(TurnOutcome {
            decision,
            points_gained,
            xp_gained,
            used_skip_token,
            purchases,
            claimed_quests,
            notifications,
            finished: self.turn >= self.max_turns,
        })
    }

    fn go_shopping(
        &mut self,
        policy: &mut dyn PlayerPolicy,
        notifications: &mut Vec<Notification>,
    ) -> Vec<String> {
        let mut purchases = Vec::new();
        let Some(item_id) = policy.shop(&self.session) else {
            return purchases;
        };
        match self
            .session
            .purchase(item_id, &mut self.rng, self.clock_ms)
        {
            Ok(report) => {
                notifications.extend(report.notifications);
                purchases.push(report.item_id);
            }
            Err(err) => log::debug!("{} could not buy {item_id}: {err}", policy.name()),
        }
        purchases
    }

    fn claim_everything(&mut self, notifications: &mut Vec<Notification>) -> Vec<String> {
        let claimable: Vec<String> = self
            .session
            .state()
            .available_quests
            .iter()
            .chain(&self.session.state().community_quests)
            .filter(|quest| quest.is_claimable())
            .map(|quest| quest.id.clone())
            .collect();
        let mut claimed = Vec::new();
        for quest_id in claimable {
            if let Some(notes) = self.session.claim_quest(&quest_id, self.clock_ms) {
                notifications.extend(notes);
                claimed.push(quest_id);
            }
        }
        claimed
    }
}
