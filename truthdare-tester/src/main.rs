mod common;
mod logic;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use common::split_csv;
use logic::{
    GameTester, GameplayStrategy, LogicTester, get_scenario, list_scenarios, resolve_seed_inputs,
};
use truthdare_game::Difficulty;

#[derive(Debug, Parser)]
#[command(name = "truthdare-tester", version)]
#[command(about = "Automated QA simulations for the Truth or Dare progression engine")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated integers or 0x-prefixed hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Override the number of turns each scenario plays
    #[arg(long)]
    turns: Option<u32>,

    /// Override the player strategy of every scenario
    #[arg(long, value_enum)]
    strategy: Option<GameplayStrategy>,

    /// Override the difficulty of every scenario (easy, medium, hard)
    #[arg(long, value_parser = parse_difficulty)]
    difficulty: Option<Difficulty>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Persist each finished run as JSON files under this directory
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

fn parse_difficulty(raw: &str) -> Result<Difficulty, String> {
    Difficulty::from_key(raw)
        .ok_or_else(|| format!("unknown difficulty \"{raw}\" (expected easy, medium or hard)"))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let game_tester = GameTester::new(args.verbose, args.save_dir.clone());

    let all_results = run_logic_scenarios(&args, &scenarios, &seeds, &game_tester);

    write_reports(&args, &all_results, start_time)?;

    if all_results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎲 Truth or Dare Automated Tester".bright_cyan().bold());
    println!("{}", "=================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for (key, _) in list_scenarios() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    game_tester: &GameTester,
) -> Vec<logic::ScenarioResult> {
    let mut results: Vec<logic::ScenarioResult> = Vec::new();

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(game_tester.clone(), args.verbose);

    for scenario_name in scenarios {
        let Some(mut scenario) = get_scenario(scenario_name) else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
            continue;
        };
        if let Some(turns) = args.turns {
            scenario.plan.turns = turns;
        }
        if let Some(strategy) = args.strategy {
            scenario.plan.strategy = strategy;
        }
        if let Some(difficulty) = args.difficulty {
            scenario.plan.difficulty = difficulty;
        }
        log::debug!(
            "running {} with {} for {} turns",
            scenario.key,
            scenario.plan.strategy,
            scenario.plan.turns
        );
        results.extend(logic_tester.run_scenario(&scenario, seeds, args.iterations));
    }

    results
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Truth or Dare Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(&mut output_target, results, duration)?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            turns: None,
            strategy: None,
            difficulty: None,
            report: "json".to_string(),
            verbose: false,
            output: None,
            save_dir: None,
        }
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "truthdare-main-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("smoke,all");
        assert_eq!(expanded[0], "smoke");
        assert_eq!(expanded.iter().filter(|s| *s == "smoke").count(), 1);
        assert!(expanded.contains(&"veteran".to_string()));
        assert_eq!(expanded.len(), list_scenarios().len());
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("streaks,smoke");
        assert_eq!(expanded, vec!["streaks".to_string(), "smoke".to_string()]);
    }

    #[test]
    fn parses_difficulty_case_insensitively() {
        assert_eq!(parse_difficulty("HARD"), Ok(Difficulty::Hard));
        assert!(parse_difficulty("brutal").is_err());
    }

    #[test]
    fn overrides_apply_to_every_scenario() {
        let args = Args {
            turns: Some(3),
            strategy: Some(GameplayStrategy::Cautious),
            ..base_args()
        };
        let tester = GameTester::new(false, None);
        let results = run_logic_scenarios(&args, &["smoke".to_string()], &[1], &tester);
        assert_eq!(results.len(), 1);
        // Smoke expects ten completed tasks.
        assert!(!results[0].passed);
    }

    #[test]
    fn unknown_scenarios_are_skipped() {
        let tester = GameTester::new(false, None);
        let results =
            run_logic_scenarios(&base_args(), &["does-not-exist".to_string()], &[1], &tester);
        assert!(results.is_empty());
    }

    #[test]
    fn write_reports_emits_json_output() {
        let temp = temp_path("report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("[]"));
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_path("scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios:"));
        assert!(content.contains("skip-tokens"));
    }

    #[test]
    fn maybe_list_scenarios_is_noop_without_flag() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }
}
