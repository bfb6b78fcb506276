mod policy;
mod reports;
mod simulation;
mod util;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use policy::PolicyKind;
use simulation::{RunRecord, SimulationConfig, SimulationReport, run_game, summarize};
use swipefate_game::{
    CardSelection, EngineOptions, FileHistoryStore, GameConfig, GameHistory, NewGameOptions,
};
use util::{parse_seeds, split_csv};

#[derive(Debug, Parser)]
#[command(name = "swipefate-cli", version = "0.1.0")]
#[command(about = "Headless auto-play for SwipeFate scenarios")]
struct Args {
    /// Scenario JSON to play
    #[arg(long, default_value = "assets/scenarios/kingdom.json")]
    scenario: PathBuf,

    /// Policies to run (comma-separated, or "all")
    #[arg(long, default_value = "all")]
    policies: String,

    /// List all available policies and exit
    #[arg(long)]
    list_policies: bool,

    /// Seeds to run (comma-separated, 0x for hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Games per policy and seed; each iteration bumps the seed by one
    #[arg(long, default_value_t = 10)]
    iterations: u64,

    /// Stop a game that has not ended after this many turns
    #[arg(long, default_value_t = 200)]
    max_turns: u32,

    /// Card draw strategy: uniform or prefer-unseen
    #[arg(long, default_value = "uniform")]
    selection: CardSelection,

    /// Difficulty name from the scenario's modifiers
    #[arg(long, default_value = "standard")]
    difficulty: String,

    /// Player name recorded in the history
    #[arg(long, default_value = "Autoplayer")]
    player: String,

    /// Multiply negative effects by the difficulty modifier
    #[arg(long)]
    scale_penalties: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Keep every decision in the JSON report
    #[arg(long)]
    decisions: bool,

    /// Record finished games into the history under this directory
    #[arg(long)]
    history_dir: Option<PathBuf>,

    /// Record finished games into the history in the home directory
    #[arg(long, conflicts_with = "history_dir")]
    record: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_policies(&args)? {
        return Ok(());
    }

    if args.output.is_some() || args.report == "console" {
        announce_banner();
    }

    let start_time = Instant::now();
    let config = GameConfig::from_path(&args.scenario)
        .with_context(|| format!("failed to load scenario {}", args.scenario.display()))?;
    if !config
        .game_settings
        .difficulty_modifiers
        .contains_key(&args.difficulty)
    {
        log::warn!(
            "difficulty '{}' is not listed by {}; using a modifier of 1.0",
            args.difficulty,
            config.game_info.title
        );
    }

    let policies = expand_policies(&args.policies)?;
    let seeds = parse_seeds(&args.seeds)?;
    let mut history = open_history(&args)?;

    let runs = run_simulations(&args, &config, &policies, &seeds, history.as_mut())?;
    let report = SimulationReport {
        scenario: config.game_info.title.clone(),
        summaries: summarize(&runs),
        runs,
        history: history.as_ref().map(GameHistory::get_statistics),
    };

    write_reports(&args, &report, start_time)
}

fn maybe_list_policies(args: &Args) -> Result<bool> {
    if !args.list_policies {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available policies:")?;
    for kind in PolicyKind::ALL {
        writeln!(
            output_target.writer(),
            "  {:10} - {}",
            kind.key(),
            kind.description()
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🃏 SwipeFate Autoplayer".bright_cyan().bold());
    println!("{}", "=======================".cyan());
}

fn expand_policies(policies_arg: &str) -> Result<Vec<PolicyKind>> {
    let mut policies: Vec<PolicyKind> = Vec::new();
    for token in split_csv(policies_arg) {
        let expanded = if token.eq_ignore_ascii_case("all") {
            PolicyKind::ALL.to_vec()
        } else {
            vec![token.parse::<PolicyKind>().map_err(anyhow::Error::msg)?]
        };
        for kind in expanded {
            if !policies.contains(&kind) {
                policies.push(kind);
            }
        }
    }
    if policies.is_empty() {
        bail!("no policies selected");
    }
    Ok(policies)
}

fn open_history(args: &Args) -> Result<Option<GameHistory<FileHistoryStore>>> {
    let store = if let Some(dir) = &args.history_dir {
        FileHistoryStore::in_dir(dir.clone())
            .with_context(|| format!("failed to prepare history in {}", dir.display()))?
    } else if args.record {
        FileHistoryStore::default_location().context("failed to locate the history file")?
    } else {
        return Ok(None);
    };
    log::info!("recording games to {}", store.path().display());
    Ok(Some(GameHistory::open(store)))
}

fn simulation_config(args: &Args, policy: PolicyKind, seed: u64) -> SimulationConfig {
    let mut sim = SimulationConfig::new(policy, seed).with_max_turns(args.max_turns);
    sim.engine = EngineOptions {
        card_selection: args.selection,
        scale_penalties: args.scale_penalties,
        ..EngineOptions::default()
    };
    sim.player = NewGameOptions::default()
        .with_player(args.player.clone())
        .with_difficulty(args.difficulty.clone());
    sim
}

fn run_simulations(
    args: &Args,
    config: &GameConfig,
    policies: &[PolicyKind],
    seeds: &[u64],
    mut history: Option<&mut GameHistory<FileHistoryStore>>,
) -> Result<Vec<RunRecord>> {
    let mut runs = Vec::new();
    for &policy in policies {
        for &base_seed in seeds {
            for iteration in 0..args.iterations.max(1) {
                let seed = base_seed.wrapping_add(iteration);
                let sim = simulation_config(args, policy, seed);
                let started = Instant::now();
                let run = run_game(config, &sim, history.as_deref_mut(), args.decisions)?;
                if args.verbose {
                    let status = if run.won { "✅" } else { "❌" };
                    eprintln!(
                        "{} [{} seed {}] {} turns - {} - {:?}",
                        status,
                        policy.key().green(),
                        seed,
                        run.turns,
                        run.message,
                        started.elapsed()
                    );
                }
                runs.push(run);
            }
        }
    }
    Ok(runs)
}

fn write_reports(args: &Args, report: &SimulationReport, start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, report)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, report)?,
        _ => {
            reports::generate_console_report(&mut output_target, report, start_time.elapsed())?;
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
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
