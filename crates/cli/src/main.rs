//! causal - query discrete causal models from the command line.
//!
//! Usage:
//!   causal -g model.json p "Y = y | do(X = x)"     # probability query
//!   causal -g model.json backdoors "X -> Y | Z"    # open backdoor paths
//!   causal -g model.json deconfound "X -> Y"       # deconfounding sets
//!   causal -g model.json jdt                       # joint distribution
//!   causal -g model.json topology                  # topological order
//!   causal -g model.json repl                      # interactive shell
//!
//! Exit codes: 0 success, 1 malformed model, 2 query parse error,
//! 3 do-calculus failure, 4 I/O error.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use causal_engine::{
    ChooseDeconfounder, Context, DeconfoundingPolicy, Do, EngineError,
};
use causal_model::{Assertion, Model, ModelError};

mod parse;

use parse::{parse_path_query, parse_probability_query, ParseError};

#[derive(Parser)]
#[command(name = "causal")]
#[command(about = "Causal inference over discrete Bayesian networks with do-calculus")]
#[command(version)]
struct Cli {
    /// Model file (.json, .yml or .yaml)
    #[arg(short, long, global = true)]
    graph_file: Option<PathBuf>,

    /// Seed for the deconfounding-set RNG
    #[arg(long, global = true, default_value_t = 0)]
    seed: u64,

    /// Report only inclusion-minimal deconfounding sets
    #[arg(long, global = true)]
    minimal_sets: bool,

    /// How to pick among deconfounding sets
    #[arg(long, global = true, value_enum, default_value = "all")]
    deconfounding_policy: PolicyArg,

    /// Maximum rewrite depth for the do-calculus search
    #[arg(long, global = true, default_value_t = 12)]
    depth_bound: usize,

    /// Enable derivation logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Ask,
    Random,
    All,
}

impl From<PolicyArg> for DeconfoundingPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Ask => DeconfoundingPolicy::Ask,
            PolicyArg::Random => DeconfoundingPolicy::Random,
            PolicyArg::All => DeconfoundingPolicy::All,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a probability, e.g. "Y = y | X = ~x, do(Z = z)"
    P { query: String },

    /// List open backdoor paths, e.g. "X -> Y | Z"
    Backdoors { query: String },

    /// List deconfounding sets, e.g. "X -> Y"
    Deconfound { query: String },

    /// Print the joint distribution over all non-latent variables
    Jdt,

    /// Print the topological order of the variables
    Topology,

    /// Interactive shell (supports switching model files with `load`)
    Repl,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::from(exit_code(&error))
        }
    }
}

fn exit_code(error: &anyhow::Error) -> u8 {
    if error.downcast_ref::<ParseError>().is_some() {
        return 2;
    }
    if let Some(model) = error.downcast_ref::<ModelError>() {
        return match model {
            ModelError::Io { .. } => 4,
            _ => 1,
        };
    }
    if let Some(engine) = error.downcast_ref::<EngineError>() {
        return match engine {
            EngineError::Model(ModelError::Io { .. }) => 4,
            EngineError::Model(_) => 1,
            EngineError::QueryShape { .. } | EngineError::Graph(_) => 2,
            EngineError::DoCalculusFailed { .. }
            | EngineError::Indeterminable { .. }
            | EngineError::ZeroProbability { .. }
            | EngineError::NumericDrift { .. }
            | EngineError::InconsistentDeconfounding { .. } => 3,
        };
    }
    1
}

fn run(cli: Cli) -> Result<()> {
    if matches!(cli.command, Commands::Repl) {
        return repl(&cli);
    }

    let graph_file = cli
        .graph_file
        .clone()
        .context("no model given; pass --graph-file <path>")?;
    let model = Model::from_file(&graph_file)?;
    let mut session = Do::with_context(model, build_context(&cli));

    match &cli.command {
        Commands::P { query } => {
            let (head, body) = parse_probability_query(query)?;
            print_probability(&mut session, &head, &body)?;
        }
        Commands::Backdoors { query } => {
            let (src, dst, blockers) = parse_path_query(query)?;
            print_backdoors(&mut session, &src, &dst, &blockers)?;
        }
        Commands::Deconfound { query } => {
            let (src, dst, _) = parse_path_query(query)?;
            print_deconfounders(&session, &src, &dst)?;
        }
        Commands::Jdt => print_jdt(&mut session)?,
        Commands::Topology => {
            println!("{}", session.topological_order().join(", "));
        }
        Commands::Repl => {}
    }
    Ok(())
}

fn build_context(cli: &Cli) -> Context {
    let mut ctx = Context::default()
        .with_seed(cli.seed)
        .with_minimal_sets(cli.minimal_sets)
        .with_policy(cli.deconfounding_policy.into())
        .with_depth_bound(cli.depth_bound);
    if ctx.policy == DeconfoundingPolicy::Ask {
        ctx = ctx.with_chooser(Box::new(StdinChooser));
    }
    ctx
}

/// Prompts on stdout and reads the selection from stdin, for the `ask`
/// deconfounding policy.
struct StdinChooser;

impl ChooseDeconfounder for StdinChooser {
    fn choose(&mut self, sets: &[BTreeSet<String>]) -> usize {
        println!("Select a deconfounding set:");
        for (i, set) in sets.iter().enumerate() {
            println!(
                "  {}) {{ {} }}",
                i + 1,
                set.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        loop {
            print!("Selection: ");
            let _ = io::stdout().flush();
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_err() {
                return 0;
            }
            if let Ok(choice) = line.trim().parse::<usize>() {
                if (1..=sets.len()).contains(&choice) {
                    return choice - 1;
                }
            }
        }
    }
}

fn print_probability(
    session: &mut Do,
    head: &[Assertion],
    body: &[Assertion],
) -> Result<()> {
    let (expression, value) = session.query(head, body)?;
    println!("{}", expression);
    println!("{} = {:.5}", causal_engine::query_key(head, body), value);
    Ok(())
}

fn print_backdoors(
    session: &mut Do,
    src: &BTreeSet<String>,
    dst: &BTreeSet<String>,
    blockers: &BTreeSet<String>,
) -> Result<()> {
    let paths = session.backdoor_paths(src, dst, blockers)?;
    if paths.is_empty() {
        println!("no open backdoor paths");
    } else {
        for path in paths {
            println!("{}", path.join(", "));
        }
    }
    Ok(())
}

fn print_deconfounders(
    session: &Do,
    src: &BTreeSet<String>,
    dst: &BTreeSet<String>,
) -> Result<()> {
    let sets = session.deconfounding_sets(src, dst)?;
    if sets.is_empty() {
        println!("no deconfounding sets");
    } else {
        for set in sets {
            println!(
                "{{ {} }}",
                set.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
    }
    Ok(())
}

fn print_jdt(session: &mut Do) -> Result<()> {
    for (assignment, probability) in session.joint_distribution_table()? {
        let rendered: Vec<String> = assignment.iter().map(|a| a.to_string()).collect();
        println!("P({}) = {:.5}", rendered.join(", "), probability);
    }
    Ok(())
}

/// The interactive shell. `load <path>` switches model files in place.
fn repl(cli: &Cli) -> Result<()> {
    let mut session = match &cli.graph_file {
        Some(path) => Some(Do::with_context(Model::from_file(path)?, build_context(cli))),
        None => None,
    };

    println!("commands: p, backdoors, deconfound, jdt, topology, load <file>, quit");
    let stdin = io::stdin();
    loop {
        print!(">> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, argument) = match line.split_once(' ') {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        if matches!(command, "quit" | "exit" | "q") {
            break;
        }
        if command == "load" {
            match Model::from_file(argument) {
                Ok(model) => {
                    session = Some(Do::with_context(model, build_context(&cli)));
                    println!("loaded {}", argument);
                }
                Err(error) => eprintln!("error: {}", error),
            }
            continue;
        }

        let Some(active) = session.as_mut() else {
            eprintln!("no model loaded; use: load <file>");
            continue;
        };

        let outcome = match command {
            "p" => parse_probability_query(argument)
                .map_err(anyhow::Error::from)
                .and_then(|(head, body)| print_probability(active, &head, &body)),
            "backdoors" => parse_path_query(argument)
                .map_err(anyhow::Error::from)
                .and_then(|(src, dst, blockers)| {
                    print_backdoors(active, &src, &dst, &blockers)
                }),
            "deconfound" => parse_path_query(argument)
                .map_err(anyhow::Error::from)
                .and_then(|(src, dst, _)| print_deconfounders(active, &src, &dst)),
            "jdt" => print_jdt(active),
            "topology" => {
                println!("{}", active.topological_order().join(", "));
                Ok(())
            }
            _ => {
                eprintln!("unknown command '{}'; try: p, backdoors, deconfound, jdt, topology, load, quit", command);
                Ok(())
            }
        };
        if let Err(error) = outcome {
            eprintln!("error: {:#}", error);
        }
    }
    Ok(())
}
