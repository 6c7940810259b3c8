//! Command-line driver: load a JSON catalogue, solve, print selections.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;

use feedsel_solver::{solve_for, Catalog, FeedPool, Requirements, Solution};

#[derive(Parser, Debug)]
#[command(
    name = "feedsel",
    version,
    about = "Select a mutually consistent set of component implementations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Solve for an interface and print the selections document
    Select(SelectArgs),
}

#[derive(Args, Debug)]
struct SelectArgs {
    /// Interface URI to solve for
    interface: String,

    /// Command the selected implementation must provide
    #[arg(long)]
    command: Option<String>,

    /// Catalogue file (JSON)
    #[arg(long, default_value = "catalog.json")]
    catalog: PathBuf,

    /// Target OS tag (defaults to the host)
    #[arg(long)]
    os: Option<String>,

    /// Target CPU tag (defaults to the host)
    #[arg(long)]
    cpu: Option<String>,

    /// Select source rather than binary implementations
    #[arg(long)]
    source: bool,

    /// Offer compiled-from-source candidates when no binary fits
    #[arg(long)]
    may_compile: bool,

    /// Extra version restriction (repeatable)
    #[arg(long = "restrict", value_name = "IFACE=EXPR")]
    restrictions: Vec<String>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Select(args) => select(args),
    }
}

fn select(args: SelectArgs) -> Result<ExitCode> {
    let data = fs::read_to_string(&args.catalog)
        .with_context(|| format!("reading {}", args.catalog.display()))?;
    let catalog: Catalog = serde_json::from_str(&data)
        .with_context(|| format!("parsing {}", args.catalog.display()))?;

    let mut requirements = Requirements::new(&args.interface);
    requirements.command = args.command;
    requirements.os = args.os;
    requirements.machine = args.cpu;
    requirements.source = args.source;
    requirements.may_compile = args.may_compile;
    for restriction in &args.restrictions {
        let (iface, expr) = restriction
            .split_once('=')
            .context("--restrict takes IFACE=EXPR")?;
        requirements
            .extra_restrictions
            .insert(iface.to_string(), expr.to_string());
    }

    let (ok, solution) = solve_for(&requirements, |scope| FeedPool::new(&catalog, scope))?;

    if ok {
        print!("{}", solution.selections());
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!(
        "{}",
        style("No valid set of selections; closest match follows.").red().bold()
    );
    print!("{}", solution.selections());
    report_failures(&solution);
    Ok(ExitCode::FAILURE)
}

/// For every interface that only the dummy could fill, explain what kept
/// the real candidates out.
fn report_failures(solution: &Solution) {
    for (iface, selected) in solution.implementations() {
        let Some((_, imp)) = selected else { continue };
        if !imp.is_dummy() {
            continue;
        }

        eprintln!();
        eprintln!("{}", style(format!("{}: no usable candidate", iface)).yellow());

        if let Some(candidates) = solution.candidates(&iface) {
            for (lit, candidate) in &candidates.vars {
                if candidate.is_dummy() {
                    continue;
                }
                eprint!("{}", solution.explain(*lit));
            }
        }
        for (candidate, reason) in solution.impl_provider().get_implementations(&iface).rejects {
            eprintln!("  {} rejected: {}", candidate, reason);
        }
    }
}
