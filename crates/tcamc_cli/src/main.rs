//! `tcamc`: compile classifier rules with port ranges into TCAM
//! ternary entries.
//!
//! Loads a rules file (or the built-in sample), splits each rule into
//! its IP and port halves, expands the port ranges with each selected
//! algorithm, and writes one output file per algorithm next to the
//! input base name: `<base>_PFX.txt`, `<base>_DIRPE.txt`, and so on.
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tcamc_core::encode::Algorithm;
use tcamc_io::prelude::*;

const DEFAULT_RULES: &str = include_str!("default.rules");
const DEFAULT_BASE: &str = "example";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlgArg {
    Pfx,
    Dirpe,
    Srge,
    Cgfe,
}

impl From<AlgArg> for Algorithm {
    fn from(arg: AlgArg) -> Self {
        match arg {
            AlgArg::Pfx => Algorithm::Pfx,
            AlgArg::Dirpe => Algorithm::Dirpe,
            AlgArg::Srge => Algorithm::Srge,
            AlgArg::Cgfe => Algorithm::Cgfe,
        }
    }
}

/// Compile 5-tuple classifier rules into TCAM ternary entries.
#[derive(Parser, Debug)]
#[command(name = "tcamc")]
#[command(version, about, long_about = None)]
struct Args {
    /// Rules file to compile. Uses a built-in sample when omitted.
    rules: Option<PathBuf>,

    /// Algorithm to run; may be given multiple times. Default: all four.
    #[arg(short, long = "algorithm", value_enum)]
    algorithms: Vec<AlgArg>,

    /// Chunk parameter c for DIRPE and CGFE.
    #[arg(short, long, default_value_t = 2)]
    chunk: u32,

    /// Directory for the output files. Default: current directory.
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all logging output.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.quiet, args.verbose);
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let (content, base) = match &args.rules {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            (content, base_name(path))
        }
        None => (DEFAULT_RULES.to_owned(), DEFAULT_BASE.to_owned()),
    };

    // a malformed rules file is fatal before any encoding begins
    let rules = AclRuleLoader.load(&content).context("loading rules")?;
    let (ip_table, port_table) = split_rules(&rules);
    info!(rules = rules.len(), "rules loaded and split into IP and port tables");

    let algorithms: Vec<Algorithm> = if args.algorithms.is_empty() {
        Algorithm::ALL.to_vec()
    } else {
        args.algorithms.iter().map(|&a| a.into()).collect()
    };

    let out_dir = args.out_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;

    for alg in algorithms {
        let entries = expand_rules(&ip_table, &port_table, alg, args.chunk)
            .with_context(|| format!("{alg} expansion"))?;
        let path = out_dir.join(format!("{base}_{}.txt", alg.tag()));
        write_entries(&path, &entries)
            .with_context(|| format!("writing {}", path.display()))?;
        let ratio = if port_table.is_empty() {
            0.0
        } else {
            entries.len() as f64 / port_table.len() as f64
        };
        let expansion = format!("{ratio:.2}x");
        info!(
            %alg,
            rules = port_table.len(),
            entries = entries.len(),
            expansion = %expansion,
            output = %path.display(),
            "expansion complete"
        );
    }
    Ok(())
}

fn base_name(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or(DEFAULT_BASE).to_owned()
}
