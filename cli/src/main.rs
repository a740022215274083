//! `hkc` - the Hikolang compiler driver.
//!
//! This binary never encodes language-front-end behavior itself. It expands
//! response files, assembles a `Datum` namespace from `--define` and the
//! enum options, constructs a `hikolang_engine::Repository` at
//! `compile_directory`, drives prologue scanning (and, when requested,
//! dependency resolution), and reports the resulting `ErrorList`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod response_file;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hikolang_engine::datum::{Datum, DatumNamespace};
use hikolang_engine::errors::Severity;
use hikolang_engine::remote::FetchFlags;
use hikolang_engine::repository::{self, Repository};
use std::path::PathBuf;

/// Hikolang compiler driver.
#[derive(Parser)]
#[command(name = "hkc", version, about = "Hikolang compiler driver")]
struct Cli {
    /// Increase logging verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the applications and libraries in a repository.
    Build(CommonArgs),
    /// Build and run tests in a repository.
    Test(CommonArgs),
    /// Sign the build artifacts produced by a repository.
    Sign(CommonArgs),
    /// Package and distribute the build artifacts.
    Distribute(CommonArgs),
    /// Fetch (and update) the repository's remote dependencies only.
    Clone(CommonArgs),
    /// List the modules discovered in a repository.
    List(CommonArgs),
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Directory to compile (default: current directory).
    #[arg(default_value = ".")]
    compile_directory: PathBuf,

    /// Type of build to perform.
    #[arg(long, value_enum, default_value = "debug")]
    build_type: BuildType,

    /// Optimization level to use during compilation.
    #[arg(long, value_enum, default_value = "none")]
    optimize_level: OptimizeLevel,

    /// Force a remote refetch of already-cloned dependencies.
    #[arg(long)]
    fetch: bool,

    /// Run tests recursively in all cloned child repositories.
    #[arg(long)]
    test_recursive: bool,

    /// Build recursively in all cloned child repositories.
    #[arg(long)]
    build_recursive: bool,

    /// Additional directory to treat as a repository (repeatable).
    #[arg(long = "local-repository")]
    local_repositories: Vec<PathBuf>,

    /// Additional search path for `import lib` (repeatable).
    #[arg(long = "library-path")]
    library_paths: Vec<PathBuf>,

    /// A `name=value` build-guard define (repeatable).
    #[arg(long = "define")]
    defines: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy)]
enum BuildType {
    Debug,
    Release,
}

impl BuildType {
    fn as_str(self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Release => "release",
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum OptimizeLevel {
    None,
    Basic,
    Aggressive,
    Size,
}

fn main() -> Result<()> {
    let raw_args: Vec<String> = std::env::args().collect();
    let (bin, rest) = raw_args.split_first().context("no argv[0]")?;
    let expanded = response_file::expand(rest.to_vec())?;
    let mut argv = vec![bin.clone()];
    argv.extend(expanded);

    let cli = match Cli::try_parse_from(&argv) {
        Ok(cli) => cli,
        Err(err) => {
            err.print().ok();
            std::process::exit(2);
        }
    };

    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Build(args) => run(Action::Build, args),
        Commands::Test(args) => run(Action::Test, args),
        Commands::Sign(args) => run(Action::Sign, args),
        Commands::Distribute(args) => run(Action::Distribute, args),
        Commands::Clone(args) => run(Action::Clone, args),
        Commands::List(args) => run(Action::List, args),
    }?;
    std::process::exit(code);
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Action {
    Build,
    Test,
    Sign,
    Distribute,
    Clone,
    List,
}

fn run(action: Action, args: CommonArgs) -> Result<i32> {
    let compile_directory = std::fs::canonicalize(&args.compile_directory).with_context(|| {
        format!("compile directory '{}' does not exist", args.compile_directory.display())
    })?;

    let config_overrides = hikolang_engine::config::Config {
        build_type: Some(args.build_type.as_str().to_owned()),
        optimize_level: Some(match args.optimize_level {
            OptimizeLevel::None => 0,
            OptimizeLevel::Basic => 1,
            OptimizeLevel::Aggressive => 2,
            OptimizeLevel::Size => 3,
        }),
        fetch: args.fetch,
        test_recursive: args.test_recursive,
        build_recursive: args.build_recursive,
        local_repositories: args.local_repositories.iter().map(|p| p.display().to_string()).collect(),
        library_paths: args.library_paths.iter().map(|p| p.display().to_string()).collect(),
        defines: args.defines.clone(),
        max_workers: None,
    };
    let config = hikolang_engine::config::load(&compile_directory, config_overrides)
        .context("failed to load hikolang.toml configuration")?;

    let mut env = DatumNamespace::new();
    env.set("build_type", Datum::String(config.build_type.clone().unwrap_or_else(|| "debug".to_owned())));
    env.set("optimize_level", Datum::Integer(config.optimize_level.unwrap_or(0) as i64));
    for define in &config.defines {
        let Some((name, value)) = define.split_once('=') else {
            anyhow::bail!("malformed --define '{}', expected name=value", define);
        };
        env.set(name, Datum::String(value.to_owned()));
    }

    log::info!("scanning repository at {}", compile_directory.display());
    let mut repo = Repository::new(compile_directory.clone(), None);
    repo.gather().with_context(|| format!("failed to scan '{}'", compile_directory.display()))?;
    repo.parse_prologues();
    repo.evaluate_build_guards(&env);

    let should_fetch = config.fetch || matches!(action, Action::Clone);
    let should_recurse = should_fetch || config.test_recursive || config.build_recursive;
    if should_recurse {
        let flags = FetchFlags { force_fetch: config.fetch, ..FetchFlags::default() };
        repository::resolve(&mut repo, &env, flags);
    } else {
        repository::check_module_consistency(&mut repo);
    }

    match action {
        Action::List => {
            for source in repo.sorted_by_module_name() {
                println!("{}", source.path.display());
            }
        }
        Action::Clone => {
            log::info!("cloned {} child repositories", repo.children.len());
        }
        Action::Build | Action::Test | Action::Sign | Action::Distribute => {
            log::info!(
                "{} action complete for {} source file(s) across {} repositories",
                action_name(action),
                repo.sources_by_path.len(),
                repo.children.len() + 1
            );
        }
    }

    let worst = repo
        .sources_by_path
        .iter()
        .chain(repo.children.iter().flat_map(|c| c.sources_by_path.iter()))
        .filter_map(|s| s.errors.worst_severity())
        .max_by_key(severity_rank);

    Ok(match worst {
        None | Some(Severity::Informational) | Some(Severity::Warning) => 0,
        Some(Severity::Error) => 1,
        Some(Severity::Fatal) => 3,
        Some(Severity::Security) => 4,
    })
}

fn action_name(action: Action) -> &'static str {
    match action {
        Action::Build => "build",
        Action::Test => "test",
        Action::Sign => "sign",
        Action::Distribute => "distribute",
        Action::Clone => "clone",
        Action::List => "list",
    }
}

fn severity_rank(s: &Severity) -> u8 {
    match s {
        Severity::Informational => 0,
        Severity::Warning => 1,
        Severity::Error => 2,
        Severity::Fatal => 3,
        Severity::Security => 4,
    }
}
