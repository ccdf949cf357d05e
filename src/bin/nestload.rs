//! nestload CLI
//!
//! # Использование
//!
//! ```bash
//! # Загрузить пакет и показать порядок загрузок
//! nestload load pkg/src/App.ns
//!
//! # Дополнительно сослаться на пути после загрузки пакета
//! nestload load pkg/src/App.ns --ref App.Sub.Helper --json
//!
//! # Классифицировать файл
//! nestload classify pkg/src/Sub/Sub.ns App.Sub
//!
//! # Перечислить детей каталога
//! nestload children pkg/src/Sub --exclude pkg/src/Sub/Sub.ns
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;

use nestload::{
    open_package, EnsureOutcome, LayoutConvention, LayoutResolver, LoadEvent, LoadResult,
    NamespacePath, NamespaceRef,
};

/// Lazy namespace loader
#[derive(Parser)]
#[command(name = "nestload")]
#[command(version)]
#[command(about = "Lazy hierarchical namespace loader", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Source file extension
    #[arg(long, global = true, default_value = "ns")]
    ext: String,

    /// Name of the package root directory
    #[arg(long, global = true, default_value = "src")]
    root_dir: String,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Quiet mode
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a package and print the load trace
    Load {
        /// Root file of the package (e.g. src/App.ns)
        root_file: PathBuf,

        /// Namespace paths to reference after the package is loaded
        #[arg(long = "ref")]
        refs: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a file as parent or leaf
    Classify {
        /// Backing file
        file: PathBuf,

        /// Full namespace path declared by the file
        path: String,
    },

    /// List child segments of a parent directory
    Children {
        /// Directory to enumerate
        dir: PathBuf,

        /// The parent's own file, excluded from the listing
        #[arg(long)]
        exclude: Option<PathBuf>,
    },
}

/// Отчёт команды `load`.
#[derive(Serialize)]
struct LoadReport {
    package: NamespacePath,
    loads: Vec<LoadEvent>,
    namespaces: Vec<NamespaceReport>,
    refs: Vec<RefReport>,
    /// Все загруженные пути, включая связанные хостом имена
    loaded: Vec<NamespacePath>,
}

#[derive(Serialize)]
struct NamespaceReport {
    path: NamespacePath,
    file: PathBuf,
    definitions: Vec<String>,
}

#[derive(Serialize)]
struct RefReport {
    reference: String,
    outcome: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let convention = LayoutConvention::new(cli.ext.clone(), cli.root_dir.clone());
    let result = match &cli.command {
        Commands::Load {
            root_file,
            refs,
            json,
        } => run_load(root_file, refs, *json, convention),
        Commands::Classify { file, path } => run_classify(file, path, convention),
        Commands::Children { dir, exclude } => run_children(dir, exclude.as_deref(), convention),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !cli.quiet {
                eprintln!("{}: {}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run_load(
    root_file: &Path,
    refs: &[String],
    json: bool,
    convention: LayoutConvention,
) -> LoadResult<()> {
    let (mut session, mut host) = open_package(root_file, convention)?;
    let caller = session.root().clone();

    let mut reports = Vec::new();
    for text in refs {
        let reference: NamespaceRef = text.parse()?;
        let outcome = match session.ensure_loaded(&mut host, &reference, &caller)? {
            EnsureOutcome::AlreadyLoaded => "already loaded".to_string(),
            EnsureOutcome::Loaded { path, file } => {
                format!("loaded {} from {}", path, file.display())
            }
            EnsureOutcome::Foreign(path) => format!("skipped foreign {}", path),
        };
        reports.push(RefReport {
            reference: text.clone(),
            outcome,
        });
    }

    let namespaces = host
        .namespaces()
        .iter()
        .map(|(path, namespace)| NamespaceReport {
            path: path.clone(),
            file: namespace.file.clone(),
            definitions: namespace.definitions.clone(),
        })
        .collect();

    let report = LoadReport {
        package: caller,
        loads: session.trace().to_vec(),
        namespaces,
        refs: reports,
        loaded: session.registry().paths().into_iter().cloned().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", "package".green().bold(), report.package);
    for event in &report.loads {
        let into = event
            .target
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "<top>".to_string());
        println!(
            "  {:<6} {} <- {} (into {})",
            format!("{:?}", event.kind).to_lowercase(),
            event.path,
            event.file.display(),
            into
        );
    }
    for namespace in &report.namespaces {
        if !namespace.definitions.is_empty() {
            println!(
                "{} {}: {}",
                "defs".yellow(),
                namespace.path,
                namespace.definitions.join(", ")
            );
        }
    }
    for r in &report.refs {
        println!("{} {}: {}", "ref".cyan(), r.reference, r.outcome);
    }

    Ok(())
}

fn run_classify(file: &Path, path: &str, convention: LayoutConvention) -> LoadResult<()> {
    let path: NamespacePath = path.parse()?;
    let resolver = LayoutResolver::new(convention);
    let kind = if resolver.is_parent(file, &path) {
        "parent"
    } else {
        "leaf"
    };
    println!("{}", kind);
    Ok(())
}

fn run_children(dir: &Path, exclude: Option<&Path>, convention: LayoutConvention) -> LoadResult<()> {
    let resolver = LayoutResolver::new(convention);
    let exclude = exclude.unwrap_or_else(|| Path::new(""));
    for child in resolver.list_children(dir, exclude)? {
        println!("{}", child);
    }
    Ok(())
}
