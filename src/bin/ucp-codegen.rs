//! UCP Codegen CLI
//!
//! Command-line interface for compiling UCP schemas into Rust modules.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use ucp_codegen::{BatchReport, CompileOptions, Compiler, OutcomeStatus, DEFAULT_MODULE_PREFIX};

#[derive(Parser)]
#[command(name = "ucp-codegen")]
#[command(about = "Compile UCP JSON Schemas into typed Rust validation modules")]
#[command(version)]
struct Cli {
    /// Log resolution and generation details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a single schema file
    Compile {
        /// Schema file to compile
        schema: PathBuf,

        /// Module name (derived from the file location if not specified)
        #[arg(long)]
        module: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Namespace prefix for derived module names
        #[arg(long, env = "UCP_CODEGEN_PREFIX", default_value = DEFAULT_MODULE_PREFIX)]
        prefix: String,

        /// Schema root for module names (detected if not specified)
        #[arg(long)]
        schema_root: Option<PathBuf>,

        /// Print the module spec as JSON instead of Rust source
        #[arg(long)]
        spec: bool,
    },

    /// Compile every schema under a directory
    Batch {
        /// Schema root directory
        path: Option<PathBuf>,

        /// Output directory (cleared before writing)
        #[arg(long, default_value = "generated")]
        output: PathBuf,

        /// Namespace prefix for derived module names
        #[arg(long, env = "UCP_CODEGEN_PREFIX", default_value = DEFAULT_MODULE_PREFIX)]
        prefix: String,

        /// Report planned output without writing files
        #[arg(long)]
        dry_run: bool,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Compile {
            schema,
            module,
            output,
            prefix,
            schema_root,
            spec,
        } => {
            let mut options = CompileOptions::new().prefix(prefix);
            if let Some(root) = schema_root {
                options = options.schema_root(root);
            }
            run_compile(&schema, module.as_deref(), output, options, spec)
        }

        Commands::Batch {
            path,
            output,
            prefix,
            dry_run,
            format,
        } => match path {
            Some(path) => run_batch(&path, &output, CompileOptions::new().prefix(prefix), dry_run, &format),
            None => {
                eprintln!("Error: no schema directory given");
                Err(2)
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_compile(
    schema: &Path,
    module: Option<&str>,
    output: Option<PathBuf>,
    options: CompileOptions,
    spec: bool,
) -> Result<(), u8> {
    let compiled = Compiler::new(options)
        .compile_file(schema, module)
        .map_err(|e| {
            eprintln!("Error: {}: {}", schema.display(), e);
            e.exit_code() as u8
        })?;

    if compiled.fallback {
        eprintln!(
            "Warning: {} could not be fully resolved; generated with the direct pass",
            schema.display()
        );
    }

    let text = if spec {
        serde_json::to_string_pretty(&compiled.spec).map_err(|e| {
            eprintln!("Error serializing spec: {}", e);
            2u8
        })?
    } else {
        compiled.source
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &text).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            print!("{}", text);
            if spec {
                println!();
            }
        }
    }

    Ok(())
}

fn run_batch(
    path: &Path,
    output: &Path,
    options: CompileOptions,
    dry_run: bool,
    format: &str,
) -> Result<(), u8> {
    if !path.is_dir() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let report = Compiler::new(options)
        .batch(path, output, dry_run)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    if format == "json" {
        let json = serde_json::to_string_pretty(&report).map_err(|e| {
            eprintln!("Error serializing report: {}", e);
            2u8
        })?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    // Per-file failures are reported, not fatal
    Ok(())
}

fn print_report(report: &BatchReport) {
    if report.dry_run {
        println!(
            "Planning {} -> {} (dry run)\n",
            report.root.display(),
            report.output_dir.display()
        );
    } else {
        println!(
            "Compiling {} -> {} ...\n",
            report.root.display(),
            report.output_dir.display()
        );
    }

    for outcome in &report.outcomes {
        let file = outcome.file.display();
        let target = outcome
            .output
            .as_ref()
            .map(|o| report.output_dir.join(o).display().to_string())
            .unwrap_or_default();
        match outcome.status {
            OutcomeStatus::Generated => println!("  \x1b[32m✓\x1b[0m {} -> {}", file, target),
            OutcomeStatus::Fallback => {
                println!("  \x1b[33m⚠\x1b[0m {} -> {} (fallback)", file, target)
            }
            OutcomeStatus::Skipped => println!("  - {} (skipped: no generatable shape)", file),
            OutcomeStatus::Failed => println!(
                "  \x1b[31m✗\x1b[0m {}: {}",
                file,
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    println!();
    println!(
        "{} generated, {} failed ({} skipped)",
        report.generated, report.failed, report.skipped
    );
}
