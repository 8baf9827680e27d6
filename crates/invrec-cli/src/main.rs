use anyhow::Result;
use clap::{Parser, Subcommand};
use invrec_audit::VerifyResult;

mod commands;

#[derive(Parser)]
#[command(name = "invrec")]
#[command(about = "Physical inventory reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a counted export and write the file to re-import
    Reconcile {
        /// Flat file with counted quantities filled in
        #[arg(long)]
        input: String,

        /// Destination of the reconciled file (must differ from --input)
        #[arg(long)]
        output: String,

        /// FIFO | LIFO (overrides engine.strategy)
        #[arg(long)]
        strategy: Option<String>,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Also write the run statistics as JSON
        #[arg(long)]
        report: Option<String>,
    },

    /// Counting template commands
    Template {
        #[command(subcommand)]
        cmd: TemplateCmd,
    },

    /// Show how the first lines of a file are laid out
    Inspect {
        #[arg(long)]
        input: String,

        /// Number of non-blank lines to look at
        #[arg(long, default_value_t = invrec_records::DEFAULT_INSPECT_LINES)]
        lines: usize,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> local)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Full pipeline into its own run directory, with manifest and audit log
    Run {
        /// Raw export (counts may be empty)
        #[arg(long)]
        input: String,

        /// Completed counting template; without it the run stops after
        /// writing the template
        #[arg(long)]
        completed: Option<String>,

        #[arg(long)]
        strategy: Option<String>,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Artifact root (overrides storage.root)
        #[arg(long)]
        root: Option<String>,
    },

    /// Audit trail utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum TemplateCmd {
    /// Write the counting template for a raw export
    Render {
        #[arg(long)]
        input: String,

        #[arg(long)]
        output: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Distribute a completed template onto the export and reconcile
    Apply {
        /// Raw export the template was rendered from
        #[arg(long)]
        input: String,

        /// Completed template CSV
        #[arg(long)]
        completed: String,

        #[arg(long)]
        output: String,

        #[arg(long)]
        strategy: Option<String>,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        report: Option<String>,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of an audit log
    Verify {
        /// Path to audit.jsonl
        path: String,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    // stdout carries key=value results; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Reconcile {
            input,
            output,
            strategy,
            config_paths,
            report,
        } => commands::reconcile::reconcile(&input, &output, strategy, &config_paths, report)?,

        Commands::Template { cmd } => match cmd {
            TemplateCmd::Render {
                input,
                output,
                config_paths,
            } => commands::template::render(&input, &output, &config_paths)?,
            TemplateCmd::Apply {
                input,
                completed,
                output,
                strategy,
                config_paths,
                report,
            } => commands::template::apply(
                &input,
                &completed,
                &output,
                strategy,
                &config_paths,
                report,
            )?,
        },

        Commands::Inspect {
            input,
            lines,
            config_paths,
        } => commands::reconcile::inspect(&input, lines, &config_paths)?,

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = invrec_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Run {
            input,
            completed,
            strategy,
            config_paths,
            root,
        } => commands::run::run(&input, completed.as_deref(), strategy, &config_paths, root)?,

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => match invrec_audit::verify_hash_chain(&path)? {
                VerifyResult::Valid { lines } => {
                    println!("audit_valid=true lines={} path={}", lines, path);
                }
                VerifyResult::Broken { line, reason } => {
                    println!("audit_valid=false line={} path={}", line, path);
                    anyhow::bail!("audit chain broken at line {line}: {reason}");
                }
            },
        },
    }

    Ok(())
}
