#[macro_use]
extern crate failure;

use clap::{Parser, Subcommand, ValueEnum};
use cns::bundle::{AgentDeployer, BundleEmitter, DryRunDeployer, ValuesFileEmitter};
use cns::config::CnsConfig;
use cns::snapshot::FileSnapshotSource;
use cns_core::{Criteria, CriteriaQuery, ErrorKind, RecipeCriteriaDocument, SnapshotSource};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cns", about = "Declarative recipe builder for GPU Kubernetes clusters", version)]
struct Cli {
    /// External recipe/registry directory, layered over the embedded defaults.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Build time budget in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbosity: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct CriteriaArgs {
    /// Load a base criteria tuple from a recipeCriteria document; any of
    /// the flags below override its fields individually.
    #[arg(long)]
    criteria: Option<PathBuf>,
    #[arg(long)]
    service: Option<String>,
    #[arg(long, visible_alias = "gpu")]
    accelerator: Option<String>,
    #[arg(long)]
    intent: Option<String>,
    #[arg(long)]
    os: Option<String>,
    #[arg(long)]
    nodes: Option<String>,
}

impl From<CriteriaArgs> for CriteriaQuery {
    fn from(a: CriteriaArgs) -> Self {
        CriteriaQuery { service: a.service, accelerator: a.accelerator, intent: a.intent, os: a.os, nodes: a.nodes }
    }
}

/// Resolves a [`CriteriaArgs`] into a final [`Criteria`]: a `--criteria`
/// document (if given) supplies the base tuple, and the individual
/// `--service`/`--accelerator`/etc. flags override its fields one at a time.
fn resolve_criteria(args: CriteriaArgs) -> cns::Result<Criteria> {
    let base = match &args.criteria {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            let doc: RecipeCriteriaDocument = serde_yaml::from_slice(&bytes)?;
            doc.validate_header(&path.display().to_string())?;
            doc.spec
        }
        None => Criteria::default(),
    };
    let query: CriteriaQuery = args.into();
    Ok(query.apply_over(base)?)
}

#[derive(Copy, Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
    Table,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve and print a recipe.
    Recipe {
        #[command(flatten)]
        criteria: CriteriaArgs,
        /// Resolve criteria from a snapshot instead (cm://namespace/name). Takes
        /// precedence over any criteria flags when set.
        #[arg(long)]
        snapshot_uri: Option<String>,
        /// Root directory snapshot fixtures are read from when `--snapshot-uri` is set.
        #[arg(long, default_value = ".")]
        snapshot_root: PathBuf,
        #[arg(long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },
    /// Resolve a recipe and write it out as a per-component bundle.
    Bundle {
        #[command(flatten)]
        criteria: CriteriaArgs,
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch and print a cluster snapshot.
    Snapshot {
        uri: String,
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Check the configured recipe/registry data for structural defects.
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    loggerv::init_with_verbosity(cli.verbosity.into()).ok();
    let cfg = CnsConfig::resolve(cli.data_dir.clone(), cli.timeout_secs, cli.verbosity.into());

    match run(&cfg, cli) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn run(cfg: &CnsConfig, cli: Cli) -> cns::Result<()> {
    cns::init(cfg)?;
    match cli.command {
        Command::Recipe { criteria, snapshot_uri, snapshot_root, format } => {
            let doc = match snapshot_uri {
                Some(uri) => {
                    let source = FileSnapshotSource::new(snapshot_root);
                    cns::recipe::build_by_snapshot(&source, &uri, cfg.build_timeout)?
                }
                None => cns::recipe::build_by_resolved_criteria(resolve_criteria(criteria)?, cfg.build_timeout)?,
            };
            print_document(&doc, format)?;
            Ok(())
        }
        Command::Bundle { criteria, out_dir, dry_run } => {
            let result_criteria = resolve_criteria(criteria)?;
            let builder = cns_core::Builder::new(cns_core::shared_store()?);
            let result = builder.build_from_criteria(&result_criteria, cfg.build_timeout)?;
            ValuesFileEmitter.emit(&result, &out_dir)?;
            if dry_run {
                DryRunDeployer.deploy(&result, &out_dir)?;
            }
            println!("wrote bundle for {} component(s) to {}", result.components.len(), out_dir.display());
            Ok(())
        }
        Command::Snapshot { uri, root } => {
            let source = FileSnapshotSource::new(root);
            let snapshot = source.fetch(&uri)?;
            println!("{}", serde_yaml::to_string(&snapshot)?);
            Ok(())
        }
        Command::Validate => {
            let report = cns::validate::run()?;
            println!("{}", serde_yaml::to_string(&report)?);
            if !report.is_clean() {
                return Err(failure::format_err!("{} defect(s) found", report.defects.len()));
            }
            Ok(())
        }
    }
}

fn print_document(doc: &cns::recipe::RecipeOutputDocument, format: OutputFormat) -> cns::Result<()> {
    match format {
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(doc)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(doc)?),
        OutputFormat::Table => print_table(doc),
    }
    Ok(())
}

/// A compact operator-facing rendering: one line per component in
/// `deploymentOrder`, followed by the applied/excluded overlay summary.
/// Not meant to round-trip; `yaml`/`json` remain the machine-readable forms.
fn print_table(doc: &cns::recipe::RecipeOutputDocument) {
    println!("{:<24} {:<11} {:<40} {}", "COMPONENT", "TYPE", "SOURCE", "VERSION/TAG");
    let by_name: std::collections::BTreeMap<_, _> = doc.components.iter().map(|c| (c.name.as_str(), c)).collect();
    for name in &doc.deployment_order {
        let Some(c) = by_name.get(name.as_str()) else { continue };
        let kind = c.component_type.unwrap_or("-");
        let source = c.source.as_deref().unwrap_or("-");
        let version = c.version.as_deref().or(c.tag.as_deref()).unwrap_or("-");
        println!("{:<24} {:<11} {:<40} {}", c.name, kind, source, version);
    }
    println!();
    println!("applied:  {}", doc.applied_overlays.join(", "));
    if !doc.excluded_overlays.is_empty() {
        println!("excluded: {}", doc.excluded_overlays.join(", "));
    }
    for w in &doc.constraint_warnings {
        println!("warning:  [{}] {} -- {}", w.overlay, w.constraint, w.reason.as_deref().unwrap_or("failed"));
    }
}

/// Maps the core's error taxonomy onto the CLI's exit-code convention:
/// `0` success, `1` the caller's request was bad or not found, `2` an
/// internal failure.
fn exit_code_for(err: &failure::Error) -> u8 {
    for cause in err.iter_chain() {
        if let Some(cns_err) = cause.downcast_ref::<cns_core::CnsError>() {
            return match cns_err.kind() {
                ErrorKind::InvalidRequest(_) | ErrorKind::NotFound(_) | ErrorKind::Timeout(_) => 1,
                ErrorKind::Internal(_) => 2,
            };
        }
    }
    2
}
