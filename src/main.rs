//! kube-lineage - display the dependents of a Kubernetes object as a tree
//!
//! Fetches every object from the cluster (or a manifest file), resolves
//! ownership and reference relationships between them, and prints the
//! lineage below the requested object.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kube_lineage::cli::{
    ConfigSubcommand, LineageRequest, handle_config_command, init_logging, run_lineage,
};
use kube_lineage::config::{Config, ConfigLoader};
use kube_lineage::lineage::TargetRef;
use kube_lineage::{ClusterSource, FileSource, ObjectSource, OutputFormat, format_rows};

/// Display all dependents of a Kubernetes object
#[derive(Parser, Debug)]
#[command(name = "kube-lineage", version)]
#[command(about = "Display all dependents of a Kubernetes object", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    /// RESOURCE/NAME or RESOURCE NAME; omit to show every lineage root
    #[arg(value_name = "RESOURCE", num_args = 0..=2)]
    target: Vec<String>,

    /// Namespace of the target object
    #[arg(long, short = 'n')]
    namespace: Option<String>,

    /// Look up the target across all namespaces
    #[arg(long, short = 'A', conflicts_with = "namespace")]
    all_namespaces: bool,

    /// Kubeconfig context to use
    #[arg(long)]
    context: Option<String>,

    /// Read objects from a YAML or JSON file instead of the cluster
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,

    /// Always display Kind.group/name
    #[arg(long)]
    show_group: bool,

    /// Output format
    #[arg(long, short = 'o', value_enum)]
    output: Option<OutputFormat>,

    /// Omit the table header row
    #[arg(long)]
    no_headers: bool,

    /// Maximum lineage depth below the target
    #[arg(long)]
    depth: Option<usize>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

impl Args {
    /// Command-line flags win over every configuration layer
    fn apply_to(&self, mut config: Config) -> Config {
        if self.show_group {
            config.show_group = true;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if self.no_headers {
            config.no_headers = true;
        }
        if let Some(depth) = self.depth {
            config.max_depth = depth;
        }
        config
    }

    fn target(&self) -> Result<Option<TargetRef>> {
        if self.target.is_empty() {
            return Ok(None);
        }
        TargetRef::from_args(&self.target).map(Some).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid target '{}', expected RESOURCE/NAME or RESOURCE NAME",
                self.target.join(" ")
            )
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = Args::parse();

    // Handle config subcommand
    if let Some(Command::Config { subcommand }) = args.command.take() {
        return handle_config_command(subcommand).await;
    }

    let log_file = init_logging(args.debug)?;
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    let config = ConfigLoader::load().context("Failed to load configuration")?;
    let config = args.apply_to(config);
    ConfigLoader::validate_settings(&config)?;
    tracing::debug!(
        "Configuration loaded: showGroup={}, maxDepth={}, output={}",
        config.show_group,
        config.max_depth,
        config.output
    );

    let target = args.target()?;
    let (source, namespace): (Box<dyn ObjectSource>, Option<String>) = match &args.file {
        Some(path) => {
            let source: Box<dyn ObjectSource> = Box::new(FileSource::new(path));
            (source, args.namespace.clone())
        }
        None => {
            let connection = kube_lineage::kube::connect(args.context.as_deref()).await?;
            let namespace = if args.all_namespaces {
                None
            } else {
                Some(
                    args.namespace
                        .clone()
                        .unwrap_or(connection.default_namespace),
                )
            };
            let source: Box<dyn ObjectSource> = Box::new(
                ClusterSource::new(connection.client, namespace.clone())
                    .with_context(connection.context),
            );
            (source, namespace)
        }
    };

    let output = config.output;
    let no_headers = config.no_headers;
    let request = LineageRequest {
        target,
        namespace,
        config,
    };
    let report = run_lineage(source.as_ref(), &request, chrono::Utc::now()).await?;

    print!("{}", format_rows(&report.rows, output, no_headers)?);

    match report.error {
        Some(error) => Err(error).context("Lineage is incomplete"),
        None => Ok(()),
    }
}
