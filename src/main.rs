use anyhow::Context;
use clap::{Parser, Subcommand};
use regpull::config::Config;
use regpull::download::Downloader;
use regpull::registry::{
    discover_variants, discover_versions, locate_artifacts, ArtifactRules, RegistryClient,
    RegistryEndpoint, VersionPolicy,
};
use regpull::select::TerminalPrompter;
use regpull::session::Session;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "regpull")]
#[command(about = "Pick and download artifacts from a directory-listing registry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.config/regpull/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Top-level variant to use instead of prompting (e.g. rocky9)
    #[arg(long, global = true)]
    variant: Option<String>,

    /// Local storage root
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long, global = true, conflicts_with = "verify_tls")]
    insecure: bool,

    /// Verify TLS certificates
    #[arg(long, global = true)]
    verify_tls: bool,

    /// Version matching policy
    #[arg(long, global = true, value_enum)]
    policy: Option<VersionPolicy>,

    /// Restrict the run to these tools (repeatable)
    #[arg(long = "tool", global = true)]
    tools: Vec<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive selection and download (default)
    Run,
    /// List top-level variants
    Variants,
    /// List versions of a tool
    Versions { tool: String },
    /// List artifacts of a tool version
    Artifacts { tool: String, version: String },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so prompts on stdout stay readable
    let default_filter = if cli.verbose {
        "regpull=debug"
    } else {
        "regpull=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    if matches!(cli.command, Some(Commands::Config)) {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    if !config.registry.verify_tls {
        tracing::warn!("TLS certificate verification is disabled for {}", config.registry.base_url);
    }

    let client = RegistryClient::from_config(&config.registry)?;

    match cli.command {
        None | Some(Commands::Run) => run(config, client, cli.variant.as_deref()).await,
        Some(Commands::Variants) => {
            let root = RegistryEndpoint::new(&config.registry.base_url, config.registry.verify_tls)?;
            for variant in discover_variants(&client, &root).await? {
                println!("{variant}");
            }
            Ok(())
        }
        Some(Commands::Versions { tool }) => {
            let endpoint = endpoint(&config, cli.variant.as_deref())?;
            let versions =
                discover_versions(&client, &endpoint, &tool, config.matching.version_policy)
                    .await?;
            for version in versions {
                println!("{version}");
            }
            Ok(())
        }
        Some(Commands::Artifacts { tool, version }) => {
            let endpoint = endpoint(&config, cli.variant.as_deref())?;
            let rules = ArtifactRules::from_config(&config.matching);
            for artifact in locate_artifacts(&client, &endpoint, &tool, &version, &rules).await? {
                println!("{artifact}");
            }
            Ok(())
        }
        Some(Commands::Config) => Ok(()),
    }
}

async fn run(config: Config, client: RegistryClient, variant: Option<&str>) -> anyhow::Result<()> {
    println!("regpull: registry artifact selector\n");

    let downloader = Downloader::new(client.http().clone(), config.registry.download_timeout())
        .with_progress(config.storage.show_progress);
    let mut session = Session::new(config, client, downloader, TerminalPrompter::stdio());

    let summary = session
        .run(variant)
        .await
        .context("Cannot continue without a registry variant and local storage")?;

    println!("\n{summary}");
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    if let Some(base_url) = &cli.base_url {
        config.registry.base_url.clone_from(base_url);
    }
    if let Some(root) = &cli.root {
        config.storage.root.clone_from(root);
    }
    if cli.insecure {
        config.registry.verify_tls = false;
    }
    if cli.verify_tls {
        config.registry.verify_tls = true;
    }
    if let Some(policy) = cli.policy {
        config.matching.version_policy = policy;
    }
    if !cli.tools.is_empty() {
        config.tools.clone_from(&cli.tools);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn endpoint(config: &Config, variant: Option<&str>) -> anyhow::Result<RegistryEndpoint> {
    let root = RegistryEndpoint::new(&config.registry.base_url, config.registry.verify_tls)?;
    Ok(match variant {
        Some(variant) => root.variant(variant)?,
        None => root,
    })
}
