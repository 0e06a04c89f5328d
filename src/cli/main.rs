//! Role mapping command-line tool
//!
//! Validates, normalizes and inspects role mapping files, and moves role
//! mappings to and from the security API.

use role_mapping_rules::config::Config;
use role_mapping_rules::{
    telemetry, RoleMapping, RoleMappingDocument, RoleMappingStore, RoleMappingsClient,
};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Role mapping rules tool
#[derive(Parser, Debug)]
#[command(name = "role-mapping")]
#[command(about = "Validate, inspect and publish access-control role mappings")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "ROLE_MAPPING_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON log format
    #[arg(long, env = "JSON_LOGS", global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the role mappings in a YAML or JSON file
    Validate {
        /// Role mapping file
        file: PathBuf,
    },
    /// Print the role mappings with their rules in canonical form
    Normalize {
        /// Role mapping file
        file: PathBuf,
    },
    /// Print rule depth and whether the visual editor can be used
    Depth {
        /// Role mapping file
        file: PathBuf,
    },
    /// Fetch a role mapping from the API
    Fetch {
        /// Role mapping name
        name: String,
    },
    /// Validate and save the role mappings in a file to the API
    Push {
        /// Role mapping file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }
    config.validate()?;

    telemetry::init_logging(&config.logging)?;

    match args.command {
        Command::Validate { file } => validate(&file),
        Command::Normalize { file } => normalize(&file),
        Command::Depth { file } => depth(&file, &config),
        Command::Fetch { name } => fetch(&name, &config).await,
        Command::Push { file } => push(&file, &config).await,
    }
}

fn load(file: &Path) -> anyhow::Result<RoleMappingDocument> {
    RoleMappingDocument::from_file(file)
        .with_context(|| format!("Failed to load role mappings from {}", file.display()))
}

fn validate(file: &Path) -> anyhow::Result<()> {
    let document = load(file)?;

    let mut failures = 0;
    for mapping in &document.role_mappings {
        match mapping.validate() {
            Ok(()) => println!("ok      {}", mapping.name),
            Err(e) => {
                failures += 1;
                println!("invalid {}: {}", mapping.name, describe(&e));
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} role mappings are invalid", failures, document.len());
    }
    info!("Validated {} role mappings", document.len());
    Ok(())
}

fn normalize(file: &Path) -> anyhow::Result<()> {
    let document = load(file)?;
    println!("{}", document.to_json()?);
    Ok(())
}

fn depth(file: &Path, config: &Config) -> anyhow::Result<()> {
    let document = load(file)?;
    let limit = config.editor.max_visual_depth;

    for mapping in &document.role_mappings {
        let mode = if mapping.rules.can_use_visual_editor(limit) {
            "visual"
        } else {
            "json"
        };
        println!("{}\tdepth={}\teditor={}", mapping.name, mapping.rules.max_depth(), mode);
    }
    Ok(())
}

async fn fetch(name: &str, config: &Config) -> anyhow::Result<()> {
    let client = RoleMappingsClient::from_config(&config.api)?;
    let mapping: RoleMapping = client
        .load(name)
        .await
        .with_context(|| format!("Failed to fetch role mapping `{}`", name))?;

    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(())
}

async fn push(file: &Path, config: &Config) -> anyhow::Result<()> {
    let document = load(file)?;
    document.validate()?;

    let client = RoleMappingsClient::from_config(&config.api)?;
    for mapping in &document.role_mappings {
        client
            .save(mapping)
            .await
            .with_context(|| format!("Failed to save role mapping `{}`", mapping.name))?;
        println!("saved   {}", mapping.name);
    }

    info!("Pushed {} role mappings", document.len());
    Ok(())
}

fn describe(error: &role_mapping_rules::Error) -> String {
    match error {
        role_mapping_rules::Error::Validation {
            message,
            field: Some(field),
        } => format!("{} (at {})", message, field),
        other => other.to_string(),
    }
}
