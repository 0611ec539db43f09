use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::canvas::CanvasClient;
use crate::config::{ConfigStore, default_search_path, environment_name};
use crate::gateway::keyset::HttpKeySetFetcher;
use crate::orchestrator::{Provisioner, WorkflowReport};
use crate::template::Template;
use crate::tool_support::{Registration, ToolSupportClient};
use crate::values::{Overrides, ValueSpace, keys};

#[derive(Parser, Debug)]
#[command(
    name = "lti-provisioner",
    version,
    about = "Provision LTI tools across Canvas and tool-support"
)]
pub struct Cli {
    /// JSON template describing the keys and registration.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub template: Option<PathBuf>,
    /// Registration id, overriding config and template.
    #[arg(short = 'r', long, global = true, value_name = "ID")]
    pub registration_id: Option<String>,
    /// Config environment (default: $LTI_ENV or development).
    #[arg(long, global = true, value_name = "NAME")]
    pub env: Option<String>,
    /// Config directory; repeat to search several.
    #[arg(long = "config-dir", global = true, value_name = "DIR")]
    pub config_dirs: Vec<PathBuf>,
    /// Do not ask for confirmation before deleting.
    #[arg(short, long, global = true)]
    pub yes: bool,
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create developer keys and the tool registration.
    Create,
    /// Update an existing registration and its keys.
    Update,
    /// Delete the registration and its developer keys.
    Delete,
    /// Check the registration against Canvas.
    Validate,
    /// Print a template rebuilt from the live registration.
    Export {
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Show the external tool installed for the registration.
    LookupLti,
    /// List every registration id known to tool-support.
    List,
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let environment = environment_name(cli.env.as_deref());
    let dirs = if cli.config_dirs.is_empty() {
        default_search_path()
    } else {
        cli.config_dirs.clone()
    };
    let store = ConfigStore::load(&dirs, &environment)?;
    tracing::debug!(event = "config_loaded", environment = %environment, dirs = ?dirs);

    let template = load_template(&cli)?;
    let values = ValueSpace::new(store)
        .with_defaults(template.as_ref().and_then(Template::config))
        .with_overrides(&Overrides {
            registration_id: cli.registration_id.clone(),
        });

    let provisioner = build_provisioner(values)?.with_template(template);

    match cli.command {
        Command::Create => {
            let report = provisioner.create().await?;
            print_report(&report);
        }
        Command::Update => {
            let report = provisioner.update().await?;
            print_report(&report);
        }
        Command::Delete => {
            let assume_yes = cli.yes;
            let report = provisioner
                .delete(|registration| assume_yes || confirm_delete(registration))
                .await?;
            print_report(&report);
        }
        Command::Validate => {
            let report = provisioner.validate().await?;
            print_report(&report);
            if !report.warnings.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Export { output } => {
            let export = provisioner.export().await?;
            let text = serde_json::to_string_pretty(&export.document)?;
            match output {
                Some(path) => std::fs::write(&path, text + "\n")
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{text}"),
            }
        }
        Command::LookupLti => {
            let tool = provisioner.lookup_lti().await?;
            println!("{}", serde_json::to_string_pretty(&tool)?);
        }
        Command::List => {
            for registration in provisioner.list().await? {
                println!("{}", registration.display_id());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Delete works without a template, so a broken one is only a warning there.
fn load_template(cli: &Cli) -> Result<Option<Template>> {
    let Some(path) = &cli.template else {
        return Ok(None);
    };
    match Template::load(path) {
        Ok(template) => Ok(Some(template)),
        Err(err) if matches!(cli.command, Command::Delete) => {
            tracing::warn!(event = "template_ignored", path = %path.display(), error = %err, "template unreadable, continuing");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn build_provisioner(values: ValueSpace) -> Result<Provisioner> {
    let canvas_url = values.check_defined(keys::CANVAS_URL)?;
    let canvas_token = values.check_defined(keys::CANVAS_TOKEN)?;
    let tool_support_url = values.check_defined(keys::TOOL_SUPPORT_URL)?;
    let username = values.check_defined(keys::TOOL_SUPPORT_USERNAME)?;
    let password = values.check_defined(keys::TOOL_SUPPORT_PASSWORD)?;
    tracing::info!(event = "connection", canvas_url = %canvas_url, tool_support_url = %tool_support_url, "using endpoints");

    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let canvas = CanvasClient::new(client.clone(), &canvas_url, &canvas_token)?;
    let tool_support = ToolSupportClient::new(client.clone(), &tool_support_url, &username, &password);
    Ok(Provisioner::new(
        Arc::new(canvas),
        Arc::new(tool_support),
        Arc::new(HttpKeySetFetcher::new(client)),
        values,
    ))
}

fn confirm_delete(registration: &Registration) -> bool {
    eprint!(
        "Delete registration '{}' and its developer keys? [y/N] ",
        registration.display_id()
    );
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_report(report: &WorkflowReport) {
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    eprintln!(
        "{} finished: {} step(s) completed",
        report.workflow,
        report.completed().len()
    );
}
