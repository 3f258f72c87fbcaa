//! Command-line interface over a persistent tool output memory

pub mod output;

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde_json::json;

use crate::artifact::{Artifact, ArtifactKind};
use crate::config::Config;
use crate::error::Result;
use crate::memory::{ActionRequest, ProcessedOutput, SubtaskRef, ToolDescriptor, ToolOutputMemory};
use crate::summarizer;

use output::{OutputFormat, format_timestamp, truncate_string};

/// Toolmem - Store bulky tool outputs and query them later
#[derive(Parser)]
#[command(name = "toolmem")]
#[command(about = "Namespaced vector memory for tool outputs")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'd', global = true, help = "Path to data directory")]
    pub data_dir: Option<PathBuf>,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Store a tool output under a new namespace")]
    Store(StoreArgs),

    #[clap(about = "Search a namespace")]
    Search(SearchArgs),

    #[clap(about = "Summarize a namespace")]
    Summarize(NamespaceArgs),

    #[clap(about = "List the artifacts of a namespace")]
    List(ListArgs),

    #[clap(about = "List all namespaces")]
    Namespaces,
}

#[derive(Parser)]
pub struct StoreArgs {
    #[clap(long, short, help = "Tool name")]
    pub tool: String,

    #[clap(long, short, default_value = "run", help = "Tool method")]
    pub method: String,

    #[clap(long, short, default_value = "cli", help = "Subtask id")]
    pub subtask: String,

    #[clap(long, short, help = "Read the output from a file")]
    pub file: Option<PathBuf>,

    #[clap(help = "Output texts, one artifact each; reads stdin when empty")]
    pub texts: Vec<String>,
}

#[derive(Parser)]
pub struct SearchArgs {
    #[clap(help = "Artifact namespace")]
    pub namespace: String,

    #[clap(help = "Natural language query")]
    pub query: String,
}

#[derive(Parser)]
pub struct NamespaceArgs {
    #[clap(help = "Artifact namespace")]
    pub namespace: String,
}

#[derive(Parser)]
pub struct ListArgs {
    #[clap(help = "Artifact namespace")]
    pub namespace: String,

    #[clap(
        long,
        short,
        default_value = "50",
        help = "Maximum number of artifacts to display"
    )]
    pub limit: usize,
}

impl Cli {
    /// Load the configuration, applying command-line overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.clone();
        }
        Ok(config)
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;
        let format = OutputFormat::from_flag(self.json);
        let summarizer = summarizer::from_config(&config.summarizer);
        let memory = ToolOutputMemory::from_config(&config, summarizer).await?;

        match &self.command {
            Command::Store(args) => store(&memory, args, format).await,
            Command::Search(args) => search(&memory, args, format).await,
            Command::Summarize(args) => summarize(&memory, args, format).await,
            Command::List(args) => list(&memory, args, format).await,
            Command::Namespaces => namespaces(&memory, format).await,
        }
    }
}

fn read_output(args: &StoreArgs) -> Result<Vec<Artifact>> {
    if let Some(path) = &args.file {
        let text = std::fs::read_to_string(path)?;
        return Ok(vec![Artifact::text(text)]);
    }

    if !args.texts.is_empty() {
        return Ok(args.texts.iter().map(Artifact::text).collect());
    }

    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    Ok(vec![Artifact::text(text)])
}

async fn store(memory: &ToolOutputMemory, args: &StoreArgs, format: OutputFormat) -> Result<()> {
    let artifacts = read_output(args)?;
    let tool = ToolDescriptor::new(&args.tool, &args.method);
    let subtask = SubtaskRef::new(&args.subtask);

    let processed = memory.process_output(&tool, &subtask, artifacts).await?;

    match format {
        OutputFormat::Json => {
            let output = match &processed {
                ProcessedOutput::Inline(artifact) => json!({
                    "stored": false,
                    "text": artifact.text,
                }),
                ProcessedOutput::Stored(stored) => json!({
                    "stored": true,
                    "namespace": stored.namespace,
                    "description": stored.description.text,
                    "actions": stored
                        .actions
                        .iter()
                        .map(|a| json!({ "action": a.action.as_str(), "payload": a.payload() }))
                        .collect::<Vec<_>>(),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => println!("{}", processed.artifact().text),
    }

    Ok(())
}

async fn search(memory: &ToolOutputMemory, args: &SearchArgs, format: OutputFormat) -> Result<()> {
    let answer = memory
        .search(&ActionRequest::search(&args.query, &args.namespace))
        .await?;
    print_artifact(&answer, format)
}

async fn summarize(
    memory: &ToolOutputMemory,
    args: &NamespaceArgs,
    format: OutputFormat,
) -> Result<()> {
    let summary = memory
        .summarize(&ActionRequest::summarize(&args.namespace))
        .await?;
    print_artifact(&summary, format)
}

fn print_artifact(artifact: &Artifact, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(artifact)?),
        OutputFormat::Table => println!("{}", artifact.text),
    }
    Ok(())
}

async fn list(memory: &ToolOutputMemory, args: &ListArgs, format: OutputFormat) -> Result<()> {
    let mut artifacts = memory.load_artifacts(&args.namespace).await?;
    let total = artifacts.len();
    artifacts.truncate(args.limit);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&artifacts)?);
        }
        OutputFormat::Table => {
            if artifacts.is_empty() {
                println!("No artifacts in namespace {}.", args.namespace);
                return Ok(());
            }

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL_CONDENSED)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(["ID", "Kind", "Text", "Chars", "Created"]);

            for artifact in &artifacts {
                table.add_row([
                    truncate_string(&artifact.id.to_string(), 8),
                    kind_label(artifact.kind).to_string(),
                    truncate_string(&artifact.text, 60),
                    artifact.char_len().to_string(),
                    format_timestamp(&artifact.created_at),
                ]);
            }

            println!("{table}");
            println!("\nTotal: {total} artifacts");
        }
    }

    Ok(())
}

async fn namespaces(memory: &ToolOutputMemory, format: OutputFormat) -> Result<()> {
    let names = memory.store().namespaces().await?;

    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let count = memory.load_artifacts(&name).await?.len();
        rows.push((name, count));
    }

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = rows
                .iter()
                .map(|(name, count)| json!({ "namespace": name, "artifacts": count }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No namespaces found.");
                return Ok(());
            }

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL_CONDENSED)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(["Namespace", "Artifacts"]);
            for (name, count) in &rows {
                table.add_row([name.clone(), count.to_string()]);
            }

            println!("{table}");
        }
    }

    Ok(())
}

fn kind_label(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Text => "text",
        ArtifactKind::Info => "info",
    }
}
