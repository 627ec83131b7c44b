use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docflow_core::{DocumentId, ProjectId, ResultId};

/// Drive docflow scan, index and analysis pipelines from the terminal.
#[derive(Parser, Debug)]
#[command(name = "docflow", version)]
pub struct Cli {
    /// RON config file (default: ./docflow.ron when present).
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Server base url, overriding the config file.
    #[arg(long, value_name = "URL", global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan the project folders, then index the specifications.
    Scan(ScanCommand),
    /// Analyze documents against suggested or explicitly chosen specs.
    Analyze(AnalyzeCommand),
    /// Regenerate one result against a new spec selection.
    Refine(RefineCommand),
    /// Show the specification folder tree.
    Specs(SpecsCommand),
    /// Show project and knowledge-base statistics.
    Stats(StatsCommand),
}

#[derive(Debug, Args)]
pub struct ScanCommand {
    #[arg(value_name = "PROJECT_ID")]
    pub project: ProjectId,

    /// Record files without extracting their text.
    #[arg(long)]
    pub no_parse: bool,

    /// Rebuild the knowledge base even for unchanged files.
    #[arg(long)]
    pub force_reindex: bool,

    /// Stop after the scan.
    #[arg(long)]
    pub skip_index: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeCommand {
    #[arg(value_name = "PROJECT_ID")]
    pub project: ProjectId,

    /// Document to analyze; repeat for several.
    #[arg(long = "document", short = 'd', value_name = "FILE_ID", required = true)]
    pub documents: Vec<DocumentId>,

    /// Spec path to use for every document instead of the suggestions.
    #[arg(long = "spec", short = 's', value_name = "PATH")]
    pub specs: Vec<String>,

    /// Also select every spec under this folder.
    #[arg(long = "folder", value_name = "PATH")]
    pub folders: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RefineCommand {
    #[arg(value_name = "RESULT_ID")]
    pub result: ResultId,

    /// Project the result belongs to.
    #[arg(long, value_name = "PROJECT_ID")]
    pub project: ProjectId,

    /// Spec path to cite; repeat for several.
    #[arg(long = "spec", short = 's', value_name = "PATH", required = true)]
    pub specs: Vec<String>,

    /// Extra guidance for the regenerated answer.
    #[arg(long, value_name = "TEXT")]
    pub instruction: Option<String>,
}

#[derive(Debug, Args)]
pub struct SpecsCommand {
    #[arg(value_name = "PROJECT_ID")]
    pub project: ProjectId,

    /// Show only files whose name or path contains this text.
    #[arg(long, value_name = "QUERY", default_value = "")]
    pub filter: String,

    /// Mark the specs suggested for this document as selected.
    #[arg(long = "document", short = 'd', value_name = "FILE_ID")]
    pub document: Option<DocumentId>,
}

#[derive(Debug, Args)]
pub struct StatsCommand {
    #[arg(value_name = "PROJECT_ID")]
    pub project: ProjectId,
}
