//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the annotation report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Per-cluster table plus discussion transcripts
    Full,
    /// Per-cluster table only
    Summary,
    /// The report as JSON
    Json,
}

impl From<OutputFormat> for celltype_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Full => celltype_domain::OutputFormat::Full,
            OutputFormat::Summary => celltype_domain::OutputFormat::Summary,
            OutputFormat::Json => celltype_domain::OutputFormat::Json,
        }
    }
}

/// How agreement between oracles is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConsensusModeArg {
    /// Majority vote over normalized labels
    Lexical,
    /// A checker oracle judges agreement
    Oracle,
}

impl From<ConsensusModeArg> for celltype_domain::ConsensusMode {
    fn from(mode: ConsensusModeArg) -> Self {
        match mode {
            ConsensusModeArg::Lexical => celltype_domain::ConsensusMode::Lexical,
            ConsensusModeArg::Oracle => celltype_domain::ConsensusMode::Oracle,
        }
    }
}

/// CLI arguments for celltype-quorum
#[derive(Parser, Debug)]
#[command(name = "celltype-quorum")]
#[command(
    author,
    version,
    about = "Annotate cell clusters with several LLMs and reconcile their answers"
)]
#[command(long_about = r#"
celltype-quorum asks several LLMs ("oracles") to name the cell type of each
cluster from its marker genes, then reconciles their answers.

The process has two phases:
1. Annotation: every oracle labels every cluster in parallel
2. Discussion: clusters without enough agreement are re-asked, with the other
   oracles' answers and reasoning, for a bounded number of rounds

Configuration files are loaded from (in priority order):
1. CELLTYPE_QUORUM_<SECTION>__<KEY> environment variables
2. --config <path>                              Explicit config file
3. ./celltype-quorum.toml                       Project-level config
4. ~/.config/celltype-quorum/config.toml        Global config

Example:
  celltype-quorum --markers markers.json --species human --tissue blood \
      -o openai:gpt-4.1 -o anthropic -o deepseek

Passing --markers more than once annotates every file in a single batched
prompt per oracle and prints one report per file.
"#)]
pub struct Cli {
    /// Marker genes per cluster: JSON object or CSV with cluster,gene columns.
    /// Repeat to annotate several marker sets in one batched prompt per oracle
    #[arg(long, value_name = "PATH", required_unless_present_any = ["show_config", "clear_cache"])]
    pub markers: Vec<PathBuf>,

    /// Species the clusters come from
    #[arg(long)]
    pub species: Option<String>,

    /// Tissue of origin
    #[arg(long)]
    pub tissue: Option<String>,

    /// Extra context appended to every prompt
    #[arg(long, value_name = "TEXT")]
    pub context: Option<String>,

    /// File holding a custom annotation prompt ({species}, {tissue}, {context}, {markers})
    #[arg(long, value_name = "PATH")]
    pub prompt_template: Option<PathBuf>,

    /// Oracles as provider[:model] or a bare model id (can be specified multiple times)
    #[arg(short = 'o', long = "oracle", value_name = "PROVIDER:MODEL")]
    pub oracles: Vec<String>,

    /// Minimum agreement proportion, in [0, 1]
    #[arg(long, value_name = "F")]
    pub consensus_threshold: Option<f64>,

    /// Maximum normalized entropy, in [0, 1]
    #[arg(long, value_name = "F")]
    pub entropy_threshold: Option<f64>,

    /// Discussion rounds for controversial clusters
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<usize>,

    /// Consensus mode
    #[arg(long, value_enum)]
    pub consensus_mode: Option<ConsensusModeArg>,

    /// Oracle (by name) that judges agreement in oracle mode
    #[arg(long, value_name = "NAME")]
    pub checker: Option<String>,

    /// Do not read or write the response cache
    #[arg(long)]
    pub no_cache: bool,

    /// Delete cached responses before running
    #[arg(long)]
    pub clear_cache: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration sources and issues, then exit
    #[arg(long)]
    pub show_config: bool,

    /// Also write diagnostic logs to a daily file in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Write a JSONL transcript of every oracle exchange
    #[arg(long, value_name = "PATH")]
    pub conversation_log: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,
}
