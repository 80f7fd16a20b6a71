use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "statutekb",
    version,
    about = "Local statute knowledge-base extraction and query tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Build(BuildArgs),
    Embed(EmbedArgs),
    Query(QueryArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "knowledge_base")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub doc_id: Option<String>,

    #[arg(long, default_value = "Consumer Protection Act, 2019")]
    pub act_name: String,

    #[arg(long, default_value = "English")]
    pub language: String,

    #[arg(long, default_value_t = 850)]
    pub target_tokens: usize,

    #[arg(long, default_value_t = 125)]
    pub overlap_tokens: usize,

    #[arg(long, default_value_t = 4)]
    pub chars_per_token: usize,

    #[arg(long, default_value_t = false)]
    pub skip_normalization: bool,

    #[arg(long, default_value_t = false)]
    pub skip_embeddings: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum EmbedRefreshMode {
    Full,
    MissingOrStale,
}

impl EmbedRefreshMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::MissingOrStale => "missing-or-stale",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EmbedArgs {
    #[arg(long, default_value = "knowledge_base")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value = "miniLM-L6-v2-local-v1")]
    pub model_id: String,

    #[arg(long, value_enum, default_value_t = EmbedRefreshMode::MissingOrStale)]
    pub refresh_mode: EmbedRefreshMode,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, default_value = "knowledge_base")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub query: String,

    #[arg(long)]
    pub model_id: Option<String>,

    #[arg(long, default_value_t = 3)]
    pub limit: usize,

    #[arg(long)]
    pub chapter: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "knowledge_base")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
