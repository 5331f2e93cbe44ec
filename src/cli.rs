use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::profile::AnswerKeyStyle;

#[derive(Parser, Debug)]
#[command(
    name = "pyq-extract",
    version,
    about = "Exam question-paper extraction and import tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Batch(BatchArgs),
    Import(ImportArgs),
    Validate(ValidateArgs),
    Status(StatusArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProfilePreset {
    ResponseSheet,
    MarkedBooklet,
    AnswerKeyBooklet,
}

impl ProfilePreset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResponseSheet => "response-sheet",
            Self::MarkedBooklet => "marked-booklet",
            Self::AnswerKeyBooklet => "answer-key-booklet",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[arg(long, value_enum, default_value_t = ProfilePreset::ResponseSheet)]
    pub preset: ProfilePreset,

    #[arg(long)]
    pub profile_path: Option<PathBuf>,

    #[arg(long = "section")]
    pub sections: Vec<String>,

    #[arg(long, value_enum)]
    pub answer_key: Option<AnswerKeyStyle>,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long)]
    pub exam: String,

    #[arg(long)]
    pub year: u32,

    #[arg(long)]
    pub paper: String,

    #[command(flatten)]
    pub profile: ProfileArgs,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long)]
    pub exam: String,

    #[arg(long)]
    pub year: u32,

    #[arg(long, default_value = "Tier 1")]
    pub paper: String,

    #[arg(long, default_value_t = false)]
    pub no_classify: bool,

    #[command(flatten)]
    pub profile: ProfileArgs,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long)]
    pub store_uri: Option<String>,

    #[arg(long, default_value = ".env.local")]
    pub env_file: PathBuf,

    #[arg(long)]
    pub collection: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}
