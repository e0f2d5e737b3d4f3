use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "kvp",
    about = "Inspect and edit kvproxy stores kept in a JSON file",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Backend file holding every key
    #[arg(short, long, global = true, default_value = "kvp.json")]
    pub file: PathBuf,

    /// TOML file with store flags (check_gets, check_defaults, partial, id)
    #[arg(long, global = true)]
    pub options: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Access a whole-object store
    Object(ObjectArgs),
    /// Access a per-field store
    Separate(SeparateArgs),
    /// List backend keys
    Keys,
}

#[derive(Args, Debug)]
pub struct ObjectArgs {
    /// Backend key of the object
    pub key: String,
    /// Defaults object, as JSON
    #[arg(long, default_value = "{}")]
    pub defaults: String,
    #[command(subcommand)]
    pub action: ObjectAction,
}

#[derive(Subcommand, Debug)]
pub enum ObjectAction {
    /// Print the stored object
    Show,
    /// Print one field
    Get { field: String },
    /// Write one field; VALUE is JSON
    Set { field: String, value: String },
}

#[derive(Args, Debug)]
pub struct SeparateArgs {
    /// Key prefix
    #[arg(long)]
    pub id: Option<String>,
    #[command(subcommand)]
    pub action: FieldAction,
}

#[derive(Subcommand, Debug)]
pub enum FieldAction {
    /// Print one field
    Get { field: String },
    /// Write one field; VALUE is JSON
    Set { field: String, value: String },
}
