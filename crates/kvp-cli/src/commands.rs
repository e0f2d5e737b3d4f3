use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use kvp_backend::{Backend, FileBackend};
use kvp_store::{ObjectConfig, ObjectStore, SeparateConfig, SeparateStore, StoreOptions};
use serde_json::Value;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let backend = Arc::new(
        FileBackend::open(&cli.file)
            .with_context(|| format!("opening {}", cli.file.display()))?,
    );
    let options = load_options(cli.options.as_deref())?;
    debug!(file = %cli.file.display(), ?options, "opened backend");

    match cli.command {
        Command::Object(args) => cmd_object(args, backend, &options, &cli.format),
        Command::Separate(args) => cmd_separate(args, backend, &options, &cli.format),
        Command::Keys => cmd_keys(&backend, &cli.format),
    }
}

fn load_options(path: Option<&Path>) -> anyhow::Result<StoreOptions> {
    let Some(path) = path else {
        return Ok(StoreOptions::default());
    };
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn parse_json(raw: &str, what: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{what} is not valid JSON: {raw}"))
}

fn cmd_object(
    args: ObjectArgs,
    backend: Arc<FileBackend>,
    options: &StoreOptions,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let defaults = parse_json(&args.defaults, "--defaults")?;
    let config = ObjectConfig::new()
        .with_options(options)
        .with_backend(backend.clone());

    match args.action {
        ObjectAction::Show => {
            // Showing never seeds the backend.
            let raw = backend.get(&args.key)?;
            let value = match &raw {
                Some(raw) => parse_json(raw, "stored value")?,
                None => Value::Null,
            };
            match format {
                OutputFormat::Json => println!("{value}"),
                OutputFormat::Text if raw.is_none() => {
                    println!("{} {}", "No entry for".dimmed(), args.key.yellow())
                }
                OutputFormat::Text => {
                    println!("{}", args.key.yellow().bold());
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
            }
        }
        ObjectAction::Get { field } => {
            let store = ObjectStore::new(&args.key, defaults, config)?;
            print_field(&field, store.get_value(&field)?, format);
        }
        ObjectAction::Set { field, value } => {
            let store = ObjectStore::new(&args.key, defaults, config)?;
            store.set(&field, parse_json(&value, "VALUE")?)?;
            print_written(&args.key, &field, format);
        }
    }
    Ok(())
}

fn cmd_separate(
    args: SeparateArgs,
    backend: Arc<FileBackend>,
    options: &StoreOptions,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let mut config = SeparateConfig::new()
        .with_options(options)
        .with_backend(backend);
    if let Some(id) = args.id {
        config = config.with_id(id);
    }
    // No declared fields: only the addressed key is touched.
    let store = SeparateStore::new(Value::Object(Default::default()), config)?;

    match args.action {
        FieldAction::Get { field } => print_field(&field, store.get_value(&field)?, format),
        FieldAction::Set { field, value } => {
            store.set(&field, parse_json(&value, "VALUE")?)?;
            print_written(&store.key(&field), &field, format);
        }
    }
    Ok(())
}

fn cmd_keys(backend: &FileBackend, format: &OutputFormat) -> anyhow::Result<()> {
    let keys = backend.keys()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&keys)?),
        OutputFormat::Text if keys.is_empty() => println!("No keys."),
        OutputFormat::Text => {
            for key in &keys {
                println!("  {}", key.cyan());
            }
        }
    }
    Ok(())
}

fn print_field(field: &str, value: Option<Value>, format: &OutputFormat) {
    match (format, value) {
        (OutputFormat::Json, Some(value)) => println!("{value}"),
        (OutputFormat::Json, None) => println!("null"),
        (OutputFormat::Text, Some(value)) => println!("{} = {}", field.bold(), value),
        (OutputFormat::Text, None) => println!("{} {}", field.bold(), "(not set)".dimmed()),
    }
}

fn print_written(key: &str, field: &str, format: &OutputFormat) {
    if *format == OutputFormat::Text {
        println!("{} Set {} in {}", "✓".green().bold(), field.bold(), key.yellow());
    }
}
