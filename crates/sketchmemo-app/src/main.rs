//! Main application entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sketchmemo_core::storage::{FileBlobStore, FileRecordStore};
use sketchmemo_core::{MemoId, OwnerId};
use std::path::PathBuf;

mod commands;
mod config;
mod script;

use commands::App;
use config::{AppConfig, CONFIG_FILE_NAME};

#[derive(Parser)]
#[command(name = "sketchmemo")]
#[command(version, about = "Hand-drawn memos from the command line", long_about = None)]
struct Cli {
    /// Config file (defaults to config.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with a fresh owner id
    Init,
    /// Create a blank memo
    New {
        title: String,
    },
    /// Replay a pointer script into a memo and save it with a preview
    Draw {
        /// Memo to continue drawing on; a new memo is created otherwise
        #[arg(long)]
        memo: Option<MemoId>,
        #[arg(long)]
        title: Option<String>,
        script: PathBuf,
    },
    /// List memos, newest first
    List,
    /// Print a memo's drawing as JSON
    Show {
        id: MemoId,
    },
    /// Delete a memo and its preview
    Delete {
        id: MemoId,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let data_dir = config.resolved_data_dir()?;
    log::debug!("Using data directory {}", data_dir.display());

    if let Commands::Init = cli.command {
        return init(config, cli.config.unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME)));
    }

    let records = FileRecordStore::new(data_dir.join("records"))?;
    let mut blobs = FileBlobStore::new(data_dir.join("blobs"))?;
    if let Some(base) = &config.public_base_url {
        blobs = blobs.with_public_base_url(base.clone());
    }
    let app = App::new(config, records, blobs);

    match cli.command {
        Commands::Init => {}
        Commands::New { title } => {
            let memo = app.new_memo(&title)?;
            println!("{}", memo.id);
        }
        Commands::Draw { memo, title, script } => {
            let events = script::load_script(&script)?;
            let memo = app.draw(memo, title, &events)?;
            println!("{}", memo.id);
        }
        Commands::List => {
            for memo in app.list()? {
                println!(
                    "{}  {}  {}  {}",
                    memo.id,
                    memo.updated_at.format("%Y-%m-%d %H:%M"),
                    memo.display_title(),
                    memo.preview_url.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Show { id } => {
            let memo = app.show(id)?;
            println!("{}", memo.drawing.to_json()?);
        }
        Commands::Delete { id } => {
            app.delete(id)?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

fn init(mut config: AppConfig, path: PathBuf) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    let owner = *config.owner_id.get_or_insert_with(OwnerId::new);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, config.to_toml_string()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    println!("{}", owner);
    Ok(())
}
