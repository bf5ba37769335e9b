//! mdvault: hierarchical markdown vault over interchangeable storage
//! backends.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mdvault_core::{
    BackendKind, EventBus, Folder, Item, LocalStore, NoticeLevel, OpStatus, SyncEngine,
    VaultBackend, VaultConfig, VaultEvent,
};
use mdvault_native::HandleStore;
use mdvault_remote::{ApiClient, RemoteStore, StaticCredential};

mod slot;

use slot::FileSlot;

/// Environment variable holding the remote bearer token.
const TOKEN_VAR: &str = "MDVAULT_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "mdvault")]
#[command(about = "Markdown vault over local, native or remote storage")]
struct Args {
    /// Storage backend: local, native or remote
    #[arg(long, default_value = "local")]
    backend: BackendKind,

    /// Vault root directory (native) or state file (local)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Base URL of the remote tree service
    #[arg(long)]
    server: Option<String>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the vault tree
    Tree,
    /// Print a note with its metadata block
    Cat { id: String },
    /// Create a note, beside or inside the given item
    Add {
        name: String,
        #[arg(long)]
        to: Option<String>,
    },
    /// Create a folder, beside or inside the given item
    Mkdir {
        name: String,
        #[arg(long)]
        to: Option<String>,
    },
    /// Rename an item in place
    Rename { id: String, name: String },
    /// Move an item under a folder (omit the folder for the root)
    Mv {
        id: String,
        #[arg(long)]
        into: Option<String>,
    },
    /// Delete an item (recursively for folders)
    Rm { id: String },
    /// Import a note or a zip archive
    Import {
        file: PathBuf,
        #[arg(long)]
        to: Option<String>,
    },
    /// Export a note to stdout or a folder to a zip file
    Export {
        id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "debug,mdvault=debug"
    } else {
        "info,mdvault=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = VaultConfig {
        backend: args.backend,
        root: args.root.clone(),
        server_url: args.server.clone(),
    };
    config.validate()?;
    let backend = build_backend(&config).await?;
    tracing::debug!(backend = %backend.name(), "backend ready");

    let events = Arc::new(EventBus::new());
    let _notices = events.subscribe(|event| {
        if let VaultEvent::Notice { level, message } = event {
            let level = match level {
                NoticeLevel::Error => "error",
                NoticeLevel::Info => "info",
            };
            eprintln!("[{level}] {message}");
        }
    });

    let mut engine = SyncEngine::new(backend, events);
    engine.refresh().await?;
    tracing::debug!("tree refreshed, running command");
    run_command(&mut engine, args.command).await
}

async fn build_backend(config: &VaultConfig) -> Result<Arc<dyn VaultBackend>> {
    Ok(match config.backend {
        BackendKind::Local => {
            let path = config
                .root
                .clone()
                .unwrap_or_else(|| PathBuf::from(".mdvault.json"));
            Arc::new(LocalStore::open(FileSlot::new(path)).await?)
        }
        BackendKind::Native => {
            let root = config
                .root
                .clone()
                .context("native backend needs a root directory")?;
            Arc::new(HandleStore::at_path(root))
        }
        BackendKind::Remote => {
            let url = config
                .server_url
                .clone()
                .context("remote backend needs a server url")?;
            let creds = match std::env::var(TOKEN_VAR) {
                Ok(token) => StaticCredential::new(token),
                Err(_) => StaticCredential::missing(),
            };
            let client = ApiClient::new(&url, Arc::new(creds))?;
            Arc::new(RemoteStore::new(client))
        }
    })
}

async fn run_command(engine: &mut SyncEngine, command: Command) -> Result<()> {
    match command {
        Command::Tree => {
            print_level(engine.tree(), 0);
            Ok(())
        }
        Command::Cat { id } => {
            let text = engine.export_note(&id).await?;
            println!("{text}");
            Ok(())
        }
        Command::Add { name, to } => {
            let status = engine.add_note(to.as_deref(), &name).await?;
            finish(engine, status).await
        }
        Command::Mkdir { name, to } => {
            let status = engine.add_folder(to.as_deref(), &name).await?;
            finish(engine, status).await
        }
        Command::Rename { id, name } => {
            let status = engine.rename(&id, &name).await?;
            finish(engine, status).await
        }
        Command::Mv { id, into } => {
            let status = engine.move_to(&id, into.as_deref()).await?;
            finish(engine, status).await
        }
        Command::Rm { id } => {
            let status = engine.delete(&id).await?;
            finish(engine, status).await
        }
        Command::Import { file, to } => {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .context("import path has no file name")?
                .to_string();
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let status = engine.import_file(to.as_deref(), &name, bytes).await?;
            finish(engine, status).await
        }
        Command::Export { id, out } => {
            if id.starts_with("note:") {
                let text = engine.export_note(&id).await?;
                match out {
                    Some(path) => tokio::fs::write(&path, text)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?,
                    None => println!("{text}"),
                }
            } else {
                let (file_name, bytes) = engine.export_folder(&id).await?;
                let path = out.unwrap_or_else(|| PathBuf::from(&file_name));
                tokio::fs::write(&path, bytes)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("exported {}", path.display());
            }
            Ok(())
        }
    }
}

/// Converge after a partial commit, then report the tree.
async fn finish(engine: &mut SyncEngine, status: OpStatus) -> Result<()> {
    if status == OpStatus::Partial {
        engine.refresh().await?;
    }
    print_level(engine.tree(), 0);
    Ok(())
}

fn print_level(items: &[Item], depth: usize) {
    let indent = "  ".repeat(depth);
    for item in items {
        match item {
            Item::Folder(Folder { name, children, .. }) => {
                println!("{indent}{name}/");
                print_level(children, depth + 1);
            }
            Item::Note(note) => println!("{indent}{}", note.name),
        }
    }
}
