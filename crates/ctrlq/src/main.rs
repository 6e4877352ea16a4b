use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ctrlq::app::{EditError, EditSession};
use ctrlq::domain::config::ConfigUpdate;
use ctrlq::infra::config_store::{ConfigStore, default_config_path};
use ctrlq::infra::file_store::RealFileStore;
use ctrlq::runtime;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ctrlq")]
#[command(about = "A small note panel over one folder of text files", long_about = None)]
struct Args {
    #[arg(long, help = "Configuration file to read and update")]
    config: Option<PathBuf>,

    #[arg(long, help = "Folder to open instead of the configured default")]
    folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config_store = ConfigStore::new(args.config.unwrap_or_else(default_config_path));
    let mut config = config_store.load().await.map_err(io::Error::other)?;
    if let Some(folder) = args.folder {
        config = config.merged(ConfigUpdate {
            default_folder: Some(folder),
            hotkey: None,
        });
    }

    let session = Arc::new(EditSession::new(Arc::new(RealFileStore), config));
    match session.open_default_folder().await {
        Ok(_) | Err(EditError::NoDefaultFolder) => {}
        Err(error) => warn!(%error, "failed to open default folder"),
    }

    let (command_tx, mut command_rx) = mpsc::unbounded_channel();
    runtime::spawn_command_reader(command_tx);

    runtime::run(session, &config_store, &mut command_rx, &mut io::stdout()).await
}
