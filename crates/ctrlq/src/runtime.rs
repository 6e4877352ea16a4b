//! Line-oriented front end driving an [`EditSession`].

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::app::{EditError, EditFuture, EditSession};
use crate::domain::config::{ConfigUpdate, HotkeyUpdate};
use crate::domain::file::{display_name, folder_label};
use crate::infra::config_store::{ConfigError, ConfigStore};

pub mod command;
pub mod event;
mod render;

pub use command::EditorCommand;
pub use event::spawn_command_reader;

/// Outcome message of a finished background intent.
type IntentOutcome = Result<String, EditError>;

enum EventResult {
    Continue,
    Quit,
}

/// Mutable loop state shared by command handlers.
struct RuntimeContext<'a, W> {
    config_store: &'a ConfigStore,
    folder: Option<PathBuf>,
    output: &'a mut W,
    session: Arc<EditSession>,
    tasks: JoinSet<IntentOutcome>,
}

/// Runs the command loop until [`EditorCommand::Quit`] arrives or the command
/// channel closes, then waits for every in-flight intent.
///
/// The file list is re-rendered after each change of the open file set.
///
/// # Errors
/// Returns an error if writing to `output` fails.
pub async fn run<W: Write>(
    session: Arc<EditSession>,
    config_store: &ConfigStore,
    command_rx: &mut mpsc::UnboundedReceiver<EditorCommand>,
    output: &mut W,
) -> io::Result<()> {
    let mut changes = session.subscribe();
    let folder = session.config().default_folder().map(Path::to_path_buf);
    info!(config = %config_store.path().display(), "starting command loop");

    let mut context = RuntimeContext {
        config_store,
        folder,
        output,
        session,
        tasks: JoinSet::new(),
    };
    context.render_file_list()?;

    loop {
        tokio::select! {
            command = command_rx.recv() => {
                let Some(command) = command else {
                    break;
                };
                if matches!(context.process_command(command).await?, EventResult::Quit) {
                    break;
                }
            }
            Ok(()) = changes.changed() => {
                context.render_file_list()?;
            }
            Some(joined) = context.tasks.join_next(), if !context.tasks.is_empty() => {
                context.report(joined)?;
            }
        }
    }

    while let Some(joined) = context.tasks.join_next().await {
        context.report(joined)?;
    }
    context.output.flush()
}

impl<W: Write> RuntimeContext<'_, W> {
    async fn process_command(&mut self, command: EditorCommand) -> io::Result<EventResult> {
        match command {
            EditorCommand::Create => {
                let Some(folder) = self.folder.clone() else {
                    return self.reply_missing_folder();
                };
                let created = self.session.on_create_requested(folder);
                self.spawn_intent(created, |path| format!("created {}", display_name(&path)));
            }
            EditorCommand::Delete(name) => {
                let Some(path) = self.resolve(&name) else {
                    return self.reply_missing_folder();
                };
                let deleted = self.session.on_delete_requested(path);
                self.spawn_intent(deleted, move |()| format!("deleted {name}"));
            }
            EditorCommand::Edit(text) => {
                if let Err(error) = self.session.on_text_changed(text) {
                    self.reply_error(&error)?;
                }
            }
            EditorCommand::Help => self.reply(render::HELP)?,
            EditorCommand::List => self.render_file_list()?,
            EditorCommand::Open(name) => {
                let Some(path) = self.resolve(&name) else {
                    return self.reply_missing_folder();
                };
                let opened = self.session.on_file_clicked(path);
                self.spawn_intent(opened, move |()| format!("opened {name}"));
            }
            EditorCommand::Quit => return Ok(EventResult::Quit),
            EditorCommand::Rename { name, new_name } => {
                let Some(path) = self.resolve(&name) else {
                    return self.reply_missing_folder();
                };
                let renamed = self.session.on_rename_requested(path, &new_name);
                self.spawn_intent(renamed, move |path| {
                    format!("renamed {name} to {}", display_name(&path))
                });
            }
            EditorCommand::Save => {
                let saved = self.session.on_save_requested();
                self.spawn_intent(saved, |is_written| {
                    if is_written {
                        "saved".to_string()
                    } else {
                        "nothing to save".to_string()
                    }
                });
            }
            EditorCommand::SetFolder(folder) => self.switch_folder(folder).await?,
            EditorCommand::SetHotkey(hotkey) => {
                let accelerator = hotkey.to_accelerator();
                let update = ConfigUpdate {
                    default_folder: None,
                    hotkey: Some(HotkeyUpdate::from(hotkey)),
                };
                match self.persist_config(update).await {
                    Ok(()) => self.reply(&format!("hotkey set to {accelerator}"))?,
                    Err(error) => self.reply_error(&error)?,
                }
            }
            EditorCommand::Show => {
                let active = self.session.active();
                self.reply(&render::active_file(active.as_ref()))?;
            }
        }

        Ok(EventResult::Continue)
    }

    /// Opens `folder` and only then remembers it as the default folder.
    ///
    /// A refused switch, e.g. with unsaved changes, leaves both the session
    /// and the stored configuration untouched.
    async fn switch_folder(&mut self, folder: PathBuf) -> io::Result<()> {
        let file_count = match self.session.open_folder(folder.clone()).await {
            Ok(file_count) => file_count,
            Err(error) => return self.reply_error(&error),
        };
        self.folder = Some(folder.clone());
        self.reply(&format!("opened folder with {file_count} files"))?;

        let update = ConfigUpdate {
            default_folder: Some(folder),
            hotkey: None,
        };
        if let Err(error) = self.persist_config(update).await {
            self.reply_error(&error)?;
        }

        Ok(())
    }

    /// Merges `update` into the stored file and the session configuration.
    ///
    /// The stored file is re-read first so command line overrides applied to
    /// the session are not written back.
    async fn persist_config(&self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let stored = self.config_store.load().await?;
        self.config_store.save(&stored.merged(update.clone())).await?;
        self.session.update_config(update);
        info!(path = %self.config_store.path().display(), "saved config");

        Ok(())
    }

    fn spawn_intent<T: Send + 'static>(
        &mut self,
        intent: EditFuture<T>,
        describe: impl FnOnce(T) -> String + Send + 'static,
    ) {
        self.tasks.spawn(async move { intent.await.map(describe) });
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }

        self.folder.as_deref().map(|folder| folder.join(path))
    }

    fn report(&mut self, joined: Result<IntentOutcome, tokio::task::JoinError>) -> io::Result<()> {
        match joined {
            Ok(Ok(message)) => self.reply(&message),
            Ok(Err(edit_error)) => self.reply_error(&edit_error),
            Err(join_error) => {
                error!(error = %join_error, "intent task failed");

                Ok(())
            }
        }
    }

    fn render_file_list(&mut self) -> io::Result<()> {
        let label = folder_label(self.folder.as_deref());
        let entries = self.session.entries();

        self.reply(&render::file_list(&label, &entries))
    }

    fn reply(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{message}")?;
        self.output.flush()
    }

    fn reply_error(&mut self, error: &dyn std::error::Error) -> io::Result<()> {
        warn!(%error, "command failed");

        self.reply(&format!("error: {error}"))
    }

    fn reply_missing_folder(&mut self) -> io::Result<EventResult> {
        self.reply_error(&EditError::NoDefaultFolder)?;

        Ok(EventResult::Continue)
    }
}
