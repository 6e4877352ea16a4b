use std::io::{self, BufRead};

use tokio::sync::mpsc;
use tracing::warn;

use crate::runtime::command::{CommandParseError, EditorCommand, parse_command};

/// Reads commands from stdin on a dedicated thread.
///
/// Unparseable lines are logged and skipped. End of input sends
/// [`EditorCommand::Quit`].
pub fn spawn_command_reader(command_tx: mpsc::UnboundedSender<EditorCommand>) {
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };

            match parse_command(&line) {
                Ok(command) => {
                    if command_tx.send(command).is_err() {
                        return;
                    }
                }
                Err(CommandParseError::Empty) => {}
                Err(error) => warn!(%error, "ignored command line"),
            }
        }

        let _ = command_tx.send(EditorCommand::Quit);
    });
}
