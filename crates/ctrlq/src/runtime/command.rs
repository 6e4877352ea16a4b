//! Text command grammar of the terminal front end.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::config::Hotkey;

/// User intent delivered to the runtime loop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EditorCommand {
    /// Create an empty file in the current folder.
    Create,
    /// Delete the named file.
    Delete(String),
    /// Replace the active file text.
    Edit(String),
    Help,
    List,
    /// Open the named file and make it active.
    Open(String),
    Quit,
    /// Rename a file, keeping its extension.
    Rename { name: String, new_name: String },
    Save,
    /// Switch to another folder and remember it as the default.
    SetFolder(PathBuf),
    SetHotkey(Hotkey),
    /// Print the active file.
    Show,
}

/// Failures while parsing one command line.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("invalid hotkey `{accelerator}`")]
    InvalidHotkey { accelerator: String },
    #[error("`{verb}` needs an argument")]
    MissingArgument { verb: String },
    #[error("unknown command `{verb}`, try `help`")]
    Unknown { verb: String },
}

/// Parses one input line into an [`EditorCommand`].
///
/// The `edit` argument understands `\n` and `\\` escapes so multi-line text
/// fits on one line.
///
/// # Errors
/// Returns an error for blank lines, unknown verbs, missing arguments and
/// unparseable hotkeys.
pub fn parse_command(line: &str) -> Result<EditorCommand, CommandParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    let (verb, argument) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, argument)) => (verb, argument),
        None => (trimmed, ""),
    };

    match verb {
        "" => Err(CommandParseError::Empty),
        "create" | "new" => Ok(EditorCommand::Create),
        "delete" | "rm" => Ok(EditorCommand::Delete(required(verb, argument)?)),
        "edit" => Ok(EditorCommand::Edit(unescape(argument))),
        "folder" => Ok(EditorCommand::SetFolder(PathBuf::from(required(
            verb, argument,
        )?))),
        "help" => Ok(EditorCommand::Help),
        "hotkey" => {
            let accelerator = required(verb, argument)?;
            Hotkey::parse_accelerator(&accelerator)
                .map(EditorCommand::SetHotkey)
                .ok_or(CommandParseError::InvalidHotkey { accelerator })
        }
        "list" | "ls" => Ok(EditorCommand::List),
        "open" => Ok(EditorCommand::Open(required(verb, argument)?)),
        "quit" | "exit" => Ok(EditorCommand::Quit),
        "rename" | "mv" => {
            let argument = required(verb, argument)?;
            let Some((name, new_name)) = argument.split_once(char::is_whitespace) else {
                return Err(CommandParseError::MissingArgument {
                    verb: verb.to_string(),
                });
            };

            Ok(EditorCommand::Rename {
                name: name.to_string(),
                new_name: new_name.trim().to_string(),
            })
        }
        "save" => Ok(EditorCommand::Save),
        "show" | "cat" => Ok(EditorCommand::Show),
        _ => Err(CommandParseError::Unknown {
            verb: verb.to_string(),
        }),
    }
}

fn required(verb: &str, argument: &str) -> Result<String, CommandParseError> {
    let argument = argument.trim();
    if argument.is_empty() {
        return Err(CommandParseError::MissingArgument {
            verb: verb.to_string(),
        });
    }

    Ok(argument.to_string())
}

fn unescape(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut characters = text.chars();

    while let Some(character) = characters.next() {
        if character != '\\' {
            unescaped.push(character);
            continue;
        }

        match characters.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some(escaped) => unescaped.push(escaped),
            None => unescaped.push('\\'),
        }
    }

    unescaped
}
