use std::fmt::Write as _;

use crate::domain::file::FileEntry;

/// Command reference printed by `help`.
pub(crate) const HELP: &str = "\
commands:
  open <name>             open a file and make it active
  edit <text>             replace the active file text (\\n for newlines)
  save                    write the active file when it has changes
  new                     create an untitled file in the folder
  rename <name> <base>    rename a file, keeping its extension
  delete <name>           delete a file
  list                    show the folder listing
  show                    print the active file
  folder <path>           open another folder and make it the default
  hotkey <accelerator>    store the toggle hotkey, e.g. Control+Q
  help                    print this reference
  quit                    wait for pending writes and exit";

/// Marker placed after the name of a file with unsaved changes.
const DIRTY_MARKER: &str = " *";

/// Renders the folder listing with the active file marked by `>`.
pub(crate) fn file_list(folder_label: &str, entries: &[FileEntry]) -> String {
    let mut rendered = format!("[{folder_label}]");
    if entries.is_empty() {
        rendered.push_str("\n  (no files)");

        return rendered;
    }

    for entry in entries {
        let marker = if entry.active { '>' } else { ' ' };
        let dirty = if entry.dirty { DIRTY_MARKER } else { "" };
        let _ = write!(rendered, "\n{marker} {}{dirty}", entry.display_name());
    }

    rendered
}

/// Renders the active file header and its text.
pub(crate) fn active_file(entry: Option<&FileEntry>) -> String {
    let Some(entry) = entry else {
        return "no file is open".to_string();
    };

    let dirty = if entry.dirty { DIRTY_MARKER } else { "" };
    let content = entry.content.as_deref().unwrap_or("(not loaded)");

    format!("--- {}{dirty} ---\n{content}", entry.display_name())
}
