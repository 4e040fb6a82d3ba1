use thiserror::Error;

use pocket_persist::Thread;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the active thread
    Say(String),
    New,
    List,
    Open(String),
    Delete(String),
    Dismiss,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: /{0} (type /help for the list)")]
    Unknown(String),

    #[error("/{0} needs a thread number or id")]
    MissingArgument(&'static str),
}

pub const HELP: &str = "\
/new            start a new chat
/list           show all chats
/open <n|id>    switch to a chat
/delete <n|id>  delete a chat
/dismiss        hide the error banner
/help           show this help
/quit           exit
Anything else is sent to the active chat.";

impl Command {
    /// Parse a line; blank input yields `None`
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Say(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "new" => Command::New,
            "list" | "ls" => Command::List,
            "open" => Command::Open(required(arg, "open")?),
            "delete" | "rm" => Command::Delete(required(arg, "delete")?),
            "dismiss" => Command::Dismiss,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn required(arg: &str, command: &'static str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument(command))
    } else {
        Ok(arg.to_string())
    }
}

/// Resolve a 1-based list position or a thread id to a thread id
pub fn resolve_thread<'a>(threads: &'a [Thread], reference: &str) -> Option<&'a str> {
    if let Some(thread) = threads.iter().find(|t| t.id == reference) {
        return Some(&thread.id);
    }

    let position: usize = reference.parse().ok()?;
    threads
        .get(position.checked_sub(1)?)
        .map(|t| t.id.as_str())
}
