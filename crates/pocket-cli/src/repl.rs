use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use pocket_session::{SessionStore, StorePhase};

use crate::commands::{resolve_thread, Command, HELP};
use crate::render;

/// What the loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Quit,
}

/// Banner (if any) followed by the active conversation
pub fn view(store: &SessionStore) -> String {
    let mut parts = Vec::new();
    if let Some(banner) = store.banner() {
        parts.push(render::banner(banner));
    }
    if let Some(thread) = store.active_thread() {
        parts.push(format!("== {} ==", thread.title));
        parts.push(render::conversation(&thread.messages));
    }
    parts.join("\n")
}

/// Apply one command to the store and return what to print
pub async fn execute(store: &mut SessionStore, command: Command) -> Flow {
    let output = match command {
        Command::Say(text) => say(store, &text).await,
        Command::New => match store.start_new_thread().await.map(|_| ()) {
            Ok(()) => view(store),
            Err(e) => {
                tracing::debug!(error = %e, "New chat failed");
                banner_or(store, &e.to_string())
            }
        },
        Command::List => render::thread_list(store.threads(), store.active_thread_id()),
        Command::Open(reference) => {
            let Some(id) = resolve_thread(store.threads(), &reference).map(str::to_string) else {
                return Flow::Continue(format!("No chat matches '{}'", reference));
            };
            match store.select_thread(&id).map(|_| ()) {
                Ok(()) => view(store),
                Err(e) => e.to_string(),
            }
        }
        Command::Delete(reference) => {
            let Some(id) = resolve_thread(store.threads(), &reference).map(str::to_string) else {
                return Flow::Continue(format!("No chat matches '{}'", reference));
            };
            let was_active = store.active_thread_id() == Some(id.as_str());
            match store.delete_thread(&id).await {
                Ok(()) if was_active => format!("Chat deleted.\n{}", view(store)),
                Ok(()) => "Chat deleted.".to_string(),
                Err(e) => {
                    tracing::debug!(error = %e, "Replacement chat failed");
                    format!("Chat deleted.\n{}", banner_or(store, &e.to_string()))
                }
            }
        }
        Command::Dismiss => {
            store.dismiss_banner();
            match store.banner() {
                Some(banner) => render::banner(banner),
                None => String::new(),
            }
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return Flow::Quit,
    };
    Flow::Continue(output)
}

async fn say(store: &mut SessionStore, text: &str) -> String {
    if store.phase() == StorePhase::ConfigurationError || !store.is_configured() {
        return banner_or(store, "Chat is not configured.");
    }
    if store.active_thread_id().is_none() {
        return "No active chat. Type /new to start one.".to_string();
    }

    store.send_user_message(text).await;
    store
        .messages()
        .last()
        .map(render::message)
        .unwrap_or_default()
}

fn banner_or(store: &SessionStore, fallback: &str) -> String {
    store
        .banner()
        .map(render::banner)
        .unwrap_or_else(|| fallback.to_string())
}

/// Whether `command` will wait on the model, i.e. the typing indicator applies
pub fn awaits_reply(store: &SessionStore, command: &Command) -> bool {
    if !store.is_configured() || store.phase() == StorePhase::ConfigurationError {
        return false;
    }
    match command {
        Command::Say(_) => store.can_send() && store.active_thread_id().is_some(),
        Command::New => true,
        // Deleting the active chat greets a replacement
        Command::Delete(reference) => {
            let id = resolve_thread(store.threads(), reference);
            id.is_some() && id == store.active_thread_id()
        }
        _ => false,
    }
}

/// Read commands from `input` until `/quit` or end of input
pub async fn run<R>(store: &mut SessionStore, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let intro = view(store);
    if !intro.is_empty() {
        println!("{}", intro);
    }
    println!("Type /help for commands.");

    let mut lines = input.lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        if awaits_reply(store, &command) {
            println!("{}", render::TYPING_INDICATOR);
        }

        match execute(store, command).await {
            Flow::Continue(output) if output.is_empty() => {}
            Flow::Continue(output) => println!("{}", output),
            Flow::Quit => break,
        }
    }

    tracing::debug!("Input loop finished");
    Ok(())
}
