use std::fmt::Write;

use chrono::Local;
use pocket_persist::{ChatMessage, Sender, Thread};
use pocket_session::{Banner, BannerKind};

pub const ASSISTANT_NAME: &str = "Doraemon";
pub const TYPING_INDICATOR: &str = "Doraemon is typing...";

pub fn message(message: &ChatMessage) -> String {
    let speaker = match message.sender {
        Sender::User => "You",
        Sender::Assistant => ASSISTANT_NAME,
    };
    format!("{}: {}", speaker, message.content)
}

pub fn conversation(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(message)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered thread list with `*` on the active entry
pub fn thread_list(threads: &[Thread], active_id: Option<&str>) -> String {
    if threads.is_empty() {
        return "No chats yet. Type /new to start one.".to_string();
    }

    let mut out = String::new();
    for (i, thread) in threads.iter().enumerate() {
        let marker = if Some(thread.id.as_str()) == active_id { '*' } else { ' ' };
        let created = thread.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        let _ = writeln!(out, "{} {:>2}. {}  ({})", marker, i + 1, thread.title, created);
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn banner(banner: &Banner) -> String {
    match banner.kind {
        BannerKind::Configuration => format!("[!] {}", banner.message),
        BannerKind::Service => format!("[!] {} (/dismiss to hide)", banner.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_message_speakers() {
        assert_eq!(message(&ChatMessage::user("hi")), "You: hi");
        assert_eq!(
            message(&ChatMessage::assistant("Hi! I'm Doraemon!")),
            "Doraemon: Hi! I'm Doraemon!"
        );
    }

    #[test]
    fn test_thread_list_marks_active() {
        let threads = vec![
            Thread::new("2", Utc::now(), ChatMessage::assistant("a")),
            Thread::new("1", Utc::now(), ChatMessage::assistant("b")),
        ];
        let out = thread_list(&threads, Some("1"));
        let lines: Vec<_> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("   1. New Chat"));
        assert!(lines[1].starts_with("*  2. New Chat"));
    }

    #[test]
    fn test_empty_thread_list() {
        assert!(thread_list(&[], None).contains("/new"));
    }

    #[test]
    fn test_only_service_banner_mentions_dismiss() {
        assert!(banner(&Banner::service("boom")).contains("/dismiss"));
        assert!(!banner(&Banner::configuration("no key")).contains("/dismiss"));
    }
}
