/// First turn of every new session; the reply becomes the thread's opening message
pub const INTRO_PROMPT: &str = "You are Doraemon, a robotic cat from the future. You should act friendly \
and occasionally mention your gadgets or your love for dorayaki. Keep responses concise and playful. \
Respond with: 'Hi! I'm Doraemon!'";

/// Assistant message substituted when a turn fails
pub const FALLBACK_REPLY: &str =
    "Oops! My gadgets are malfunctioning right now. Let me try to fix them!";

pub const MISSING_API_KEY_MESSAGE: &str = "Please add your Gemini API key to the .env file";

const TITLE_MAX_CHARS: usize = 30;
const TITLE_ELLIPSIS: &str = "...";

/// Thread title derived from a user message
///
/// Counts characters, not bytes, and always appends the ellipsis.
pub fn thread_title(text: &str) -> String {
    let prefix: String = text.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}{}", prefix, TITLE_ELLIPSIS)
}
