//! Bounded per-session conversational memory.
//!
//! Each session id owns an independent queue of turns, truncated to the most
//! recent `max_turns`. Sessions live for the process lifetime; growth in the
//! number of distinct sessions is an accepted limitation. The store also
//! extracts ids and email addresses from user text into a per-session
//! context summary that is prepended to the rendered transcript.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

impl Speaker {
    fn label(&self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Agent => "Agent",
        }
    }
}

/// One entry in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Speaker,
    pub text: String,
}

/// Entities remembered from earlier user messages in a session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub last_client_id: Option<String>,
    pub last_order_id: Option<String>,
    pub last_course_id: Option<String>,
    pub last_payment_id: Option<String>,
    pub last_email: Option<String>,
}

impl SessionContext {
    /// One-line summary for the prompt, empty when nothing was extracted.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(id) = &self.last_client_id {
            parts.push(format!("Last client: {}", id));
        }
        if let Some(id) = &self.last_order_id {
            parts.push(format!("Last order: {}", id));
        }
        if let Some(id) = &self.last_course_id {
            parts.push(format!("Last course: {}", id));
        }
        if let Some(id) = &self.last_payment_id {
            parts.push(format!("Last payment: {}", id));
        }
        if let Some(email) = &self.last_email {
            parts.push(format!("Email: {}", email));
        }
        parts.join(" | ")
    }

    /// Update from a user message.
    fn absorb(&mut self, text: &str) {
        if let Some(id) = capture(client_id_re(), text) {
            self.last_client_id = Some(id);
        }
        if let Some(id) = capture(order_id_re(), text) {
            self.last_order_id = Some(id);
        }
        if let Some(id) = capture(course_id_re(), text) {
            self.last_course_id = Some(id);
        }
        if let Some(id) = capture(payment_id_re(), text) {
            self.last_payment_id = Some(id);
        }
        if let Some(m) = email_re().find(text) {
            self.last_email = Some(m.as_str().to_string());
        }
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn client_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:client|customer)\s*(?:id|#)?\s*([A-Za-z]?\d+)").unwrap())
}

fn order_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)order\s*(?:id|#)?\s*([A-Za-z]?\d+)").unwrap())
}

fn course_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)course\s*(?:id|#)?\s*([A-Za-z]?\d+)").unwrap())
}

fn payment_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)payment\s*(?:id|#)?\s*([A-Za-z]?\d+)").unwrap())
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
    })
}

struct SessionMemory {
    turns: VecDeque<Turn>,
    context: SessionContext,
}

impl SessionMemory {
    fn new() -> Self {
        Self {
            turns: VecDeque::new(),
            context: SessionContext::default(),
        }
    }
}

/// Stats snapshot for the /memory/stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    pub active_sessions: usize,
    pub max_turns: usize,
    pub retention_hours: u32,
}

/// Session-keyed conversation store. Owned by server state and passed by
/// handle to request handlers; constructed once at process start.
pub struct ConversationStore {
    sessions: HashMap<String, SessionMemory>,
    max_turns: usize,
    retention_hours: u32,
}

impl ConversationStore {
    pub fn new(max_turns: usize, retention_hours: u32) -> Self {
        Self {
            sessions: HashMap::new(),
            max_turns,
            retention_hours,
        }
    }

    /// Append a (user, agent) turn pair, creating the session on first use
    /// and truncating to the most recent `max_turns` turns.
    pub fn append(&mut self, session_id: &str, user_text: &str, agent_text: &str) {
        let memory = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionMemory::new);

        memory.context.absorb(user_text);
        memory.turns.push_back(Turn {
            role: Speaker::User,
            text: user_text.to_string(),
        });
        memory.turns.push_back(Turn {
            role: Speaker::Agent,
            text: agent_text.to_string(),
        });

        while memory.turns.len() > self.max_turns {
            memory.turns.pop_front();
        }
    }

    /// Ordered history for a session, oldest first. Empty if unseen.
    pub fn get_context(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .get(session_id)
            .map(|m| m.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Extracted entity context for a session.
    pub fn session_context(&self, session_id: &str) -> SessionContext {
        self.sessions
            .get(session_id)
            .map(|m| m.context.clone())
            .unwrap_or_default()
    }

    /// Format a session's history into the context block presented to the
    /// agent. Empty string when the session has no history.
    pub fn render_context(&self, session_id: &str) -> String {
        let memory = match self.sessions.get(session_id) {
            Some(m) => m,
            None => return String::new(),
        };

        let mut out = String::new();
        let summary = memory.context.summary();
        if !summary.is_empty() {
            out.push_str("CONVERSATION CONTEXT:\n");
            out.push_str(&summary);
            out.push('\n');
        }
        if !memory.turns.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("RECENT CONVERSATION:\n");
            for turn in &memory.turns {
                out.push_str(turn.role.label());
                out.push_str(": ");
                out.push_str(&turn.text);
                out.push('\n');
            }
        }
        out
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            active_sessions: self.sessions.len(),
            max_turns: self.max_turns,
            retention_hours: self.retention_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_session_is_empty() {
        let store = ConversationStore::new(10, 24);
        assert!(store.get_context("nope").is_empty());
        assert_eq!(store.render_context("nope"), "");
    }

    #[test]
    fn test_append_keeps_order() {
        let mut store = ConversationStore::new(10, 24);
        store.append("s1", "hello", "hi there");
        let turns = store.get_context("s1");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Speaker::User);
        assert_eq!(turns[0].text, "hello");
        assert_eq!(turns[1].role, Speaker::Agent);
        assert_eq!(turns[1].text, "hi there");
    }

    #[test]
    fn test_truncation_retains_last_n_turns() {
        let max_turns = 4;
        let mut store = ConversationStore::new(max_turns, 24);
        // Five append calls (N+1 pairs for N=4 turns retained).
        for i in 0..5 {
            store.append("s1", &format!("q{}", i), &format!("a{}", i));
        }
        let turns = store.get_context("s1");
        assert_eq!(turns.len(), max_turns);
        // Oldest first: the surviving turns are the last two pairs.
        assert_eq!(turns[0].text, "q3");
        assert_eq!(turns[1].text, "a3");
        assert_eq!(turns[2].text, "q4");
        assert_eq!(turns[3].text, "a4");
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut store = ConversationStore::new(10, 24);
        store.append("a", "question a", "answer a");
        store.append("b", "question b", "answer b");
        assert_eq!(store.get_context("a").len(), 2);
        assert_eq!(store.get_context("b").len(), 2);
        assert!(store.get_context("a")[0].text.contains("a"));
        assert_eq!(store.stats().active_sessions, 2);
    }

    #[test]
    fn test_render_context_labels_roles() {
        let mut store = ConversationStore::new(10, 24);
        store.append("s1", "what classes run this week", "Three classes are active.");
        let rendered = store.render_context("s1");
        assert!(rendered.contains("User: what classes run this week"));
        assert!(rendered.contains("Agent: Three classes are active."));
    }

    #[test]
    fn test_entity_extraction() {
        let mut store = ConversationStore::new(10, 24);
        store.append("s1", "has order #12345 been paid?", "Yes, order 12345 is paid.");
        store.append("s1", "my email is priya@example.com", "Noted.");

        let ctx = store.session_context("s1");
        assert_eq!(ctx.last_order_id.as_deref(), Some("12345"));
        assert_eq!(ctx.last_email.as_deref(), Some("priya@example.com"));

        let rendered = store.render_context("s1");
        assert!(rendered.contains("CONVERSATION CONTEXT:"));
        assert!(rendered.contains("Last order: 12345"));
    }

    #[test]
    fn test_stats_reports_retention() {
        let store = ConversationStore::new(10, 24);
        let stats = store.stats();
        assert_eq!(stats.active_sessions, 0);
        assert_eq!(stats.retention_hours, 24);
        assert_eq!(stats.max_turns, 10);
    }
}
