//! Request orchestration for the two conversational flows.
//!
//! Both flows require a session id, honor a preferred answer language, run
//! the agent with conversation context, and record the finished turn. The
//! dashboard flow additionally tries the intent mapper first and, on a hit,
//! executes the routed request directly against the engines — no model call.

use crate::state::AppState;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use serve_core::types::Message;
use serve_intent::RoutedQuery;
use tracing::{debug, info, warn};

pub const SUPPORT_PROMPT: &str = "\
You are a multilingual customer support assistant for a service business.

Goal: support service-related queries such as course and class details, \
order and payment status, and client enquiries. Communicate clearly and \
professionally in English and major Indian languages (Hindi, Tamil, Telugu, \
Bengali, Marathi, Kannada, Malayalam, Gujarati, Punjabi, Odia, Urdu).

Tools:
- data_query: query internal records (read-only). Collections: clients, \
orders, payments, courses, classes, attendance.
- external_create: create new client enquiries and place orders.
- knowledge_search: reference course descriptions, class descriptions, and \
client notes.

Responsibilities: look up clients by name, email, or phone; fetch orders by \
id or client and filter by status; fetch payment details and compute pending \
dues; list upcoming classes and services; create enquiry tickets and orders.

Guidelines:
- Always use the most relevant tool for the task.
- When using data_query, pass a JSON object with collection, filter, \
operation, and field where needed.
- If data isn't found via tools, reply: 'I do not know based on the \
available data.'
- Never guess or fabricate data.";

pub const DASHBOARD_PROMPT: &str = "\
You are a business analytics assistant helping business owners gain \
insights from internal data.

Tools:
- analytics_query: named business metrics; pass {\"queryType\": ...}.
- data_query: structured record queries. Collections: clients, orders, \
payments, courses, classes, attendance.
- knowledge_search: context from course and class descriptions and client \
notes.

When you receive a tool output (JSON), always summarize the result in \
clear, conversational language. Never return raw JSON.

For date-based questions (e.g. 'What classes are available this week?'), \
use data_query on the classes collection with a filter on status and \
startDate. For example:
User: What are the upcoming classes?
Tool call: {\"collection\": \"classes\", \"filter\": {\"status\": \
\"upcoming\"}, \"operation\": \"find\"}

Responsibilities: revenue and outstanding payments; active vs inactive \
client counts, upcoming birthdays, clients added this month; enrollment \
trends, top courses, completion rates; attendance percentages and drop-off \
rates.

Guidelines:
- Always use the most relevant tool for the question.
- If the tools do not provide a clear answer, respond with: 'I do not know \
based on the available data.'
- Never guess or fabricate numbers or facts.";

/// The phrase an agent uses when its tools came up empty. Responses carrying
/// it are reported as failures, not answers.
const GAVE_UP: &str = "I do not know based on the available data";

/// Supported answer languages, code to display name.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("hi", "Hindi"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("bn", "Bengali"),
    ("mr", "Marathi"),
    ("kn", "Kannada"),
    ("ml", "Malayalam"),
    ("gu", "Gujarati"),
    ("pa", "Punjabi"),
    ("or", "Odia"),
    ("ur", "Urdu"),
];

pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Which conversational flow a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Support,
    Dashboard,
}

/// Body of `POST /support` and `POST /dashboard`. Both the camelCase and
/// snake_case session id spellings are accepted.
#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    #[serde(default, alias = "preferredLanguage")]
    pub preferred_language: Option<String>,
}

/// Run one conversational request end to end and produce the response
/// envelope. Every outcome is an envelope; faults never escape.
pub async fn handle_query(state: &AppState, kind: AgentKind, request: AgentRequest) -> Value {
    let session_id = match request.session_id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return json!({ "success": false, "error": "Missing sessionId parameter" });
        }
    };

    let query = request.query.trim().to_string();
    if query.is_empty() {
        return json!({ "success": false, "error": "Missing query parameter" });
    }

    // Deterministic fast path: known dashboard phrasings skip the model.
    if kind == AgentKind::Dashboard {
        let today = Local::now().date_naive();
        if let Some(routed) = serve_intent::map(&query, today) {
            debug!(%session_id, "Intent mapper hit, bypassing agent");
            let envelope = match routed {
                RoutedQuery::Metric(metric) => metric.compute_routed(&state.dataset, today),
                RoutedQuery::Collection(query_request) => query_request.execute(&state.dataset),
            };
            let mut memory = state.memory.write().await;
            memory.append(&session_id, &query, &envelope.to_string());
            return envelope;
        }
    }

    let prompt = {
        let memory = state.memory.read().await;
        compose_prompt(&memory.render_context(&session_id), &request, &query)
    };

    let agent = match kind {
        AgentKind::Support => &state.support_agent,
        AgentKind::Dashboard => &state.dashboard_agent,
    };

    match agent.run(&[Message::user(&prompt)]).await {
        Ok(answer) => {
            let mut memory = state.memory.write().await;
            memory.append(&session_id, &query, &answer.content);
            drop(memory);

            if answer.content.contains(GAVE_UP) {
                info!(%session_id, "Agent gave up on query");
                json!({ "success": false, "error": answer.content })
            } else {
                json!({ "success": true, "result": answer.content })
            }
        }
        Err(e) => {
            warn!(%session_id, error = %e, "Agent execution failed");
            json!({ "success": false, "error": e.to_string() })
        }
    }
}

/// Stitch the conversation context, the optional language instruction, and
/// the user's question into the single prompt handed to the agent.
fn compose_prompt(context: &str, request: &AgentRequest, query: &str) -> String {
    let mut prompt = String::new();
    if !context.is_empty() {
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }
    if let Some(code) = request.preferred_language.as_deref() {
        if code != "en" {
            if let Some(name) = language_name(code) {
                prompt.push_str(&format!("Answer in {}.\n\n", name));
            }
        }
    }
    prompt.push_str("USER QUERY: ");
    prompt.push_str(query);
    prompt
}
