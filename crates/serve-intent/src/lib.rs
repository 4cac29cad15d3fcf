//! Deterministic intent mapper for the dashboard flow.
//!
//! Maps a free-text analytics question to a structured request before the
//! language model ever sees it. Matching is case-insensitive substring
//! lookup against a fixed ordered rule table, first match wins. The mapper
//! is a pure function of (query text, current date): no side effects, no
//! network, so it can be unit tested exhaustively and the fast path stays
//! deterministic and low-latency.

use chrono::{Datelike, Days, NaiveDate};
use serde_json::{json, Map, Value};
use serve_analytics::Metric;
use serve_data::{CollectionName, QueryRequest};

/// A structured request resolved from free text.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutedQuery {
    /// One of the analytics metric catalog entries.
    Metric(Metric),
    /// A generic collection query for the query engine.
    Collection(QueryRequest),
}

/// What a rule resolves to. `ClassesThisWeek` is special-cased because its
/// filter depends on the current date.
enum Target {
    Metric(Metric),
    ListAll(CollectionName),
    ClassesThisWeek,
}

/// Ordered rule table. Earlier rules win, so the more specific phrasings
/// ("monthly revenue", "new clients") sit above the generic ones they would
/// otherwise shadow ("revenue", "clients").
fn rules() -> &'static [(&'static [&'static str], Target)] {
    const RULES: &[(&[&str], Target)] = &[
        (
            // Class-specific phrasings only, so "revenue this week" still
            // falls through to the revenue rule below.
            &["classes this week", "available this week", "class schedule"],
            Target::ClassesThisWeek,
        ),
        (
            &["top services", "popular services", "best services"],
            Target::Metric(Metric::TopServices),
        ),
        (
            &["monthly revenue", "revenue this month"],
            Target::Metric(Metric::MonthlyRevenue),
        ),
        (
            &["revenue", "income", "earnings"],
            Target::Metric(Metric::Revenue),
        ),
        (
            &["outstanding", "unpaid", "pending payments"],
            Target::Metric(Metric::OutstandingPayments),
        ),
        (
            &["inactive clients"],
            Target::Metric(Metric::InactiveClients),
        ),
        (&["active clients"], Target::Metric(Metric::ActiveClients)),
        (
            &["new clients"],
            Target::Metric(Metric::NewClientsThisMonth),
        ),
        (
            &["client status"],
            Target::Metric(Metric::ClientStatusCount),
        ),
        (
            &["birthday", "birthdays"],
            Target::Metric(Metric::BirthdayReminders),
        ),
        (
            &["enrollment trend", "enrollment trends", "enrollments over"],
            Target::Metric(Metric::EnrollmentTrends),
        ),
        (
            &["drop-off", "drop off", "dropout"],
            Target::Metric(Metric::DropOffRates),
        ),
        (
            &["course completion"],
            Target::Metric(Metric::CourseCompletionRates),
        ),
        (
            &["completion rate", "completion rates"],
            Target::Metric(Metric::CompletionRates),
        ),
        (
            &["attendance"],
            Target::Metric(Metric::AttendanceReports),
        ),
        (
            &["list all courses", "all courses", "what courses"],
            Target::ListAll(CollectionName::Courses),
        ),
        (
            &["list all clients", "all clients"],
            Target::ListAll(CollectionName::Clients),
        ),
        (
            &["list all orders", "all orders"],
            Target::ListAll(CollectionName::Orders),
        ),
        (
            &["list all classes", "all classes"],
            Target::ListAll(CollectionName::Classes),
        ),
    ];
    RULES
}

/// Map a free-text question to a structured request, or `None` when no rule
/// matches and the question should go to the agent verbatim.
pub fn map(query: &str, today: NaiveDate) -> Option<RoutedQuery> {
    let lowered = query.to_lowercase();
    for (phrases, target) in rules() {
        if phrases.iter().any(|p| lowered.contains(p)) {
            return Some(resolve(target, today));
        }
    }
    None
}

fn resolve(target: &Target, today: NaiveDate) -> RoutedQuery {
    match target {
        Target::Metric(metric) => RoutedQuery::Metric(*metric),
        Target::ListAll(collection) => RoutedQuery::Collection(QueryRequest::Find {
            collection: *collection,
            filter: Map::new(),
            projection: None,
        }),
        Target::ClassesThisWeek => RoutedQuery::Collection(QueryRequest::Find {
            collection: CollectionName::Classes,
            filter: classes_this_week_filter(today),
            projection: None,
        }),
    }
}

/// Active classes whose start date falls in the current calendar week,
/// Monday through Sunday, with both bounds rendered as `YYYY-MM-DD`.
fn classes_this_week_filter(today: NaiveDate) -> Map<String, Value> {
    let (monday, sunday) = week_bounds(today);
    let mut filter = Map::new();
    filter.insert("status".into(), json!("active"));
    filter.insert(
        "startDate".into(),
        json!({
            "$gte": monday.format("%Y-%m-%d").to_string(),
            "$lte": sunday.format("%Y-%m-%d").to_string(),
        }),
    );
    filter
}

fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let back = today.weekday().num_days_from_monday() as u64;
    let monday = today.checked_sub_days(Days::new(back)).unwrap_or(today);
    let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
    (monday, sunday)
}
