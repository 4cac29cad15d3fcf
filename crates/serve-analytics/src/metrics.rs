//! The metric catalog. Each metric is a pure function of `(&Dataset,
//! NaiveDate)` returning a success envelope embedding its named payload;
//! the routed (tool-facing) variant additionally aliases the payload under
//! a generic `result` key for uniform consumption by the agent.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use serde_json::{json, Value};
use serve_data::records::{ClientStatus, OrderStatus, PaymentStatus};
use serve_data::Dataset;
use std::fmt;
use std::str::FromStr;

/// Closed catalog of metric names (the `queryType` values the agent sends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Revenue,
    MonthlyRevenue,
    OutstandingPayments,
    ActiveClients,
    InactiveClients,
    NewClientsThisMonth,
    BirthdayReminders,
    EnrollmentTrends,
    TopServices,
    CourseCompletionRates,
    AttendanceReports,
    DropOffRates,
    CompletionRates,
    ClientStatusCount,
}

impl Metric {
    pub const ALL: [Metric; 14] = [
        Metric::Revenue,
        Metric::MonthlyRevenue,
        Metric::OutstandingPayments,
        Metric::ActiveClients,
        Metric::InactiveClients,
        Metric::NewClientsThisMonth,
        Metric::BirthdayReminders,
        Metric::EnrollmentTrends,
        Metric::TopServices,
        Metric::CourseCompletionRates,
        Metric::AttendanceReports,
        Metric::DropOffRates,
        Metric::CompletionRates,
        Metric::ClientStatusCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::MonthlyRevenue => "monthlyRevenue",
            Metric::OutstandingPayments => "outstandingPayments",
            Metric::ActiveClients => "activeClients",
            Metric::InactiveClients => "inactiveClients",
            Metric::NewClientsThisMonth => "newClientsThisMonth",
            Metric::BirthdayReminders => "birthdayReminders",
            Metric::EnrollmentTrends => "enrollmentTrends",
            Metric::TopServices => "topServices",
            Metric::CourseCompletionRates => "courseCompletionRates",
            Metric::AttendanceReports => "attendanceReports",
            Metric::DropOffRates => "dropOffRates",
            Metric::CompletionRates => "completionRates",
            Metric::ClientStatusCount => "clientStatusCount",
        }
    }

    /// Key of the named payload inside the envelope.
    fn payload_key(&self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::MonthlyRevenue => "monthlyRevenue",
            Metric::OutstandingPayments => "outstandingPayments",
            Metric::ActiveClients => "activeClients",
            Metric::InactiveClients => "inactiveClients",
            Metric::NewClientsThisMonth => "newClients",
            Metric::BirthdayReminders => "birthdayReminders",
            Metric::EnrollmentTrends => "enrollmentTrends",
            Metric::TopServices => "topServices",
            Metric::CourseCompletionRates => "completionRate",
            Metric::AttendanceReports => "attendanceReports",
            Metric::DropOffRates => "dropOffRates",
            Metric::CompletionRates => "completionRates",
            Metric::ClientStatusCount => "clientStatusCounts",
        }
    }

    /// Compute the metric envelope.
    pub fn compute(&self, dataset: &Dataset, today: NaiveDate) -> Value {
        match self {
            Metric::Revenue => json!({
                "success": true,
                "revenue": number(revenue(dataset)),
                "currency": "USD",
            }),
            Metric::MonthlyRevenue => json!({
                "success": true,
                "monthlyRevenue": number(monthly_revenue(dataset, today)),
                "month": today.month(),
                "year": today.year(),
                "currency": "USD",
            }),
            Metric::OutstandingPayments => json!({
                "success": true,
                "outstandingPayments": number(outstanding_payments(dataset)),
                "currency": "USD",
            }),
            Metric::ActiveClients => {
                let clients = clients_with_status(dataset, ClientStatus::Active);
                json!({ "success": true, "count": clients.len(), "activeClients": clients })
            }
            Metric::InactiveClients => {
                let clients = clients_with_status(dataset, ClientStatus::Inactive);
                json!({ "success": true, "count": clients.len(), "inactiveClients": clients })
            }
            Metric::NewClientsThisMonth => {
                let clients = new_clients_this_month(dataset, today);
                json!({
                    "success": true,
                    "count": clients.len(),
                    "newClients": clients,
                    "month": today.month(),
                    "year": today.year(),
                })
            }
            Metric::BirthdayReminders => {
                let reminders = birthday_reminders(dataset, today);
                json!({ "success": true, "count": reminders.len(), "birthdayReminders": reminders })
            }
            Metric::EnrollmentTrends => json!({
                "success": true,
                "enrollmentTrends": enrollment_trends(dataset, today),
            }),
            Metric::TopServices => json!({
                "success": true,
                "topServices": top_services(dataset),
            }),
            Metric::CourseCompletionRates => {
                let (total, completed, rate) = course_completion_rate(dataset);
                json!({
                    "success": true,
                    "totalEnrollments": total,
                    "completedOrders": completed,
                    "completionRate": rate,
                })
            }
            Metric::AttendanceReports => json!({
                "success": true,
                "attendanceReports": attendance_reports(dataset),
            }),
            Metric::DropOffRates => json!({
                "success": true,
                "dropOffRates": drop_off_rates(dataset),
            }),
            Metric::CompletionRates => json!({
                "success": true,
                "completionRates": completion_rates(dataset),
            }),
            Metric::ClientStatusCount => json!({
                "success": true,
                "clientStatusCounts": client_status_counts(dataset),
            }),
        }
    }

    /// Tool-facing variant: same envelope plus a generic `result` alias of
    /// the named payload.
    pub fn compute_routed(&self, dataset: &Dataset, today: NaiveDate) -> Value {
        let mut envelope = self.compute(dataset, today);
        if let Some(obj) = envelope.as_object_mut() {
            if let Some(payload) = obj.get(self.payload_key()).cloned() {
                obj.insert("result".into(), payload);
            }
        }
        envelope
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `attendance` is an accepted alias for the per-class report.
        if s == "attendance" {
            return Ok(Metric::AttendanceReports);
        }
        Metric::ALL
            .iter()
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// Failure envelope for an unrecognized metric name.
pub fn unknown_metric(name: &str) -> Value {
    let available: Vec<&str> = Metric::ALL.iter().map(Metric::as_str).collect();
    json!({
        "success": false,
        "error": format!("Unknown queryType: {}", name),
        "availableTypes": available,
    })
}

// ── Payload rows ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BirthdayReminder {
    pub name: String,
    pub birthday: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrollmentPoint {
    pub month: String,
    pub enrollments: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceCount {
    pub name: String,
    pub enrollments: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassAttendance {
    pub class: String,
    pub percentage: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseRate {
    pub course: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassRate {
    pub class: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

// ── Pure computations ───────────────────────────────────────────────────

pub fn revenue(dataset: &Dataset) -> f64 {
    dataset
        .payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .map(|p| p.amount)
        .sum()
}

pub fn monthly_revenue(dataset: &Dataset, today: NaiveDate) -> f64 {
    let prefix = format!("{:04}-{:02}", today.year(), today.month());
    dataset
        .payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed && p.created_at.starts_with(&prefix))
        .map(|p| p.amount)
        .sum()
}

pub fn outstanding_payments(dataset: &Dataset) -> f64 {
    dataset
        .payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Pending)
        .map(|p| p.amount)
        .sum()
}

fn clients_with_status(dataset: &Dataset, status: ClientStatus) -> Vec<Value> {
    dataset
        .clients
        .iter()
        .filter(|c| c.status == status)
        .map(|c| serde_json::to_value(c).unwrap_or(Value::Null))
        .collect()
}

pub fn client_count(dataset: &Dataset, status: ClientStatus) -> usize {
    dataset.clients.iter().filter(|c| c.status == status).count()
}

fn new_clients_this_month(dataset: &Dataset, today: NaiveDate) -> Vec<Value> {
    let first_of_month = today.with_day(1).unwrap_or(today);
    dataset
        .clients
        .iter()
        .filter(|c| {
            NaiveDate::parse_from_str(&c.created_at, "%Y-%m-%d")
                .map(|d| d >= first_of_month)
                .unwrap_or(false)
        })
        .map(|c| serde_json::to_value(c).unwrap_or(Value::Null))
        .collect()
}

pub fn new_client_count(dataset: &Dataset, today: NaiveDate) -> usize {
    new_clients_this_month(dataset, today).len()
}

/// Clients whose birthday's month-day falls within the inclusive window
/// `today ..= today + 7 days`. Evaluated day by day, so windows spanning a
/// month or year boundary are handled correctly.
pub fn birthday_reminders(dataset: &Dataset, today: NaiveDate) -> Vec<BirthdayReminder> {
    let window: Vec<(u32, u32)> = (0..=7)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .map(|d| (d.month(), d.day()))
        .collect();

    dataset
        .clients
        .iter()
        .filter(|c| match birthday_month_day(&c.birthday) {
            Some(md) => window.contains(&md),
            None => false,
        })
        .map(|c| BirthdayReminder {
            name: c.name.clone(),
            birthday: c.birthday.clone(),
        })
        .collect()
}

/// Month-day component of a `YYYY-MM-DD` birthday string.
fn birthday_month_day(birthday: &str) -> Option<(u32, u32)> {
    let date = NaiveDate::parse_from_str(birthday, "%Y-%m-%d").ok()?;
    Some((date.month(), date.day()))
}

/// Order counts per creation year-month for the last 3 months ending at the
/// current month, oldest first.
pub fn enrollment_trends(dataset: &Dataset, today: NaiveDate) -> Vec<EnrollmentPoint> {
    let mut points = Vec::with_capacity(3);
    for back in (0..3).rev() {
        let (year, month) = months_back(today.year(), today.month(), back);
        let prefix = format!("{:04}-{:02}", year, month);
        let count = dataset
            .orders
            .iter()
            .filter(|o| o.created_at.starts_with(&prefix))
            .count();
        points.push(EnrollmentPoint {
            month: prefix,
            enrollments: count,
        });
    }
    points
}

fn months_back(year: i32, month: u32, back: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - back as i32;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

/// Top 3 services by order count, descending; ties keep the order services
/// were first encountered in.
pub fn top_services(dataset: &Dataset) -> Vec<ServiceCount> {
    let mut counts: Vec<ServiceCount> = Vec::new();
    for order in &dataset.orders {
        let Some(service) = &order.service else {
            continue;
        };
        match counts.iter_mut().find(|c| &c.name == service) {
            Some(entry) => entry.enrollments += 1,
            None => counts.push(ServiceCount {
                name: service.clone(),
                enrollments: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.enrollments.cmp(&a.enrollments));
    counts.truncate(3);
    counts
}

/// Completed orders as a share of all orders: (total, completed, "NN.NN%").
/// Zero orders yields "0.00%".
pub fn course_completion_rate(dataset: &Dataset) -> (usize, usize, String) {
    let total = dataset.orders.len();
    let completed = dataset
        .orders
        .iter()
        .filter(|o| o.status == OrderStatus::Completed)
        .count();
    let rate = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    (total, completed, format!("{:.2}%", rate))
}

/// Per-class average of recorded attendance percentages, in class order.
pub fn attendance_reports(dataset: &Dataset) -> Vec<ClassAttendance> {
    dataset
        .classes
        .iter()
        .filter_map(|class| {
            let recorded: Vec<f64> = dataset
                .attendance
                .iter()
                .filter(|a| a.class_id == class.id)
                .filter_map(|a| a.percentage)
                .collect();
            if recorded.is_empty() {
                return None;
            }
            let average = recorded.iter().sum::<f64>() / recorded.len() as f64;
            Some(ClassAttendance {
                class: class.title.clone(),
                percentage: average as i64,
            })
        })
        .collect()
}

pub fn drop_off_rates(dataset: &Dataset) -> Vec<ClassRate> {
    dataset
        .classes
        .iter()
        .filter_map(|class| {
            class.drop_off_rate.map(|rate| ClassRate {
                class: class.title.clone(),
                rate,
            })
        })
        .collect()
}

pub fn completion_rates(dataset: &Dataset) -> Vec<CourseRate> {
    dataset
        .courses
        .iter()
        .filter_map(|course| {
            course.completion_rate.map(|rate| CourseRate {
                course: course.title.clone(),
                rate,
            })
        })
        .collect()
}

pub fn client_status_counts(dataset: &Dataset) -> Vec<StatusCount> {
    vec![
        StatusCount {
            status: "active".into(),
            count: client_count(dataset, ClientStatus::Active),
        },
        StatusCount {
            status: "inactive".into(),
            count: client_count(dataset, ClientStatus::Inactive),
        },
    ]
}

/// Render a whole-number amount as an integer, anything else as a float.
fn number(total: f64) -> Value {
    if total.fract() == 0.0 && total.abs() < i64::MAX as f64 {
        json!(total as i64)
    } else {
        json!(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serve_data::records::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn client(id: &str, status: ClientStatus, birthday: &str, created_at: &str) -> Client {
        Client {
            id: id.into(),
            name: format!("Client {}", id),
            email: format!("{}@example.com", id),
            phone: "000".into(),
            status,
            enrolled_services: vec![],
            birthday: birthday.into(),
            created_at: created_at.into(),
            notes: None,
        }
    }

    fn order(id: &str, amount: f64, status: OrderStatus, service: &str, created_at: &str) -> Order {
        Order {
            id: id.into(),
            client_id: "c1".into(),
            amount,
            status,
            service: Some(service.into()),
            created_at: created_at.into(),
        }
    }

    fn payment(id: &str, amount: f64, status: PaymentStatus, created_at: &str) -> Payment {
        Payment {
            id: id.into(),
            client_id: "c1".into(),
            order_id: "o1".into(),
            amount,
            status,
            created_at: created_at.into(),
        }
    }

    fn dataset(
        clients: Vec<Client>,
        orders: Vec<Order>,
        payments: Vec<Payment>,
    ) -> Dataset {
        Dataset::new(clients, orders, payments, vec![], vec![], vec![])
    }

    #[test]
    fn test_revenue_and_outstanding() {
        let ds = dataset(
            vec![],
            vec![
                order("o1", 200.0, OrderStatus::Completed, "A", "2024-01-01"),
                order("o2", 150.0, OrderStatus::Pending, "B", "2024-01-02"),
            ],
            vec![
                payment("p1", 200.0, PaymentStatus::Completed, "2024-01-01"),
                payment("p2", 150.0, PaymentStatus::Pending, "2024-01-02"),
            ],
        );
        assert_eq!(revenue(&ds), 200.0);
        assert_eq!(outstanding_payments(&ds), 150.0);
    }

    #[test]
    fn test_client_status_counts() {
        let ds = dataset(
            vec![
                client("c1", ClientStatus::Active, "1990-01-01", "2024-01-01"),
                client("c2", ClientStatus::Inactive, "1990-01-01", "2024-01-01"),
            ],
            vec![],
            vec![],
        );
        let active = Metric::ActiveClients.compute(&ds, date("2024-06-01"));
        let inactive = Metric::InactiveClients.compute(&ds, date("2024-06-01"));
        assert_eq!(active["success"], true);
        assert_eq!(active["count"], 1);
        assert_eq!(inactive["count"], 1);
    }

    #[test]
    fn test_new_clients_this_month() {
        let ds = dataset(
            vec![
                client("c1", ClientStatus::Active, "1990-01-01", "2024-06-01"),
                client("c2", ClientStatus::Active, "1990-01-01", "2024-06-15"),
                client("c3", ClientStatus::Active, "1990-01-01", "2024-05-31"),
            ],
            vec![],
            vec![],
        );
        assert_eq!(new_client_count(&ds, date("2024-06-20")), 2);
    }

    #[test]
    fn test_birthday_window_same_month() {
        let ds = dataset(
            vec![
                client("c1", ClientStatus::Active, "1990-06-18", "2024-01-01"),
                client("c2", ClientStatus::Active, "1990-06-25", "2024-01-01"),
            ],
            vec![],
            vec![],
        );
        let reminders = birthday_reminders(&ds, date("2024-06-15"));
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].name, "Client c1");
    }

    #[test]
    fn test_birthday_window_wraps_year_boundary() {
        let ds = dataset(
            vec![
                client("c1", ClientStatus::Active, "1988-01-02", "2024-01-01"),
                client("c2", ClientStatus::Active, "1985-12-30", "2024-01-01"),
                client("c3", ClientStatus::Active, "1991-01-15", "2024-01-01"),
            ],
            vec![],
            vec![],
        );
        // Dec 28 + 7 days reaches Jan 4 of the next year.
        let reminders = birthday_reminders(&ds, date("2024-12-28"));
        let names: Vec<&str> = reminders.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"Client c1"));
        assert!(names.contains(&"Client c2"));
        assert!(!names.contains(&"Client c3"));
    }

    #[test]
    fn test_enrollment_trends_last_three_months_oldest_first() {
        let ds = dataset(
            vec![],
            vec![
                order("o1", 100.0, OrderStatus::Paid, "A", "2024-04-10"),
                order("o2", 100.0, OrderStatus::Paid, "A", "2024-05-20"),
                order("o3", 100.0, OrderStatus::Paid, "A", "2024-06-01"),
                order("o4", 100.0, OrderStatus::Paid, "A", "2024-06-02"),
                order("o5", 100.0, OrderStatus::Paid, "A", "2024-01-01"),
            ],
            vec![],
        );
        let trends = enrollment_trends(&ds, date("2024-06-15"));
        assert_eq!(
            trends,
            vec![
                EnrollmentPoint { month: "2024-04".into(), enrollments: 1 },
                EnrollmentPoint { month: "2024-05".into(), enrollments: 1 },
                EnrollmentPoint { month: "2024-06".into(), enrollments: 2 },
            ]
        );
    }

    #[test]
    fn test_enrollment_trends_spans_january() {
        let ds = dataset(vec![], vec![], vec![]);
        let trends = enrollment_trends(&ds, date("2024-01-15"));
        let months: Vec<&str> = trends.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["2023-11", "2023-12", "2024-01"]);
    }

    #[test]
    fn test_top_services_descending_stable_ties() {
        let ds = dataset(
            vec![],
            vec![
                order("o1", 1.0, OrderStatus::Paid, "Yoga", "2024-01-01"),
                order("o2", 1.0, OrderStatus::Paid, "Pilates", "2024-01-01"),
                order("o3", 1.0, OrderStatus::Paid, "Yoga", "2024-01-01"),
                order("o4", 1.0, OrderStatus::Paid, "Dance", "2024-01-01"),
                order("o5", 1.0, OrderStatus::Paid, "Swim", "2024-01-01"),
            ],
            vec![],
        );
        let top = top_services(&ds);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].name, "Yoga");
        assert_eq!(top[0].enrollments, 2);
        // Tie between Pilates/Dance/Swim resolved by first encounter.
        assert_eq!(top[1].name, "Pilates");
        assert_eq!(top[2].name, "Dance");
    }

    #[test]
    fn test_completion_rate_zero_orders() {
        let ds = dataset(vec![], vec![], vec![]);
        let (total, completed, rate) = course_completion_rate(&ds);
        assert_eq!(total, 0);
        assert_eq!(completed, 0);
        assert_eq!(rate, "0.00%");
    }

    #[test]
    fn test_completion_rate_formats_two_decimals() {
        let ds = dataset(
            vec![],
            vec![
                order("o1", 1.0, OrderStatus::Completed, "A", "2024-01-01"),
                order("o2", 1.0, OrderStatus::Pending, "A", "2024-01-01"),
                order("o3", 1.0, OrderStatus::Cancelled, "A", "2024-01-01"),
            ],
            vec![],
        );
        let (_, _, rate) = course_completion_rate(&ds);
        assert_eq!(rate, "33.33%");
    }

    #[test]
    fn test_attendance_reports_average_per_class() {
        let ds = Dataset::fixture();
        let reports = attendance_reports(&ds);
        let react = reports.iter().find(|r| r.class == "React Basics").unwrap();
        assert_eq!(react.percentage, 50); // (100 + 0) / 2
        let node = reports
            .iter()
            .find(|r| r.class == "Node.js Fundamentals")
            .unwrap();
        assert_eq!(node.percentage, 95); // (100 + 90) / 2
    }

    #[test]
    fn test_drop_off_rates_only_for_classes_that_have_one() {
        let ds = Dataset::fixture();
        let rates = drop_off_rates(&ds);
        assert_eq!(rates.len(), 3);
        assert!(rates.iter().all(|r| r.rate > 0.0));
    }

    #[test]
    fn test_monthly_revenue_filters_by_month() {
        let ds = dataset(
            vec![],
            vec![],
            vec![
                payment("p1", 100.0, PaymentStatus::Completed, "2024-06-05"),
                payment("p2", 50.0, PaymentStatus::Completed, "2024-05-29"),
                payment("p3", 70.0, PaymentStatus::Pending, "2024-06-10"),
            ],
        );
        assert_eq!(monthly_revenue(&ds, date("2024-06-15")), 100.0);
    }

    #[test]
    fn test_metric_parse_and_alias() {
        assert_eq!("revenue".parse::<Metric>().unwrap(), Metric::Revenue);
        assert_eq!(
            "attendance".parse::<Metric>().unwrap(),
            Metric::AttendanceReports
        );
        assert!("bogus".parse::<Metric>().is_err());
    }

    #[test]
    fn test_unknown_metric_envelope_names_value() {
        let out = unknown_metric("bogus");
        assert_eq!(out["success"], false);
        assert_eq!(out["error"], "Unknown queryType: bogus");
        assert!(out["availableTypes"].as_array().unwrap().len() >= 12);
    }

    #[test]
    fn test_routed_envelope_carries_result_alias() {
        let ds = Dataset::fixture();
        let out = Metric::TopServices.compute_routed(&ds, date("2024-06-01"));
        assert_eq!(out["success"], true);
        assert_eq!(out["result"], out["topServices"]);
    }

    #[test]
    fn test_metric_is_pure_in_date_and_dataset() {
        let ds = Dataset::fixture();
        let a = Metric::BirthdayReminders.compute(&ds, date("2024-12-28"));
        let b = Metric::BirthdayReminders.compute(&ds, date("2024-12-28"));
        assert_eq!(a, b);
    }
}
