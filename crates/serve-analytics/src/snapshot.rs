//! The fixed-shape `/metrics` snapshot for dashboard widgets that need a
//! guaranteed structure. Computed directly from the dataset, bypassing the
//! agent and the intent mapper.

use crate::metrics::{
    self, BirthdayReminder, ClassAttendance, ClassRate, CourseRate, EnrollmentPoint, ServiceCount,
};
use chrono::NaiveDate;
use serde::Serialize;
use serve_data::records::ClientStatus;
use serve_data::Dataset;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub success: bool,
    pub total_revenue: f64,
    pub outstanding_payments: f64,
    pub active_clients: usize,
    pub inactive_clients: usize,
    pub total_orders: usize,
    pub avg_order_value: f64,
    pub new_clients_this_month: usize,
    pub birthday_reminders: Vec<BirthdayReminder>,
    pub enrollment_trends: Vec<EnrollmentPoint>,
    pub top_services: Vec<ServiceCount>,
    pub attendance: Vec<ClassAttendance>,
    pub completion_rates: Vec<CourseRate>,
    pub drop_off_rates: Vec<ClassRate>,
}

impl MetricsSnapshot {
    pub fn compute(dataset: &Dataset, today: NaiveDate) -> Self {
        let total_orders = dataset.orders.len();
        let avg_order_value = if total_orders > 0 {
            let total: f64 = dataset.orders.iter().map(|o| o.amount).sum();
            (total / total_orders as f64 * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            success: true,
            total_revenue: metrics::revenue(dataset),
            outstanding_payments: metrics::outstanding_payments(dataset),
            active_clients: metrics::client_count(dataset, ClientStatus::Active),
            inactive_clients: metrics::client_count(dataset, ClientStatus::Inactive),
            total_orders,
            avg_order_value,
            new_clients_this_month: metrics::new_client_count(dataset, today),
            birthday_reminders: metrics::birthday_reminders(dataset, today),
            enrollment_trends: metrics::enrollment_trends(dataset, today),
            top_services: metrics::top_services(dataset),
            attendance: metrics::attendance_reports(dataset),
            completion_rates: metrics::completion_rates(dataset),
            drop_off_rates: metrics::drop_off_rates(dataset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_shape_is_camel_case() {
        let ds = Dataset::fixture();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let snapshot = MetricsSnapshot::compute(&ds, today);
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["totalRevenue"], 550.0);
        assert_eq!(value["outstandingPayments"], 150.0);
        assert_eq!(value["activeClients"], 3);
        assert_eq!(value["inactiveClients"], 2);
        assert_eq!(value["totalOrders"], 5);
        assert_eq!(value["avgOrderValue"], 164.0);
        assert!(value["enrollmentTrends"].as_array().unwrap().len() == 3);
        assert!(value.get("topServices").is_some());
        assert!(value.get("dropOffRates").is_some());
    }

    #[test]
    fn test_snapshot_on_empty_dataset() {
        let ds = Dataset::new(vec![], vec![], vec![], vec![], vec![], vec![]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let snapshot = MetricsSnapshot::compute(&ds, today);
        assert_eq!(snapshot.total_orders, 0);
        assert_eq!(snapshot.avg_order_value, 0.0);
        assert_eq!(snapshot.total_revenue, 0.0);
        assert!(snapshot.top_services.is_empty());
    }
}
