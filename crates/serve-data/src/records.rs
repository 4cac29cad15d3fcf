//! Typed entity records. Field names follow the wire shape the original
//! MongoDB collections used (camelCase cross-references, snake_case
//! bookkeeping fields).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Paid,
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassStatus {
    Active,
    Completed,
    Upcoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: ClientStatus,
    #[serde(rename = "enrolledServices")]
    pub enrolled_services: Vec<String>,
    /// Full date of birth; birthday reminders use the month-day component.
    pub birthday: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub amount: f64,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub amount: f64,
    pub status: PaymentStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub instructor: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub title: String,
    #[serde(rename = "startDate")]
    pub start_date: String,
    pub status: ClassStatus,
    pub instructor: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_off_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    pub id: String,
    #[serde(rename = "classId")]
    pub class_id: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub date: String,
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&ClientStatus::Inactive).unwrap(),
            "\"inactive\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(
            serde_json::to_string(&ClassStatus::Upcoming).unwrap(),
            "\"upcoming\""
        );
    }

    #[test]
    fn test_order_wire_field_names() {
        let order = Order {
            id: "o1".into(),
            client_id: "c1".into(),
            amount: 200.0,
            status: OrderStatus::Paid,
            service: Some("Course A".into()),
            created_at: "2023-07-01".into(),
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["clientId"], "c1");
        assert_eq!(value["created_at"], "2023-07-01");
    }
}
