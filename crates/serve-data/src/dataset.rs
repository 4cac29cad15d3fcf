//! The fixed dataset: construction, the collection catalog, and cached JSON
//! views for the query engine.

use crate::records::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Closed catalog of queryable collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionName {
    Clients,
    Orders,
    Payments,
    Courses,
    Classes,
    Attendance,
}

impl CollectionName {
    pub const ALL: [CollectionName; 6] = [
        CollectionName::Clients,
        CollectionName::Orders,
        CollectionName::Payments,
        CollectionName::Courses,
        CollectionName::Classes,
        CollectionName::Attendance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Clients => "clients",
            CollectionName::Orders => "orders",
            CollectionName::Payments => "payments",
            CollectionName::Courses => "courses",
            CollectionName::Classes => "classes",
            CollectionName::Attendance => "attendance",
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clients" => Ok(CollectionName::Clients),
            "orders" => Ok(CollectionName::Orders),
            "payments" => Ok(CollectionName::Payments),
            "courses" => Ok(CollectionName::Courses),
            "classes" => Ok(CollectionName::Classes),
            "attendance" => Ok(CollectionName::Attendance),
            other => Err(other.to_string()),
        }
    }
}

/// The in-memory dataset. Built once at startup and shared read-only;
/// "creation" tools never mutate it.
pub struct Dataset {
    pub clients: Vec<Client>,
    pub orders: Vec<Order>,
    pub payments: Vec<Payment>,
    pub courses: Vec<Course>,
    pub classes: Vec<Class>,
    pub attendance: Vec<Attendance>,
    /// JSON views per collection, serialized once at construction for the
    /// generic query path.
    views: HashMap<CollectionName, Vec<Value>>,
}

fn to_view<T: Serialize>(items: &[T]) -> Vec<Value> {
    items
        .iter()
        .map(|t| serde_json::to_value(t).expect("record serialization is infallible"))
        .collect()
}

impl Dataset {
    pub fn new(
        clients: Vec<Client>,
        orders: Vec<Order>,
        payments: Vec<Payment>,
        courses: Vec<Course>,
        classes: Vec<Class>,
        attendance: Vec<Attendance>,
    ) -> Self {
        let mut views = HashMap::new();
        views.insert(CollectionName::Clients, to_view(&clients));
        views.insert(CollectionName::Orders, to_view(&orders));
        views.insert(CollectionName::Payments, to_view(&payments));
        views.insert(CollectionName::Courses, to_view(&courses));
        views.insert(CollectionName::Classes, to_view(&classes));
        views.insert(CollectionName::Attendance, to_view(&attendance));

        Self {
            clients,
            orders,
            payments,
            courses,
            classes,
            attendance,
            views,
        }
    }

    /// JSON records for a collection.
    pub fn collection(&self, name: CollectionName) -> &[Value] {
        self.views
            .get(&name)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    /// The seed fixture standing in for the real database.
    pub fn fixture() -> Self {
        let clients = vec![
            Client {
                id: "c1".into(),
                name: "Alice Smith".into(),
                email: "alice@example.com".into(),
                phone: "123-456-7890".into(),
                status: ClientStatus::Active,
                enrolled_services: vec!["Course A".into(), "Course B".into()],
                birthday: "1990-03-15".into(),
                created_at: "2023-05-10".into(),
                notes: Some("Prefers morning classes, interested in data science.".into()),
            },
            Client {
                id: "c2".into(),
                name: "Bob Johnson".into(),
                email: "bob@example.com".into(),
                phone: "987-654-3210".into(),
                status: ClientStatus::Inactive,
                enrolled_services: vec!["Course C".into()],
                birthday: "1985-12-29".into(),
                created_at: "2023-06-01".into(),
                notes: None,
            },
            Client {
                id: "c3".into(),
                name: "Charlie Brown".into(),
                email: "charlie@example.com".into(),
                phone: "555-111-2222".into(),
                status: ClientStatus::Active,
                enrolled_services: vec!["Course A".into()],
                birthday: "1992-07-04".into(),
                created_at: "2023-06-20".into(),
                notes: Some("Asked about weekend batches twice.".into()),
            },
            Client {
                id: "c4".into(),
                name: "Diana Prince".into(),
                email: "diana@example.com".into(),
                phone: "444-888-7777".into(),
                status: ClientStatus::Active,
                enrolled_services: vec!["Course C".into(), "Course D".into()],
                birthday: "1988-01-02".into(),
                created_at: "2023-07-05".into(),
                notes: None,
            },
            Client {
                id: "c5".into(),
                name: "Evan Wright".into(),
                email: "evan@example.com".into(),
                phone: "222-333-4444".into(),
                status: ClientStatus::Inactive,
                enrolled_services: vec![],
                birthday: "1995-08-21".into(),
                created_at: "2023-07-18".into(),
                notes: None,
            },
        ];

        let orders = vec![
            Order {
                id: "o1".into(),
                client_id: "c1".into(),
                amount: 200.0,
                status: OrderStatus::Paid,
                service: Some("Course A".into()),
                created_at: "2023-06-12".into(),
            },
            Order {
                id: "o2".into(),
                client_id: "c2".into(),
                amount: 150.0,
                status: OrderStatus::Pending,
                service: Some("Course C".into()),
                created_at: "2023-07-02".into(),
            },
            Order {
                id: "o3".into(),
                client_id: "c3".into(),
                amount: 100.0,
                status: OrderStatus::Completed,
                service: Some("Course A".into()),
                created_at: "2023-07-11".into(),
            },
            Order {
                id: "o4".into(),
                client_id: "c4".into(),
                amount: 250.0,
                status: OrderStatus::Completed,
                service: Some("Course D".into()),
                created_at: "2023-07-28".into(),
            },
            Order {
                id: "o5".into(),
                client_id: "c5".into(),
                amount: 120.0,
                status: OrderStatus::Cancelled,
                service: Some("Course C".into()),
                created_at: "2023-08-03".into(),
            },
        ];

        let payments = vec![
            Payment {
                id: "p1".into(),
                client_id: "c1".into(),
                order_id: "o1".into(),
                amount: 200.0,
                status: PaymentStatus::Completed,
                created_at: "2023-06-12".into(),
            },
            Payment {
                id: "p2".into(),
                client_id: "c2".into(),
                order_id: "o2".into(),
                amount: 150.0,
                status: PaymentStatus::Pending,
                created_at: "2023-07-02".into(),
            },
            Payment {
                id: "p3".into(),
                client_id: "c3".into(),
                order_id: "o3".into(),
                amount: 100.0,
                status: PaymentStatus::Completed,
                created_at: "2023-07-11".into(),
            },
            Payment {
                id: "p4".into(),
                client_id: "c4".into(),
                order_id: "o4".into(),
                amount: 250.0,
                status: PaymentStatus::Completed,
                created_at: "2023-07-28".into(),
            },
            Payment {
                id: "p5".into(),
                client_id: "c5".into(),
                order_id: "o5".into(),
                amount: 120.0,
                status: PaymentStatus::Failed,
                created_at: "2023-08-03".into(),
            },
        ];

        let courses = vec![
            Course {
                id: "courseA".into(),
                title: "React for Beginners".into(),
                instructor: "Jane Doe".into(),
                description: "Component-based UI development from scratch: JSX, props, state, and hooks.".into(),
                completion_rate: Some(82.0),
            },
            Course {
                id: "courseB".into(),
                title: "Advanced JavaScript".into(),
                instructor: "Mike Ross".into(),
                description: "Closures, prototypes, the event loop, and performance patterns.".into(),
                completion_rate: Some(64.0),
            },
            Course {
                id: "courseC".into(),
                title: "Node.js Essentials".into(),
                instructor: "John Smith".into(),
                description: "Server-side JavaScript: streams, HTTP services, and the npm ecosystem.".into(),
                completion_rate: Some(71.0),
            },
            Course {
                id: "courseD".into(),
                title: "Python for Data Science".into(),
                instructor: "Sara Lee".into(),
                description: "NumPy, pandas, and plotting for practical data analysis.".into(),
                completion_rate: None,
            },
        ];

        let classes = vec![
            Class {
                id: "class1".into(),
                course_id: "courseA".into(),
                title: "React Basics".into(),
                start_date: "2023-07-01".into(),
                status: ClassStatus::Active,
                instructor: "Jane Doe".into(),
                description: "First sessions of the React track: components and props.".into(),
                drop_off_rate: Some(12.0),
            },
            Class {
                id: "class2".into(),
                course_id: "courseC".into(),
                title: "Node.js Fundamentals".into(),
                start_date: "2023-07-15".into(),
                status: ClassStatus::Active,
                instructor: "John Smith".into(),
                description: "Event loop, modules, and building a first HTTP server.".into(),
                drop_off_rate: Some(8.0),
            },
            Class {
                id: "class3".into(),
                course_id: "courseB".into(),
                title: "JS Scope and Closures".into(),
                start_date: "2023-07-20".into(),
                status: ClassStatus::Completed,
                instructor: "Mike Ross".into(),
                description: "Deep dive into lexical scope and closure pitfalls.".into(),
                drop_off_rate: Some(20.0),
            },
            Class {
                id: "class4".into(),
                course_id: "courseD".into(),
                title: "Intro to Pandas".into(),
                start_date: "2023-08-01".into(),
                status: ClassStatus::Active,
                instructor: "Sara Lee".into(),
                description: "DataFrames, indexing, and basic aggregation recipes.".into(),
                drop_off_rate: None,
            },
            Class {
                id: "class5".into(),
                course_id: "courseD".into(),
                title: "Data Viz with Matplotlib".into(),
                start_date: "2023-08-10".into(),
                status: ClassStatus::Upcoming,
                instructor: "Sara Lee".into(),
                description: "Charts and figures for exploratory analysis.".into(),
                drop_off_rate: None,
            },
        ];

        let attendance = vec![
            Attendance {
                id: "att1".into(),
                class_id: "class1".into(),
                client_id: "c1".into(),
                date: "2023-07-02".into(),
                status: AttendanceStatus::Present,
                percentage: Some(100.0),
            },
            Attendance {
                id: "att2".into(),
                class_id: "class1".into(),
                client_id: "c2".into(),
                date: "2023-07-02".into(),
                status: AttendanceStatus::Absent,
                percentage: Some(0.0),
            },
            Attendance {
                id: "att3".into(),
                class_id: "class2".into(),
                client_id: "c1".into(),
                date: "2023-07-16".into(),
                status: AttendanceStatus::Present,
                percentage: Some(100.0),
            },
            Attendance {
                id: "att4".into(),
                class_id: "class2".into(),
                client_id: "c4".into(),
                date: "2023-07-16".into(),
                status: AttendanceStatus::Present,
                percentage: Some(90.0),
            },
            Attendance {
                id: "att5".into(),
                class_id: "class3".into(),
                client_id: "c3".into(),
                date: "2023-07-21".into(),
                status: AttendanceStatus::Present,
                percentage: Some(100.0),
            },
            Attendance {
                id: "att6".into(),
                class_id: "class3".into(),
                client_id: "c1".into(),
                date: "2023-07-21".into(),
                status: AttendanceStatus::Absent,
                percentage: Some(0.0),
            },
            Attendance {
                id: "att7".into(),
                class_id: "class4".into(),
                client_id: "c4".into(),
                date: "2023-08-02".into(),
                status: AttendanceStatus::Present,
                percentage: Some(95.0),
            },
            Attendance {
                id: "att8".into(),
                class_id: "class4".into(),
                client_id: "c1".into(),
                date: "2023-08-02".into(),
                status: AttendanceStatus::Present,
                percentage: None,
            },
        ];

        Self::new(clients, orders, payments, courses, classes, attendance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_roundtrip() {
        for name in CollectionName::ALL {
            assert_eq!(name.as_str().parse::<CollectionName>().unwrap(), name);
        }
        assert!("users".parse::<CollectionName>().is_err());
    }

    #[test]
    fn test_fixture_ids_unique() {
        let ds = Dataset::fixture();
        for name in CollectionName::ALL {
            let records = ds.collection(name);
            let mut ids: Vec<&str> =
                records.iter().filter_map(|r| r["id"].as_str()).collect();
            assert_eq!(ids.len(), records.len(), "{} missing ids", name);
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), records.len(), "{} ids not unique", name);
        }
    }

    #[test]
    fn test_fixture_soft_references_resolve() {
        let ds = Dataset::fixture();
        let client_ids: Vec<&str> = ds.clients.iter().map(|c| c.id.as_str()).collect();
        for order in &ds.orders {
            assert!(client_ids.contains(&order.client_id.as_str()));
        }
        let class_ids: Vec<&str> = ds.classes.iter().map(|c| c.id.as_str()).collect();
        for att in &ds.attendance {
            assert!(class_ids.contains(&att.class_id.as_str()));
        }
    }

    #[test]
    fn test_views_match_typed_data() {
        let ds = Dataset::fixture();
        assert_eq!(ds.collection(CollectionName::Clients).len(), ds.clients.len());
        let first = &ds.collection(CollectionName::Orders)[0];
        assert_eq!(first["clientId"], "c1");
        assert_eq!(first["status"], "paid");
    }
}
