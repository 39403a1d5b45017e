use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Basket entry from `/baskets` and `/baskets/{id}`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Basket {
    #[serde(rename = "basketId")]
    pub basket_id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Remaining basket metadata, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Order record returned by submit and status calls
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Order {
    #[serde(rename = "orderId")]
    pub order_id: String,

    #[serde(rename = "dateOrdered", default)]
    pub date_ordered: Option<String>,

    #[serde(rename = "dateStarted", default)]
    pub date_started: Option<String>,

    /// Null until the server has materialized the basket
    #[serde(rename = "dateFinished", default)]
    pub date_finished: Option<String>,

    #[serde(rename = "failedAttempts", default)]
    pub failed_attempts: Option<u32>,

    #[serde(default)]
    pub processing: Option<bool>,

    #[serde(rename = "queueStatus", default)]
    pub queue_status: Option<i32>,

    #[serde(rename = "basketId", default)]
    pub basket_id: Option<String>,

    #[serde(rename = "orderType", default)]
    pub order_type: Option<i32>,

    #[serde(rename = "enteredQueue", default)]
    pub entered_queue: Option<String>,

    #[serde(rename = "updatedQueue", default)]
    pub updated_queue: Option<String>,
}

impl Order {
    pub fn is_finished(&self) -> bool {
        self.date_finished.is_some()
    }

    /// Completion time, if the server reported one in a recognizable format
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.date_finished.as_deref().and_then(parse_api_datetime)
    }
}

/// Server dates come with or without an offset
fn parse_api_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submitted_order() {
        let order: Order = serde_json::from_str(r#"{"orderId":"abc123"}"#).unwrap();

        assert_eq!(order.order_id, "abc123");
        assert!(!order.is_finished());
        assert!(order.finished_at().is_none());
    }

    #[test]
    fn test_null_date_finished_is_not_terminal() {
        let order: Order =
            serde_json::from_str(r#"{"orderId":"abc123","dateFinished":null}"#).unwrap();
        assert!(!order.is_finished());
    }

    #[test]
    fn test_parse_full_status() {
        let json = r#"{
            "orderId": "abc123",
            "dateOrdered": "2024-01-01T00:00:00",
            "dateStarted": "2024-01-01T00:00:01",
            "dateFinished": "2024-01-01T00:00:05.25",
            "failedAttempts": 0,
            "processing": false,
            "queueStatus": 3,
            "basketId": "42",
            "orderType": 1,
            "enteredQueue": "2024-01-01T00:00:00",
            "updatedQueue": "2024-01-01T00:00:05",
            "somethingNew": true
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();

        assert!(order.is_finished());
        assert_eq!(order.basket_id.as_deref(), Some("42"));
        assert_eq!(order.queue_status, Some(3));

        let finished = order.finished_at().unwrap();
        assert_eq!(finished.to_rfc3339(), "2024-01-01T00:00:05.250+00:00");
    }

    #[test]
    fn test_finished_at_with_offset() {
        let order: Order = serde_json::from_str(
            r#"{"orderId":"abc123","dateFinished":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(order.finished_at().unwrap().timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_parse_basket_keeps_metadata() {
        let json = r#"{"basketId":"42","name":"Test Basket","fileTypeId":12}"#;
        let basket: Basket = serde_json::from_str(json).unwrap();

        assert_eq!(basket.basket_id, "42");
        assert_eq!(basket.name.as_deref(), Some("Test Basket"));
        assert_eq!(basket.extra.get("fileTypeId"), Some(&Value::from(12)));
    }
}
