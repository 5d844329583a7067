// 📤 Remote delivery: POST each record as JSON to an external transactions API

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::DeliveryError;
use crate::record::TransactionRecord;
use crate::sink::TransactionDelivery;

/// Wire shape expected by the receiving API
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPayload<'a> {
    pub account_id: &'a str,
    pub date_movement: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub description: &'a str,
    pub amount: Option<Decimal>,
    pub balance: Option<Decimal>,
    pub bank_code: &'a str,
    pub entity_code: &'a str,
    pub extract_date: Option<NaiveDate>,
}

impl<'a> From<&'a TransactionRecord> for DeliveryPayload<'a> {
    fn from(record: &'a TransactionRecord) -> Self {
        Self {
            account_id: &record.account_id,
            date_movement: record.date,
            value_date: record.value_date,
            description: &record.description,
            amount: record.amount,
            balance: record.balance,
            bank_code: &record.source,
            entity_code: &record.entity_code,
            extract_date: record.extraction_date,
        }
    }
}

pub struct HttpDelivery {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpDelivery {
    pub fn new(url: &str) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl TransactionDelivery for HttpDelivery {
    fn send(&self, record: &TransactionRecord) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(&DeliveryPayload::from(record))
            .send()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "record delivered");
            return Ok(());
        }

        let body = response.text().unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn record() -> TransactionRecord {
        TransactionRecord {
            date: NaiveDate::from_ymd_opt(2024, 12, 20),
            value_date: None,
            description: "COMPRA CONTINENTE".to_string(),
            amount: Decimal::from_str("-45.99").ok(),
            balance: None,
            category: String::new(),
            source: "BPI".to_string(),
            account_id: "2212233828".to_string(),
            extraction_date: NaiveDate::from_ymd_opt(2024, 12, 25),
            entity_code: "bpi".to_string(),
        }
    }

    #[test]
    fn test_payload_uses_camel_case_keys() {
        let r = record();
        let json = serde_json::to_value(DeliveryPayload::from(&r)).unwrap();

        assert_eq!(json["accountId"], "2212233828");
        assert_eq!(json["dateMovement"], "2024-12-20");
        assert_eq!(json["extractDate"], "2024-12-25");
        assert_eq!(json["bankCode"], "BPI");
        assert_eq!(json["entityCode"], "bpi");
        assert_eq!(json["amount"], -45.99);
    }

    #[test]
    fn test_payload_missing_values_are_null() {
        let r = record();
        let json = serde_json::to_value(DeliveryPayload::from(&r)).unwrap();

        assert!(json["valueDate"].is_null());
        assert!(json["balance"].is_null());
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost: connection refused on test machines
        let delivery = HttpDelivery::new("http://127.0.0.1:9/transactions").unwrap();

        let err = delivery.send(&record()).unwrap_err();

        assert!(matches!(err, DeliveryError::Transport(_)));
    }
}
