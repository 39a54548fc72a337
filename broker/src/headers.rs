//! The broker message header set from `spec.md` §6: enough of a job's
//! identity to reconstruct it on the consumer side without decoding the
//! message body first.

use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use smi_protocol::{JobId, JobType};

use crate::error::BrokerError;

/// Per-message headers carried alongside the job payload. Field names
/// mirror the wire contract's `job_*` prefix verbatim so a packet capture
/// lines up with `spec.md` §6 directly.
#[derive(Debug, Clone)]
pub struct MessageHeaders {
    pub job_id: JobId,
    pub job_type: JobType,
    pub job_model_id: String,
    pub job_remote_class: String,
    pub job_remote_method: String,
    pub job_request_model_class: String,
    pub job_response_model_class: String,
    pub job_storage: String,
    pub job_keep_alive: u32,
}

fn get_str(table: &FieldTable, key: &'static str) -> Result<String, BrokerError> {
    match table.inner().get(&ShortString::from(key)) {
        Some(AMQPValue::LongString(s)) => Ok(s.to_string()),
        Some(AMQPValue::ShortString(s)) => Ok(s.to_string()),
        Some(_) => Err(BrokerError::MalformedHeader(key)),
        None => Err(BrokerError::MissingHeader(key)),
    }
}

fn get_u32(table: &FieldTable, key: &'static str) -> Result<u32, BrokerError> {
    match table.inner().get(&ShortString::from(key)) {
        Some(AMQPValue::LongUInt(v)) => Ok(*v),
        Some(AMQPValue::LongInt(v)) => Ok((*v).max(0) as u32),
        Some(_) => Err(BrokerError::MalformedHeader(key)),
        None => Err(BrokerError::MissingHeader(key)),
    }
}

impl MessageHeaders {
    pub fn into_field_table(self) -> FieldTable {
        let mut table = FieldTable::default();
        table.insert(
            ShortString::from("job_id"),
            AMQPValue::LongString(LongString::from(self.job_id.to_string())),
        );
        table.insert(
            ShortString::from("job_type"),
            AMQPValue::LongString(LongString::from(self.job_type.routing_key().to_string())),
        );
        table.insert(
            ShortString::from("job_model_id"),
            AMQPValue::LongString(LongString::from(self.job_model_id)),
        );
        table.insert(
            ShortString::from("job_remote_class"),
            AMQPValue::LongString(LongString::from(self.job_remote_class)),
        );
        table.insert(
            ShortString::from("job_remote_method"),
            AMQPValue::LongString(LongString::from(self.job_remote_method)),
        );
        table.insert(
            ShortString::from("job_request_model_class"),
            AMQPValue::LongString(LongString::from(self.job_request_model_class)),
        );
        table.insert(
            ShortString::from("job_response_model_class"),
            AMQPValue::LongString(LongString::from(self.job_response_model_class)),
        );
        table.insert(
            ShortString::from("job_storage"),
            AMQPValue::LongString(LongString::from(self.job_storage)),
        );
        table.insert(
            ShortString::from("job_keep_alive"),
            AMQPValue::LongUInt(self.job_keep_alive),
        );
        table
    }

    pub fn from_field_table(table: &FieldTable) -> Result<Self, BrokerError> {
        let job_id_raw = get_str(table, "job_id")?;
        let job_type_raw = get_str(table, "job_type")?;
        Ok(Self {
            job_id: job_id_raw
                .parse()
                .map_err(|_| BrokerError::MalformedHeader("job_id"))?,
            job_type: job_type_from_routing_key(&job_type_raw)
                .ok_or(BrokerError::MalformedHeader("job_type"))?,
            job_model_id: get_str(table, "job_model_id")?,
            job_remote_class: get_str(table, "job_remote_class")?,
            job_remote_method: get_str(table, "job_remote_method")?,
            job_request_model_class: get_str(table, "job_request_model_class")?,
            job_response_model_class: get_str(table, "job_response_model_class")?,
            job_storage: get_str(table, "job_storage")?,
            job_keep_alive: get_u32(table, "job_keep_alive")?,
        })
    }
}

fn job_type_from_routing_key(key: &str) -> Option<JobType> {
    JobType::ALL.into_iter().find(|jt| jt.routing_key() == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_round_trip_through_a_field_table() {
        let headers = MessageHeaders {
            job_id: JobId::new(),
            job_type: JobType::TextToText,
            job_model_id: "chat-mini".into(),
            job_remote_class: "ChatWorker".into(),
            job_remote_method: "work".into(),
            job_request_model_class: "ChatRequest".into(),
            job_response_model_class: "ChatResponse".into(),
            job_storage: "local".into(),
            job_keep_alive: 10,
        };
        let job_id = headers.job_id;
        let table = headers.into_field_table();
        let decoded = MessageHeaders::from_field_table(&table).unwrap();
        assert_eq!(decoded.job_id, job_id);
        assert_eq!(decoded.job_type, JobType::TextToText);
        assert_eq!(decoded.job_model_id, "chat-mini");
        assert_eq!(decoded.job_keep_alive, 10);
    }

    #[test]
    fn missing_header_is_reported_by_name() {
        let table = FieldTable::default();
        let err = MessageHeaders::from_field_table(&table).unwrap_err();
        assert!(matches!(err, BrokerError::MissingHeader("job_id")));
    }
}
