use crate::errors::{RecordError, StorageError};
use crate::models::{non_negative, DailyRecord, RecordInput};
use crate::storage::{StorageBackend, RECORDS_KEY};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// In-memory daily records mirrored to local storage after every mutation.
pub struct RecordStore {
    backend: Arc<dyn StorageBackend>,
    records: Vec<DailyRecord>,
    editing: Option<String>,
}

impl RecordStore {
    pub async fn load(backend: Arc<dyn StorageBackend>, today: NaiveDate) -> Self {
        let records = match backend.read(RECORDS_KEY).await {
            Some(payload) => parse_records(&payload, today).unwrap_or_else(seed_records),
            None => {
                info!("no stored records, using seed data");
                seed_records()
            }
        };

        Self {
            backend,
            records,
            editing: None,
        }
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn editing(&self) -> Option<&DailyRecord> {
        let id = self.editing.as_deref()?;
        self.records.iter().find(|record| record.id == id)
    }

    pub fn begin_edit(&mut self, id: &str) -> Result<&DailyRecord, RecordError> {
        let record = self
            .records
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| RecordError::NotFound(id.to_string()))?;
        self.editing = Some(record.id.clone());
        Ok(record)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub async fn add(
        &mut self,
        input: RecordInput,
        today: NaiveDate,
    ) -> Result<DailyRecord, RecordError> {
        let date = resolve_date(input.date.as_deref(), today);
        let record = input.into_record(new_record_id(), date);

        let mut next = self.records.clone();
        next.push(record.clone());
        self.commit(next).await?;

        info!(id = %record.id, date = %record.date, "record added");
        Ok(record)
    }

    pub async fn edit(
        &mut self,
        id: &str,
        input: RecordInput,
        today: NaiveDate,
    ) -> Result<DailyRecord, RecordError> {
        let index = self.position(id)?;
        let date = resolve_date(input.date.as_deref(), today);
        let record = input.into_record(id.to_string(), date);

        let mut next = self.records.clone();
        next[index] = record.clone();
        self.commit(next).await?;

        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        Ok(record)
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), RecordError> {
        let index = self.position(id)?;

        let mut next = self.records.clone();
        next.remove(index);
        self.commit(next).await?;

        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        Ok(())
    }

    /// Drops the persisted collection and starts over from the seed data.
    pub async fn reset(&mut self) -> Result<(), StorageError> {
        self.backend.remove(RECORDS_KEY).await?;
        self.records = seed_records();
        self.editing = None;
        Ok(())
    }

    fn position(&self, id: &str) -> Result<usize, RecordError> {
        self.records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| RecordError::NotFound(id.to_string()))
    }

    async fn commit(&mut self, next: Vec<DailyRecord>) -> Result<(), StorageError> {
        let payload = serde_json::to_string(&next)?;
        if let Err(err) = self.backend.write(RECORDS_KEY, &payload).await {
            warn!("failed to persist records: {err}");
            return Err(err);
        }
        self.records = next;
        Ok(())
    }
}

fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

fn resolve_date(date: Option<&str>, today: NaiveDate) -> String {
    match date.map(str::trim) {
        Some(date) if !date.is_empty() => date.to_string(),
        _ => today.to_string(),
    }
}

fn parse_records(payload: &str, today: NaiveDate) -> Option<Vec<DailyRecord>> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => {
            error!("failed to parse stored records: {err}");
            return None;
        }
    };

    let Value::Array(items) = value else {
        warn!("stored records are not an array, using seed data");
        return None;
    };

    let records = items
        .iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(sanitize_record(fields, today)),
            other => {
                warn!("skipping malformed stored record: {other}");
                None
            }
        })
        .collect();
    Some(records)
}

fn sanitize_record(fields: &Map<String, Value>, today: NaiveDate) -> DailyRecord {
    let count = |name: &str| coerce_number(fields.get(name)).trunc() as u64;
    let money = |name: &str| coerce_number(fields.get(name));

    let id = match fields.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => new_record_id(),
    };
    let date = match fields.get("date") {
        Some(Value::String(date)) if !date.trim().is_empty() => date.trim().to_string(),
        _ => today.to_string(),
    };

    DailyRecord {
        id,
        date,
        leads: count("leads"),
        contacts: count("contacts"),
        scheduled: count("scheduled"),
        attended: count("attended"),
        demos: count("demos"),
        proposals: count("proposals"),
        approvals: count("approvals"),
        sales: count("sales"),
        revenue: money("revenue"),
        investment: money("investment"),
    }
}

/// Numbers and numeric strings pass through; anything else becomes 0.
fn coerce_number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.map(non_negative).unwrap_or(0.0)
}

pub fn seed_records() -> Vec<DailyRecord> {
    let seed = |id: &str,
                date: &str,
                counts: [u64; 8],
                revenue: f64,
                investment: f64| DailyRecord {
        id: id.to_string(),
        date: date.to_string(),
        leads: counts[0],
        contacts: counts[1],
        scheduled: counts[2],
        attended: counts[3],
        demos: counts[4],
        proposals: counts[5],
        approvals: counts[6],
        sales: counts[7],
        revenue,
        investment,
    };

    vec![
        seed("seed-1", "2025-01-06", [45, 38, 20, 15, 12, 8, 4, 2], 9_800.0, 1_500.0),
        seed("seed-2", "2025-01-13", [52, 44, 24, 18, 14, 9, 5, 3], 14_250.0, 1_650.0),
        seed("seed-3", "2025-02-03", [60, 51, 27, 21, 16, 11, 6, 4], 19_900.0, 1_800.0),
        seed("seed-4", "2025-02-17", [48, 40, 22, 16, 13, 7, 4, 2], 10_400.0, 1_550.0),
        seed("seed-5", "2025-03-03", [57, 47, 26, 20, 15, 10, 6, 3], 15_300.0, 1_700.0),
        seed("seed-6", "2025-03-24", [63, 55, 30, 24, 18, 12, 7, 5], 24_600.0, 1_900.0),
    ]
}
