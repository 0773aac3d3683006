use super::*;
use crate::validated::ServerName;

use serde_json::{Map, Value};

/// An append-only buffer of event records, in arrival order.
///
/// Records appended through [`EventStore::append`] are stamped from the
/// process clock and so arrive in time order; records appended with their
/// own timestamps may not. Queries that promise chronological output sort
/// when the store is known to be out of order.
#[derive(Debug, Clone)]
pub struct EventStore {
    events: Vec<EventRecord>,
    in_order: bool,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            in_order: true,
        }
    }

    /// Stamp and append a new event
    pub fn append(&mut self, server: Option<ServerName>, details: EventDetails) -> &EventRecord {
        self.push(EventRecord::new(server, details))
    }

    /// Append an already-built record, keeping its timestamp
    pub fn append_record(&mut self, record: EventRecord) -> &EventRecord {
        self.push(record)
    }

    /// Validate and append a record supplied as loose fields
    pub fn append_fields(
        &mut self,
        fields: Map<String, Value>,
    ) -> Result<&EventRecord, InvalidEventError> {
        let record = EventRecord::from_fields(fields)?;
        Ok(self.push(record))
    }

    fn push(&mut self, record: EventRecord) -> &EventRecord {
        if let Some(last) = self.events.last() {
            if record.time < last.time {
                self.in_order = false;
            }
        }
        self.events.push(record);
        &self.events[self.events.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over records in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.events.iter()
    }

    /// Return records by position counting back from the most recent.
    ///
    /// Index 0 is the newest record; `start` is inclusive and `end`
    /// exclusive. The selected records are returned oldest first.
    pub fn slice(&self, start: usize, end: usize) -> Vec<EventRecord> {
        let mut ret: Vec<_> = self
            .events
            .iter()
            .rev()
            .skip(start)
            .take(end.saturating_sub(start))
            .cloned()
            .collect();
        ret.reverse();
        ret
    }

    /// Return every record strictly newer than `timestamp`, oldest first.
    pub fn since(&self, timestamp: f64) -> Vec<EventRecord> {
        if self.in_order {
            let mut ret: Vec<_> = self
                .events
                .iter()
                .rev()
                .take_while(|e| e.time > timestamp)
                .cloned()
                .collect();
            ret.reverse();
            ret
        } else {
            let mut ret: Vec<_> = self
                .events
                .iter()
                .filter(|e| e.time > timestamp)
                .cloned()
                .collect();
            sort_by_time(&mut ret);
            ret
        }
    }
}

/// Stable sort of a batch of records into ascending time order
pub fn sort_by_time(events: &mut [EventRecord]) {
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
}
