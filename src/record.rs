// src/record.rs
//
// The flat output model the extractor feeds and the CSV writer drains.
// Column membership is open: every record registers the field names it
// carries, and the set keeps them in first-seen order across the run.

use chrono::NaiveDate;

/// A single typed cell of the output table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i32),
    Date(NaiveDate),
    Amount(f64),
}

impl Value {
    /// CSV rendering: dates ISO, amounts via float display.
    pub fn render(&self) -> String {
        match self {
            Value::Text(text) => text.clone(),
            Value::Int(number) => number.to_string(),
            Value::Date(date) => date.format("%Y-%m-%d").to_string(),
            Value::Amount(amount) => amount.to_string(),
        }
    }
}

/// One output row: named fields in insertion order. A field held with a
/// `None` value still registers its column in the output table.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Vec<(String, Option<Value>)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.fields.push((name.into(), value));
    }

    /// The populated value under `name`, if any. Absent fields and explicit
    /// nulls both come back as `None`.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }
}

/// The run's single accumulating table: column names in first-seen order
/// plus every record, in extraction order.
#[derive(Debug, Default)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        for (name, _) in record.fields() {
            if !self.columns.iter().any(|column| column == name) {
                self.columns.push(name.to_string());
            }
        }
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.push(record);
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
