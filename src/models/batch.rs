// src/models/batch.rs

//! Batch file payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One page worth of records, written as a single JSON file.
///
/// ```json
/// {
///   "success": true,
///   "total_fetched": 10,
///   "offset": 20,
///   "simple_result": true,
///   "category": "consultation_case",
///   "data": { "questions": [ ... ] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub success: bool,

    /// Number of records in `data`
    pub total_fetched: usize,

    /// Source offset (or page index) the records came from
    pub offset: usize,

    pub simple_result: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Source-side id of the category, when the site has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,

    /// Records under their site-specific key
    pub data: Map<String, Value>,
}

impl Batch {
    pub fn new(
        records_key: &str,
        records: Vec<Value>,
        offset: usize,
        simple_result: bool,
        category: Option<String>,
    ) -> Self {
        let total_fetched = records.len();
        let mut data = Map::new();
        data.insert(records_key.to_string(), Value::Array(records));
        Self {
            success: true,
            total_fetched,
            offset,
            simple_result,
            category,
            category_id: None,
            data,
        }
    }

    pub fn with_category_id(mut self, category_id: Option<String>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Records stored under `records_key`, empty if absent.
    pub fn records(&self, records_key: &str) -> &[Value] {
        self.data
            .get(records_key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
