use serde::{Deserialize, Serialize};

/// What a delete removed. Cascading deletes report the dependent rows they
/// took with them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub id: i64,
    pub training_tasks: usize,
    pub completions: usize,
}

impl DeleteSummary {
    pub fn new(id: i64) -> Self {
        Self { id, ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertTableRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertTableResponse {
    pub markdown: String,
    /// False when no table structure was found and the text came back as is
    pub converted: bool,
}
