use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required column is absent from the input table.
    #[error("schema error: required column '{column}' is missing (accepted labels: {accepted})")]
    Schema {
        column: &'static str,
        accepted: String,
    },

    #[error("data error: row {row}, field '{field}', value {value:?}: {reason}")]
    Data {
        row: usize,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    /// Short label for callers that report failures by category.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Schema { .. } => "schema",
            PipelineError::Data { .. } => "data",
            PipelineError::Csv(_) => "csv",
        }
    }

    /// The canonical field name this error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            PipelineError::Schema { column, .. } => Some(*column),
            PipelineError::Data { field, .. } => Some(*field),
            PipelineError::Csv(_) => None,
        }
    }

    pub(crate) fn data(
        row: usize,
        field: &'static str,
        value: &str,
        reason: impl Into<String>,
    ) -> Self {
        PipelineError::Data {
            row,
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
