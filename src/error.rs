use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Schema error in row {row}, column '{column}': {reason}")]
    Schema {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("No records to analyze{}", channel_suffix(.channel))]
    EmptyDataset { channel: Option<String> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn channel_suffix(channel: &Option<String>) -> String {
    match channel {
        Some(name) => format!(" for channel '{name}'"),
        None => String::new(),
    }
}

impl MetricsError {
    pub fn schema(row: usize, column: &str, reason: impl Into<String>) -> Self {
        MetricsError::Schema {
            row,
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_row_and_column() {
        let err = MetricsError::schema(4, "clicks", "missing value");
        assert_eq!(
            err.to_string(),
            "Schema error in row 4, column 'clicks': missing value"
        );
    }

    #[test]
    fn empty_dataset_mentions_channel_filter() {
        let err = MetricsError::EmptyDataset {
            channel: Some("Radio".to_string()),
        };
        assert_eq!(err.to_string(), "No records to analyze for channel 'Radio'");

        let err = MetricsError::EmptyDataset { channel: None };
        assert_eq!(err.to_string(), "No records to analyze");
    }
}
