use thiserror::Error;

/// Coarse classification of a [MitoQcError], used by callers that only care
/// whether a run failed on bad input, on missing input, or on I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    EmptyInput,
    Io,
}

#[derive(Error, Debug)]
pub enum MitoQcError {
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error(
        "Interval for target {target} is too small: trimmed bounds [{min_pos}, {max_pos}] are empty"
    )]
    IntervalTooSmall {
        target: String,
        min_pos: i64,
        max_pos: i64,
    },

    #[error("Invalid target label: {0}")]
    InvalidLabel(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("No mean coverage available for sample {0}")]
    MissingMeanCoverage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Error parsing record: {0}")]
    Parse(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Empty null population: {0}")]
    EmptyNullPopulation(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MitoQcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MitoQcError::EmptyInput(_) | MitoQcError::EmptyNullPopulation(_) => {
                ErrorKind::EmptyInput
            }
            MitoQcError::Checkpoint(_) | MitoQcError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, MitoQcError>;

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    #[rstest]
    #[case(MitoQcError::SchemaMismatch("x".into()), ErrorKind::Validation)]
    #[case(MitoQcError::IntervalTooSmall { target: "T".into(), min_pos: 10, max_pos: 5 }, ErrorKind::Validation)]
    #[case(MitoQcError::EmptyInput("x".into()), ErrorKind::EmptyInput)]
    #[case(MitoQcError::EmptyNullPopulation("x".into()), ErrorKind::EmptyInput)]
    #[case(MitoQcError::Checkpoint("x".into()), ErrorKind::Io)]
    fn test_error_kind(#[case] err: MitoQcError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }

    #[rstest]
    fn test_interval_message_names_target() {
        let err = MitoQcError::IntervalTooSmall {
            target: "numt_3".to_string(),
            min_pos: 145,
            max_pos: 100,
        };
        assert!(err.to_string().contains("numt_3"));
    }
}
