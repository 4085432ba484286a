use burn::tensor::DType;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0} should be {1}")]
    InvalidConfiguration(String, String),

    #[error("Invalid checkpoint: {0} should be {1}")]
    InvalidCheckpoint(String, String),

    #[error("Duplicated parameter name: {0:?}")]
    DuplicateParameter(String),

    #[error("Missing parameter: {0:?} is not in the checkpoint")]
    MissingParameter(String),

    #[error(
        "Mismatched shape for {name:?}: \
        the checkpoint holds {found:?} but the model expects {expected:?}"
    )]
    MismatchedShape {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error(
        "Mismatched data type for {name:?}: \
        the checkpoint holds {found:?} but the model expects {expected:?}"
    )]
    MismatchedDType {
        name: String,
        expected: DType,
        found: DType,
    },
}
