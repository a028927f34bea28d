use thiserror::Error;

/// All the ways a conversion can fail. Callers match on the variant instead
/// of parsing the printed message.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("missing required field `{0}` in the input bundle")]
    MissingField(&'static str),

    #[error("field `{field}` has shape {got:?}, expected {expected}")]
    Shape {
        field: &'static str,
        expected: String,
        got: Vec<usize>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to read torch container: {0}")]
    Pickle(#[from] candle_core::Error),

    #[error("failed to write npy entry: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    #[error("failed to read npz archive: {0}")]
    NpzRead(#[from] ndarray_npy::ReadNpzError),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("entry `{0}` is not a valid npy string scalar")]
    BadStringScalar(&'static str),

    #[error("unrecognized gender label `{0}`")]
    Gender(String),
}
