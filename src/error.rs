use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// A caller-supplied value is outside the range the counter accepts.
    #[error("invalid argument `{name}` ({value}): {reason}")]
    InvalidArgument {
        name: &'static str,
        value: i64,
        reason: &'static str,
    },
}

impl Error {
    pub(crate) fn invalid_argument(name: &'static str, value: i64, reason: &'static str) -> Self {
        Error::InvalidArgument {
            name,
            value,
            reason,
        }
    }
}
