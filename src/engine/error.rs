use ulid::Ulid;

use crate::model::Ms;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    NotFound(Ulid),
    InvalidSpan { start: Ms, end: Ms },
    LimitExceeded(&'static str),
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::NotFound(id) => write!(f, "busy time not found: {id}"),
            LayoutError::InvalidSpan { start, end } => {
                write!(f, "invalid span [{start}, {end}): end is before start")
            }
            LayoutError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for LayoutError {}
