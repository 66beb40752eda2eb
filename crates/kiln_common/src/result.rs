//! Result type for operations that can only fail through a bug.

/// Result of an operation whose failure means kiln itself is broken, such
/// as a write order naming a block that was already deleted. Problems with an
/// asset file never travel this way; they become diagnostics.
pub type KilnResult<T> = Result<T, InternalError>;

/// A broken internal invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// What was found to be inconsistent.
    pub message: String,
}

impl InternalError {
    /// An error describing the broken invariant.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(slots: &[Option<u32>], index: usize) -> KilnResult<u32> {
        slots
            .get(index)
            .copied()
            .flatten()
            .ok_or_else(|| InternalError::new(format!("slot {index} is empty")))
    }

    #[test]
    fn question_mark_carries_the_message() {
        let slots = [Some(4), None];
        assert_eq!(lookup(&slots, 0), Ok(4));
        let err = lookup(&slots, 1).unwrap_err();
        assert_eq!(err.to_string(), "internal error: slot 1 is empty");
    }
}
