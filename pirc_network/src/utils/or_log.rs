use std::fmt::{Debug, Display};

/// Log the error side of a result that is otherwise being discarded
pub trait OrLog {
    fn or_log(&self, context: impl Display);
}

impl<T, E: Debug> OrLog for Result<T, E> {
    fn or_log(&self, context: impl Display) {
        if let Err(error) = self {
            tracing::error!(?error, "Failed {}", context);
        }
    }
}
