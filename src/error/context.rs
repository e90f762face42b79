//! Context extension traits for attaching messages to foreign errors.

use super::{QaError, Result};

/// Attach a context message to any error convertible into a boxed error.
pub trait ResultExt<T> {
    /// Wrap the error with a static context message.
    ///
    /// # Errors
    ///
    /// Returns `QaError::WithContext` when `self` is an error.
    fn context(self, context: &str) -> Result<T>;

    /// Wrap the error with a lazily built context message.
    ///
    /// # Errors
    ///
    /// Returns `QaError::WithContext` when `self` is an error.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|source| QaError::WithContext {
            context: context.to_string(),
            source: Box::new(source),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| QaError::WithContext {
            context: f(),
            source: Box::new(source),
        })
    }
}
