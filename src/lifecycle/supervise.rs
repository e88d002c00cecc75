//! Failure isolation for independently scheduled work
//!
//! Panics inside handlers and spawned tasks are turned into logged
//! messages so a single failure never takes the daemon down.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tokio::task::JoinError;

/// Run `f`, converting a panic into its message
pub fn catch_panic<F, T>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Describe why a spawned task did not complete
pub fn join_error_message(err: JoinError) -> String {
    if err.is_panic() {
        panic_message(err.into_panic())
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catch_panic_passes_value_through() {
        assert_eq!(catch_panic(|| 7), Ok(7));
    }

    #[test]
    fn test_catch_panic_with_str_payload() {
        let result: Result<(), String> = catch_panic(|| panic!("boom"));
        assert_eq!(result, Err("boom".to_string()));
    }

    #[test]
    fn test_catch_panic_with_formatted_payload() {
        let attempt = 3;
        let result: Result<(), String> = catch_panic(|| panic!("attempt {attempt} failed"));
        assert_eq!(result, Err("attempt 3 failed".to_string()));
    }

    #[tokio::test]
    async fn test_join_error_message_for_panicked_task() {
        let handle = tokio::spawn(async { panic!("listener crashed") });
        let err = handle.await.unwrap_err();
        assert_eq!(join_error_message(err), "listener crashed");
    }
}
