//! The application callback: an opaque `bytes -> bytes` function invoked by each worker process
//! once per request. Business logic and payload serialization live entirely on the caller's side
//! of this boundary.

use std::sync::Arc;

/// A worker-side request handler. Must be `Send + Sync` since the supervisor forks after
/// constructing it; every worker process ends up with its own clone of the `Arc`.
pub type AppCallback = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

/// The default application: returns the request payload unchanged.
pub fn echo() -> AppCallback {
    Arc::new(|payload: &[u8]| payload.to_vec())
}
