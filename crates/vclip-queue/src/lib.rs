//! In-memory job registry and bounded hand-off queue.
//!
//! Jobs live in a plain `HashMap` behind a mutex; handing a job to a worker is a
//! non-blocking `try_send` on a bounded channel so callers get `QueueFull`
//! synchronously instead of blocking when every worker is busy.

pub mod error;
pub mod registry;

pub use error::{QueueError, QueueResult};
pub use registry::JobRegistry;
