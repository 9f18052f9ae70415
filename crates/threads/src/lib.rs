//! Kernel threads and the monitor primitives the process layer blocks on.

pub mod kthread;
pub mod sync;

pub use kthread::KThread;
pub use sync::{Condition, Lock, LockGuard};
