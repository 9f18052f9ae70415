//! The file system processes open, read and write through.
//!
//! The kernel only sees the [`FileSystem`] and [`OpenFile`] traits. Backends:
//! an in-memory tree for tests and demos, a host directory for the runner,
//! and the console streams behind descriptors 0 and 1.

use std::fmt;
use std::io;

pub mod console;
pub mod host;
pub mod mem;

pub use console::{Console, OutputBuffer};
pub use host::HostFileSystem;
pub use mem::MemFileSystem;

/// A handle on an open file. Each handle keeps its own position.
pub trait OpenFile: Send + fmt::Debug {
    fn name(&self) -> &str;

    /// Reads from the current position. `Ok(0)` means end of file.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes at the current position and advances it.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Releases backend resources. Dropping the handle closes it too.
    fn close(&mut self) {}
}

pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Opens `name`. With `create` a missing file is created empty; an
    /// existing file is opened as-is and never truncated.
    fn open(&self, name: &str, create: bool) -> Option<Box<dyn OpenFile>>;

    /// Deletes `name`. Handles that are already open keep working.
    fn remove(&self, name: &str) -> bool;
}

/// Names must be a single path component.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
