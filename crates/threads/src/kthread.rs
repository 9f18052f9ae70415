use std::io;
use std::thread::{self, JoinHandle};

/// A kernel thread. Each user process runs on exactly one.
#[derive(Debug)]
pub struct KThread {
    name: String,
    handle: JoinHandle<()>,
}

impl KThread {
    /// Starts `body` on a new thread. Fails only when the host cannot
    /// create another thread.
    pub fn fork<F>(name: impl Into<String>, body: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let handle = thread::Builder::new().name(name.clone()).spawn(body)?;
        tracing::trace!(target: "threads", thread = %name, "forked");
        Ok(Self { name, handle })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the thread to finish. Returns `false` if it panicked.
    pub fn join(self) -> bool {
        match self.handle.join() {
            Ok(()) => true,
            Err(_) => {
                tracing::error!(target: "threads", thread = %self.name, "thread panicked");
                false
            }
        }
    }
}
