use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use threads::Lock;

use crate::OpenFile;

type Input = Arc<Lock<Box<dyn Read + Send>>>;
type Output = Arc<Lock<Box<dyn Write + Send>>>;

/// The machine's console: one input stream and one output stream shared
/// by every process.
#[derive(Clone)]
pub struct Console {
    input: Input,
    output: Output,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Console {
    pub fn new(input: Box<dyn Read + Send>, output: Box<dyn Write + Send>) -> Self {
        Self {
            input: Arc::new(Lock::new(input)),
            output: Arc::new(Lock::new(output)),
        }
    }

    /// Console wired to the host's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdin()), Box::new(io::stdout()))
    }

    /// Console fed from `input` whose output is captured in memory.
    pub fn capture(input: impl Into<Vec<u8>>) -> (Self, OutputBuffer) {
        let buffer = OutputBuffer::default();
        let console = Self::new(
            Box::new(io::Cursor::new(input.into())),
            Box::new(buffer.clone()),
        );
        (console, buffer)
    }

    /// Handle for descriptor 0.
    pub fn reader(&self) -> Box<dyn OpenFile> {
        Box::new(ConsoleReader {
            input: Arc::clone(&self.input),
        })
    }

    /// Handle for descriptor 1.
    pub fn writer(&self) -> Box<dyn OpenFile> {
        Box::new(ConsoleWriter {
            output: Arc::clone(&self.output),
        })
    }
}

/// Shared byte sink that records everything written to it.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    bytes: Arc<Lock<Vec<u8>>>,
}

impl OutputBuffer {
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.acquire().clone()
    }

    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.bytes.acquire()).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.acquire().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ConsoleReader {
    input: Input,
}

impl fmt::Debug for ConsoleReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConsoleReader")
    }
}

impl OpenFile for ConsoleReader {
    fn name(&self) -> &str {
        "stdin"
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.acquire().read(buf)
    }

    fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "console input is read-only"))
    }
}

struct ConsoleWriter {
    output: Output,
}

impl fmt::Debug for ConsoleWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConsoleWriter")
    }
}

impl OpenFile for ConsoleWriter {
    fn name(&self) -> &str {
        "stdout"
    }

    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "console output is write-only"))
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut output = self.output.acquire();
        output.write_all(data)?;
        output.flush()?;
        Ok(data.len())
    }
}
