//! # Output Sinks
//!
//! Subprocess output is routed to [`OutputSink`] handles supplied through
//! `RunOptions`. A sink is a cloneable, thread-safe handle around any
//! `std::io::Write`. Clones refer to the same underlying writer, which is how
//! the runner detects that stdout and stderr were pointed at one destination.
//!
//! ## Usage
//!
//! ```
//! use std::io::Write;
//! use provision_shell::output::SharedBuffer;
//!
//! let buffer = SharedBuffer::new();
//! let mut sink = buffer.sink();
//! sink.write_all(b"Terraform v1.9.0\n").unwrap();
//! assert_eq!(buffer.to_string_lossy(), "Terraform v1.9.0\n");
//! ```

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to a shared writer.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<dyn Write + Send>>,
}

impl OutputSink {
    /// Wrap a writer in a sink.
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// A sink writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// A sink writing to the process's standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// A sink that writes every byte to both `first` and `second`.
    pub fn tee(first: OutputSink, second: OutputSink) -> Self {
        Self::new(Tee { first, second })
    }

    /// Whether both handles refer to the same underlying writer.
    pub fn same_as(&self, other: &OutputSink) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, dyn Write + Send + 'static>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("output sink lock poisoned"))
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock()?.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink")
            .field("writer", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

struct Tee {
    first: OutputSink,
    second: OutputSink,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

/// In-memory buffer that can be shared between a sink and its reader.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink appending to this buffer.
    pub fn sink(&self) -> OutputSink {
        OutputSink::new(self.clone())
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.bytes
            .lock()
            .map(|bytes| bytes.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Everything written so far, decoded lossily as UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    /// Check if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.contents().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| io::Error::other("shared buffer lock poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
