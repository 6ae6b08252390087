use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared handle on the terminal output stream.
///
/// The main path and the progress renderers all write through one `Console`.
/// The main path still stops the active renderer before printing; the lock
/// only keeps individual writes from interleaving.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Console writing into an in-memory buffer.
    pub fn capture() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        (Self::new(captured.clone()), captured)
    }

    /// Writes raw bytes and flushes.
    pub fn write_bytes(&self, bytes: &[u8]) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(bytes)?;
        out.flush()
    }

    /// Prints one line; output errors are ignored.
    pub fn line(&self, text: impl AsRef<str>) {
        let mut line = String::with_capacity(text.as_ref().len() + 1);
        line.push_str(text.as_ref());
        line.push('\n');
        let _ = self.write_bytes(line.as_bytes());
    }

    pub fn blank(&self) {
        let _ = self.write_bytes(b"\n");
    }
}

/// Clonable in-memory sink used by [`Console::capture`].
#[derive(Clone, Default)]
pub struct CapturedOutput {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Plain-text lines. Terminal control sequences are stripped and end the
    /// current line, so redrawn spinner frames come out as separate lines.
    pub fn text_lines(&self) -> Vec<String> {
        strip_ansi(&self.contents(), Some('\r'))
            .split(['\n', '\r'])
            .filter(|line| !line.trim().is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn strip_ansi(text: &str, boundary: Option<char>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            // CSI: parameters and intermediates, then one final byte in '@'..='~'.
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
            out.extend(boundary);
        } else {
            out.push(c);
        }
    }
    out
}
