//! In-memory stream double for unit tests.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

/// Reads a fixed script, records everything written. Clones share both
/// buffers, so a test can keep a handle after moving one into the code
/// under test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStream {
    input: Arc<Mutex<Cursor<Vec<u8>>>>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedStream {
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        Self {
            input: Arc::new(Mutex::new(Cursor::new(script.into()))),
            written: Arc::default(),
        }
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }

    pub fn clear_written(&self) {
        self.written.lock().unwrap().clear();
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.lock().unwrap().read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
