//! Common test utilities for integration tests.
//!
//! - `SharedBuffer`: in-memory writer usable as a tracing `MakeWriter`
//! - `stream_into`: a stream handler writing compact lines into a buffer

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use logcapture::core::{LogFormat, StreamHandler};

/// Cloneable in-memory byte sink.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.bytes.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A compact-format stream handler and the buffer it writes into.
pub fn stream_into() -> (Arc<StreamHandler>, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let sink = buffer.clone();
    let handler = StreamHandler::new(move || sink.clone(), LogFormat::Compact);
    (Arc::new(handler), buffer)
}
