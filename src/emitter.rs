//! Tag sinks.

use std::io::{self, Write};

use crate::tag::TagRecord;

/// Receives tags as a scan produces them.
pub trait TagEmitter {
    fn emit(&mut self, tag: TagRecord);
}

/// Collects tags in memory.
#[derive(Debug, Default)]
pub struct VecEmitter {
    tags: Vec<TagRecord>,
}

impl VecEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags(&self) -> &[TagRecord] {
        &self.tags
    }

    pub fn into_tags(self) -> Vec<TagRecord> {
        self.tags
    }
}

impl TagEmitter for VecEmitter {
    fn emit(&mut self, tag: TagRecord) {
        self.tags.push(tag);
    }
}

/// Writes one JSON object per line. The first write error is kept and
/// reported by [`finish`](Self::finish); later tags are dropped.
pub struct JsonLinesEmitter<W: Write> {
    writer: W,
    written: usize,
    error: Option<io::Error>,
}

impl<W: Write> JsonLinesEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            error: None,
        }
    }

    /// Flushes and returns the number of tags written.
    pub fn finish(mut self) -> io::Result<usize> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(self.written)
    }

    fn write_tag(&mut self, tag: &TagRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, tag)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> TagEmitter for JsonLinesEmitter<W> {
    fn emit(&mut self, tag: TagRecord) {
        if self.error.is_some() {
            return;
        }
        match self.write_tag(&tag) {
            Ok(()) => self.written += 1,
            Err(e) => self.error = Some(e),
        }
    }
}
