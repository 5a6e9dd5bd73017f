// src/stream.rs
use std::io::{self, BufRead};
use std::mem;

/// One FASTA record: a '>' header line and its (possibly multi-line)
/// sequence, joined with whitespace stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub header: String,
    pub sequence: String,
}

/// A memory-aware batch iterator over FASTA streams.
///
/// Batches flush on an item-count or byte budget, whichever trips first,
/// so restoration never buffers an unbounded archive. A record that spans
/// a batch boundary is carried over and finished in the next batch.
pub struct FastaBatchIterator<R> {
    lines: io::Lines<R>,
    max_items: usize,
    max_bytes: usize,

    pending_header: Option<String>,
    pending_sequence: String,
    exhausted: bool,
}

impl<R: BufRead> FastaBatchIterator<R> {
    pub fn new(reader: R, max_items: usize, max_bytes: usize) -> Self {
        Self {
            lines: reader.lines(),
            max_items,
            max_bytes,
            pending_header: None,
            pending_sequence: String::new(),
            exhausted: false,
        }
    }

    fn take_pending(&mut self) -> Option<FastaRecord> {
        let header = self.pending_header.take()?;
        let sequence = mem::take(&mut self.pending_sequence);
        // headers without any sequence are dropped
        if sequence.is_empty() {
            return None;
        }
        Some(FastaRecord { header, sequence })
    }
}

impl<R: BufRead> Iterator for FastaBatchIterator<R> {
    type Item = io::Result<Vec<FastaRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let mut batch: Vec<FastaRecord> = Vec::new();
        let mut batch_bytes = 0usize;

        loop {
            if !batch.is_empty()
                && (batch.len() >= self.max_items || batch_bytes >= self.max_bytes)
            {
                return Some(Ok(batch));
            }

            match self.lines.next() {
                Some(Ok(raw)) => {
                    let line = raw.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line.starts_with('>') {
                        let next_header = line.to_string();
                        if let Some(record) = self.take_pending() {
                            batch_bytes += record.header.len() + record.sequence.len();
                            batch.push(record);
                        }
                        self.pending_header = Some(next_header);
                    } else if self.pending_header.is_some() {
                        self.pending_sequence.push_str(line);
                    }
                    // sequence data before any header is ignored
                }
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.exhausted = true;
                    if let Some(record) = self.take_pending() {
                        batch.push(record);
                    }
                    break;
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}
