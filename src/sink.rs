use std::io::{self, Write};

use crate::decoder::DecodedFrame;

/// Collects decoded frames: samples into an interleaved I/Q buffer, text into the log
pub struct SampleSink<W: Write> {
    samples: Vec<i32>,
    log: W,
    lines_written: usize,
}

impl<W: Write> SampleSink<W> {
    pub fn new(log: W) -> Self {
        Self {
            samples: Vec::new(),
            log,
            lines_written: 0,
        }
    }

    /// Append one packet's output and flush the log. An empty frame is a no-op append.
    pub fn accept(&mut self, frame: DecodedFrame) -> io::Result<()> {
        self.samples.reserve(frame.samples.len() * 2);
        for s in &frame.samples {
            self.samples.push(s.i);
            self.samples.push(s.q);
        }
        self.log.write_all(frame.log.as_bytes())?;
        self.log.flush()?;
        self.lines_written += frame.samples.len();
        Ok(())
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Interleaved I, Q, I, Q, ... Hand the buffer off for container encoding
    pub fn into_samples(self) -> Vec<i32> {
        self.samples
    }
}
