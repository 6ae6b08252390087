use std::io::BufRead;

use bytes::BytesMut;
use recipe_core::Recipe;
use recipe_logging::recipe_debug;
use tokio_util::sync::CancellationToken;

use crate::progress::{MultiProgress, ProgressSummary, Reporter, Spinner};
use crate::{Console, IngestError, StreamEvent};

const FILES_TITLE: &str = "generating execution";

/// Totals for one streaming call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Non-blank lines turned into events, unknown ones included.
    pub dispatched: usize,
    pub unknown: usize,
    /// Final tally of the last multi-item reporter, if one ran.
    pub progress: Option<ProgressSummary>,
}

/// Folds the events of one streaming call into a [`Recipe`].
///
/// Owns the call's progress reporter and stops it before anything is printed
/// and again when the ingestor finishes or is dropped. Mutations are never
/// rolled back: a decode failure leaves earlier events applied.
pub struct StreamIngestor<'a> {
    recipe: &'a mut Recipe,
    console: Console,
    cancel: CancellationToken,
    reporter: Reporter,
    banner: Option<String>,
    outline_started: bool,
    report: IngestReport,
}

impl<'a> StreamIngestor<'a> {
    pub fn new(recipe: &'a mut Recipe, console: Console, cancel: &CancellationToken) -> Self {
        Self {
            recipe,
            console,
            cancel: cancel.clone(),
            reporter: Reporter::Idle,
            banner: None,
            outline_started: false,
            report: IngestReport::default(),
        }
    }

    /// Shows a spinner with `message` until the first meaningful event.
    pub fn with_spinner(mut self, message: impl Into<String>) -> Self {
        self.reporter.stop();
        self.reporter = Reporter::Spinner(Spinner::start(
            self.console.clone(),
            message,
            &self.cancel,
        ));
        self
    }

    /// Line printed once before the first streamed step.
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    /// Decodes and applies one line. Blank lines are skipped; nothing is
    /// applied once the call is cancelled.
    pub fn feed_line(&mut self, line: &str) -> Result<(), IngestError> {
        if self.cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let event = StreamEvent::decode(line)?;
        self.apply(event);
        Ok(())
    }

    pub fn apply(&mut self, event: StreamEvent) {
        self.report.dispatched += 1;
        recipe_debug!("stream event: {}", event.kind());
        match event {
            StreamEvent::Id(id) => self.recipe.set_id(id),
            StreamEvent::Step(step) => {
                self.stop_reporter();
                if !self.outline_started {
                    self.outline_started = true;
                    if let Some(banner) = &self.banner {
                        self.console.line(banner);
                    }
                }
                let line = format!("{}. {}", self.recipe.steps.len() + 1, step);
                self.recipe.push_step(step);
                self.console.line(line);
            }
            StreamEvent::Files(labels) => {
                self.stop_reporter();
                self.reporter = Reporter::Items(MultiProgress::start(
                    self.console.clone(),
                    FILES_TITLE,
                    labels,
                    &self.cancel,
                ));
            }
            StreamEvent::Execution(unit) => {
                if let Some(key) = unit.key() {
                    self.reporter.complete(key);
                }
                self.recipe.push_execution(unit);
            }
            StreamEvent::Parameter(parameter) => self.recipe.push_parameter(parameter),
            StreamEvent::Unknown(value) => {
                self.report.unknown += 1;
                recipe_debug!("unknown json object in stream: {}", value);
            }
        }
    }

    /// Reads every line of `reader` in order, then finishes.
    pub fn ingest_reader<R: BufRead>(mut self, reader: R) -> Result<IngestReport, IngestError> {
        for line in reader.lines() {
            self.feed_line(&line?)?;
        }
        Ok(self.finish())
    }

    /// Stops the reporter and returns the call's totals.
    pub fn finish(mut self) -> IngestReport {
        self.stop_reporter();
        std::mem::take(&mut self.report)
    }

    fn stop_reporter(&mut self) {
        if let Some(summary) = self.reporter.stop() {
            self.report.progress = Some(summary);
        }
    }
}

impl Drop for StreamIngestor<'_> {
    fn drop(&mut self) {
        self.reporter.stop();
    }
}

/// Splits an incrementally arriving byte stream into lines.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: BytesMut,
}

impl LineSplitter {
    /// Appends `chunk` and returns every line it completed, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, IngestError> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            lines.push(decode_line(&line[..pos])?);
        }
        Ok(lines)
    }

    /// Remaining bytes after the stream ended without a final newline.
    pub fn finish(&mut self) -> Result<Option<String>, IngestError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let rest = self.buf.split();
        decode_line(&rest).map(Some)
    }
}

fn decode_line(bytes: &[u8]) -> Result<String, IngestError> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    Ok(String::from_utf8(bytes.to_vec())?)
}
