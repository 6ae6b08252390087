//! Live progress rendering while the main path blocks on a stream.
//!
//! Two variants share one contract: [`Spinner`] animates beside a single
//! message, [`MultiProgress`] tracks a set of in-flight labels fed through a
//! *started* queue and a *completed* queue. Both render on a dedicated thread,
//! redraw at a fixed cadence, stop on an explicit signal and leave the
//! terminal clean. `stop()` is idempotent and never fails.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::{cursor, queue, style::Print, terminal};
use recipe_logging::recipe_warn;
use tokio_util::sync::CancellationToken;

use crate::Console;

const TICK: Duration = Duration::from_millis(80);
const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Display state of the multi-item reporter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressBoard {
    in_progress: Vec<String>,
    done: Vec<String>,
}

impl ProgressBoard {
    /// Adds a label to the in-progress list unless it is already shown or done.
    pub fn begin(&mut self, label: String) {
        if self.done.contains(&label) || self.in_progress.contains(&label) {
            return;
        }
        self.in_progress.push(label);
    }

    /// Moves a label to the done tally. A label never seen as started is
    /// tallied as done so a late start notification does not resurrect it.
    pub fn complete(&mut self, label: String) {
        self.in_progress.retain(|existing| *existing != label);
        if !self.done.contains(&label) {
            self.done.push(label);
        }
    }

    pub fn in_progress(&self) -> &[String] {
        &self.in_progress
    }

    pub fn done(&self) -> &[String] {
        &self.done
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            done: self.done.clone(),
            outstanding: self.in_progress.clone(),
        }
    }

    fn render_lines(&self, title: &str, frame: &str) -> Vec<String> {
        let total = self.done.len() + self.in_progress.len();
        let mut lines = Vec::with_capacity(self.in_progress.len() + 1);
        lines.push(format!("{frame} {title} ({}/{total})", self.done.len()));
        lines.extend(self.in_progress.iter().map(|label| format!("  {frame} {label}")));
        lines
    }
}

/// What the multi-item reporter had seen when it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSummary {
    pub done: Vec<String>,
    /// Labels still in progress at stop time; dropped from display, not errors.
    pub outstanding: Vec<String>,
}

/// Single-message spinner.
pub struct Spinner {
    stop: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Starts spinning beside `message`. Cancelling `parent` stops it too.
    pub fn start(console: Console, message: impl Into<String>, parent: &CancellationToken) -> Self {
        let stop = parent.child_token();
        let token = stop.clone();
        let message = message.into();
        let handle = thread::Builder::new()
            .name("recipe-spinner".into())
            .spawn(move || spin(&console, &message, &token))
            .map_err(|err| recipe_warn!("spinner thread failed to start: {}", err))
            .ok();
        Self { stop, handle }
    }

    pub fn stop(&mut self) {
        self.stop.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spin(console: &Console, message: &str, token: &CancellationToken) {
    let mut frame = 0usize;
    let mut buf = Vec::new();
    while !token.is_cancelled() {
        buf.clear();
        let _ = queue!(
            buf,
            cursor::Hide,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            Print(format!("{} {}", FRAMES[frame % FRAMES.len()], message)),
        );
        let _ = console.write_bytes(&buf);
        frame += 1;
        thread::sleep(TICK);
    }
    buf.clear();
    let _ = queue!(
        buf,
        cursor::MoveToColumn(0),
        terminal::Clear(terminal::ClearType::CurrentLine),
        cursor::Show,
    );
    let _ = console.write_bytes(&buf);
}

/// Multi-item reporter fed by the started/completed queues.
pub struct MultiProgress {
    started: Sender<String>,
    completed: Sender<String>,
    stop: CancellationToken,
    handle: Option<JoinHandle<ProgressSummary>>,
}

impl MultiProgress {
    /// Starts rendering `title` with `labels` already pushed as started.
    pub fn start(
        console: Console,
        title: impl Into<String>,
        labels: impl IntoIterator<Item = String>,
        parent: &CancellationToken,
    ) -> Self {
        let (started, started_rx) = mpsc::channel();
        let (completed, completed_rx) = mpsc::channel();
        for label in labels {
            let _ = started.send(label);
        }
        let stop = parent.child_token();
        let token = stop.clone();
        let title = title.into();
        let handle = thread::Builder::new()
            .name("recipe-progress".into())
            .spawn(move || render_items(&console, &title, &started_rx, &completed_rx, &token))
            .map_err(|err| recipe_warn!("progress thread failed to start: {}", err))
            .ok();
        Self {
            started,
            completed,
            stop,
            handle,
        }
    }

    /// Announces a label discovered after start.
    pub fn begin(&self, label: impl Into<String>) {
        let _ = self.started.send(label.into());
    }

    pub fn complete(&self, label: impl Into<String>) {
        let _ = self.completed.send(label.into());
    }

    /// Stops the renderer and returns its final tally; `None` once already stopped.
    pub fn stop(&mut self) -> Option<ProgressSummary> {
        self.stop.cancel();
        self.handle.take().and_then(|handle| handle.join().ok())
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for MultiProgress {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn render_items(
    console: &Console,
    title: &str,
    started: &Receiver<String>,
    completed: &Receiver<String>,
    token: &CancellationToken,
) -> ProgressSummary {
    let mut board = ProgressBoard::default();
    let mut drawn = 0u16;
    let mut frame = 0usize;
    let mut last_draw: Option<Instant> = None;

    while !token.is_cancelled() {
        match started.recv_timeout(TICK) {
            Ok(label) => board.begin(label),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => thread::sleep(TICK),
        }
        drain(&mut board, started, completed);

        if last_draw.is_none_or(|at| at.elapsed() >= TICK) {
            let lines = board.render_lines(title, FRAMES[frame % FRAMES.len()]);
            drawn = redraw(console, drawn, &lines);
            frame += 1;
            last_draw = Some(Instant::now());
        }
    }

    drain(&mut board, started, completed);
    clear_region(console, drawn);
    board.summary()
}

fn drain(board: &mut ProgressBoard, started: &Receiver<String>, completed: &Receiver<String>) {
    while let Ok(label) = started.try_recv() {
        board.begin(label);
    }
    while let Ok(label) = completed.try_recv() {
        board.complete(label);
    }
}

/// Replaces the previously drawn region with `lines`; returns the new height.
fn redraw(console: &Console, drawn: u16, lines: &[String]) -> u16 {
    let mut buf = Vec::new();
    let _ = queue!(buf, cursor::Hide);
    rewind(&mut buf, drawn);
    let _ = queue!(buf, Print(lines.join("\r\n")));
    let _ = console.write_bytes(&buf);
    u16::try_from(lines.len()).unwrap_or(u16::MAX)
}

fn clear_region(console: &Console, drawn: u16) {
    let mut buf = Vec::new();
    rewind(&mut buf, drawn);
    let _ = queue!(buf, cursor::Show);
    let _ = console.write_bytes(&buf);
}

fn rewind(buf: &mut Vec<u8>, drawn: u16) {
    let _ = queue!(buf, cursor::MoveToColumn(0));
    if drawn > 1 {
        let _ = queue!(buf, cursor::MoveUp(drawn - 1));
    }
    let _ = queue!(buf, terminal::Clear(terminal::ClearType::FromCursorDown));
}

/// The reporter currently owned by a streaming call.
#[derive(Default)]
pub enum Reporter {
    #[default]
    Idle,
    Spinner(Spinner),
    Items(MultiProgress),
}

impl Reporter {
    pub fn is_active(&self) -> bool {
        !matches!(self, Reporter::Idle)
    }

    /// Marks `label` complete when a multi-item reporter is active.
    pub fn complete(&self, label: &str) {
        if let Reporter::Items(items) = self {
            items.complete(label);
        }
    }

    /// Stops whatever is running and leaves `Idle` behind.
    pub fn stop(&mut self) -> Option<ProgressSummary> {
        match std::mem::take(self) {
            Reporter::Idle => None,
            Reporter::Spinner(mut spinner) => {
                spinner.stop();
                None
            }
            Reporter::Items(mut items) => items.stop(),
        }
    }
}
