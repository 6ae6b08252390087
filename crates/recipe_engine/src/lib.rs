//! Recipe engine: stream ingestion, progress reporting and service IO.
mod client;
mod console;
mod event;
mod executor;
mod ingest;
mod persist;
mod progress;
mod trace;
mod types;

pub use client::{HttpRecipeService, RecipeService, ServiceSettings, StreamCall};
pub use console::{CapturedOutput, Console};
pub use event::StreamEvent;
pub use executor::{Executor, WorkdirExecutor, PARAMETERS_FILENAME};
pub use ingest::{IngestReport, LineSplitter, StreamIngestor};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use progress::{MultiProgress, ProgressBoard, ProgressSummary, Reporter, Spinner};
pub use tokio_util::sync::CancellationToken;
pub use trace::new_trace_id;
pub use types::{ExecutorError, IngestError, ServiceError};
