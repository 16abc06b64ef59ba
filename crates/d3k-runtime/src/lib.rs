//! Runtime side of d3k: everything that touches files and processes.
//!
//! * [`writer`]: the single-writer task that appends unified log lines
//! * [`store`]: the active file, the pointer symlink and rotation
//! * [`query`] and [`tail`]: head/tail/list/error reads and the live tail
//! * [`sessions`]: the on-disk session registry and log path resolution
//! * [`process`]: the supervised dev-server child

#![deny(unsafe_code)]

pub mod identity;
pub mod process;
pub mod query;
pub mod sessions;
pub mod store;
pub mod tail;
pub mod writer;

// Re-export the pipeline entry points
pub use process::{DevServer, DevServerSpec, ProcessError, StreamKind};
pub use writer::{LogWriter, LogWriterHandle, WriterError};

// Re-export store and rotation types
pub use store::{LogStore, LogStoreError, RotationError, RotationOutcome, RotationPolicy, RotationStep};

// Re-export read-side types
pub use query::{ErrorMatch, ErrorQuery, LogQuery, QueryError};
pub use tail::{TailConfig, TailFrame, TailStream};

// Re-export session registry types
pub use sessions::{LogOrigin, ResolvedLog, SessionLookupError, SessionRegistry};
