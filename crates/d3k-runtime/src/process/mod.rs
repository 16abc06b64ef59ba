//! Dev-server supervision: spawning, continuous output draining and
//! graceful shutdown.

mod dev_server;
mod shutdown;
mod stream;

pub use dev_server::{DevServer, DevServerSpec, ProcessError};
pub use shutdown::{DEFAULT_GRACE, shutdown_child};
pub use stream::{StreamKind, spawn_output_reader};
