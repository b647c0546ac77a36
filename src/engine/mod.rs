//! External download engine
//!
//! The agent never downloads anything itself. Each set is handed to a
//! [`DownloadEngine`], which opens one [`EngineSession`] per set per tick:
//!
//! - [`CliEngine`]: runs the external `yt-dlp` binary
//!
//! Engine output is routed through an [`EngineLogger`] so it shows up in the
//! agent's own log, indented under the phase that produced it.

mod cli;
mod logger;
mod traits;

pub use cli::{CliEngine, ENGINE_BINARY};
pub use logger::{EngineLogger, LineLevel, Stream, classify_line};
pub use traits::{DownloadEngine, EngineSession};
