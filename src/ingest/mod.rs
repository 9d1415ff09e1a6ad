//! Frame sources and the servers that feed detector workers.
//!
//! This module provides:
//! - `FrameSource`: anything that can grab a frame on demand
//! - Built-in sources: synthetic (`stub`), local image file (`file`),
//!   HTTP JPEG snapshot (`http_snapshot`)
//! - `SourceRegistry`: input type tag → constructor, built once at startup
//! - Frame servers: one thread per camera answering fetch requests from every
//!   detector bound to that camera
//!
//! Sources MUST NOT log frame content.

use anyhow::Result;

use crate::frame::Frame;

pub mod file;
mod registry;
pub mod server;
pub mod snapshot;
pub mod stub;

pub use file::FileSource;
pub use registry::{SourceConstructor, SourceRegistry};
pub use server::{spawn_frame_server, FrameServerHandle};
pub use snapshot::HttpSnapshotSource;
pub use stub::StubSource;

pub trait FrameSource: Send {
    /// Camera name, for logging.
    fn name(&self) -> &str;

    /// Grabs the latest frame. `Ok(None)` when the device produced nothing this time.
    fn grab(&mut self) -> Result<Option<Frame>>;
}
