//! The per-chunk streaming pipeline: normalize, merge, translate, project.

pub mod live;
pub mod merge;
pub mod process;
pub mod segment;
pub mod translate;

pub use live::{project_live, LiveBundle};
pub use process::{ChunkParams, ChunkResponse, Engines};
pub use segment::Segment;
