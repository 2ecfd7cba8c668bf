//! Run allocators: the chunked arena, the global baseline, and the trait they share.

pub mod allocator;
pub mod arena;
mod chunk;
pub mod config;
pub mod error;
pub mod global;
pub mod occupancy;

pub use allocator::RunAlloc;
pub use arena::ChunkArena;
pub use config::{ArenaConfig, ArenaStats, TeardownPolicy};
pub use error::{ArenaError, ConstructError};
pub use global::GlobalRunAlloc;
pub use occupancy::OccupancyMap;
