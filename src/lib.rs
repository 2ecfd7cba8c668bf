//! # `chunk-arena` - Chunked Run Allocator
//!
//! A typed allocator that hands out contiguous runs of slots from a growing
//! list of fixed-capacity chunks. Each chunk tracks its slots in a bitmap, so
//! freed runs are found again by a first-fit scan instead of a free list.
//!
//! ## Key Features
//!
//! - **Stable addresses**: chunks are never moved or returned until the arena
//!   is dropped or reset, so a handed-out pointer stays valid while reserved.
//! - **Checked release**: `deallocate` resolves the owning chunk by address
//!   and rejects foreign pointers, runs that cross the chunk end, and slots
//!   that are not reserved, without touching any state.
//! - **Rebinding**: every [`RunAlloc`] can produce an allocator of the same
//!   shape for another value type, which is how [`ArenaList`] stores nodes.
//!
//! ## Architecture
//!
//! 1. **Occupancy bitmaps** ([`alloc::OccupancyMap`]): one bit per slot,
//!    word-at-a-time scans.
//! 2. **Chunks**: `C` slots, a reserved map, a live map and an optional
//!    run-length table.
//! 3. **Arena** ([`ChunkArena`]): newest-chunk-first placement, growth by one
//!    chunk when nothing fits.
//! 4. **Containers** ([`ArenaList`]): generic over [`RunAlloc`], defaulting to
//!    [`GlobalRunAlloc`].
//!
//! ## Example
//!
//! ```rust
//! use chunk_arena::{ChunkArena, ChunkList};
//!
//! let mut arena: ChunkArena<u64, 10> = ChunkArena::new();
//! let first = arena.allocate(6).unwrap();
//! let second = arena.allocate(4).unwrap();
//! assert_eq!(unsafe { first.as_ptr().add(6) }, second.as_ptr());
//! assert_eq!(arena.chunk_count(), 1);
//!
//! let mut list: ChunkList<u64, 10> = ChunkList::new();
//! list.push_back(1).unwrap();
//! list.push_back(2).unwrap();
//! assert_eq!(list.iter().sum::<u64>(), 3);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[macro_use]
mod macros;

pub mod alloc;
pub mod collections;
pub mod factorial;

pub use alloc::{
    ArenaConfig, ArenaError, ArenaStats, ChunkArena, ConstructError, GlobalRunAlloc, RunAlloc, TeardownPolicy,
};
pub use collections::{ArenaList, ChunkList};
pub use factorial::{factorial, factorial_const, Factorial};

// Compile-time assertions for memory layout
const _: () = {
    use core::mem;

    // The baseline allocator carries no state.
    assert!(mem::size_of::<GlobalRunAlloc<u64>>() == 0);
};
