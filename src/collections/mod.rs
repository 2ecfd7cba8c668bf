//! Containers that take their storage from a [`RunAlloc`](crate::alloc::RunAlloc).
//!
//! - `linked_list`: a doubly linked list with cursors

pub mod linked_list;

pub use linked_list::{ArenaList, ChunkList, CursorMut};
