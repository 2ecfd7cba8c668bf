//! `GlobalRunAlloc` - a run allocator backed by the global allocator.
//!
//! Every `allocate(n)` is a separate trip to the global allocator. It keeps no
//! bookkeeping, so it cannot validate pointers or slot state: the unsafe
//! contracts of [`RunAlloc`] are the caller's to uphold. It is the baseline
//! containers fall back to when no arena is supplied.

use crate::alloc::{ArenaError, ConstructError, RunAlloc};
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use std::alloc::{alloc, dealloc};

/// A stateless run allocator for `T` on top of the global allocator.
pub struct GlobalRunAlloc<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> GlobalRunAlloc<T> {
    /// Creates the allocator. It holds no state.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn layout(n: usize) -> Result<Layout, ArenaError> {
        Layout::array::<T>(n).map_err(|_| ArenaError::CapacityExceeded {
            requested: n,
            capacity: isize::MAX as usize / core::mem::size_of::<T>().max(1),
        })
    }
}

impl<T> Default for GlobalRunAlloc<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for GlobalRunAlloc<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for GlobalRunAlloc<T> {}

impl<T> fmt::Debug for GlobalRunAlloc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GlobalRunAlloc")
    }
}

impl<T> RunAlloc for GlobalRunAlloc<T> {
    type Value = T;
    type Rebind<U> = GlobalRunAlloc<U>;

    fn rebind<U>(&self) -> GlobalRunAlloc<U> {
        GlobalRunAlloc::new()
    }

    fn empty_like(&self) -> Self {
        Self::new()
    }

    fn allocate(&mut self, n: usize) -> Result<NonNull<T>, ArenaError> {
        let layout = Self::layout(n)?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        // SAFETY: the layout has non-zero size.
        let raw = unsafe { alloc(layout) };
        NonNull::new(raw.cast::<T>()).ok_or(ArenaError::AllocationFailure {
            bytes: layout.size(),
        })
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize) -> Result<(), ArenaError> {
        let layout = Self::layout(n)?;
        if layout.size() != 0 {
            dealloc(ptr.as_ptr().cast::<u8>(), layout);
        }
        Ok(())
    }

    unsafe fn construct(&mut self, ptr: NonNull<T>, value: T) -> Result<(), ConstructError<T>> {
        ptr::write(ptr.as_ptr(), value);
        Ok(())
    }

    unsafe fn take(&mut self, ptr: NonNull<T>) -> Result<T, ArenaError> {
        Ok(ptr::read(ptr.as_ptr()))
    }

    unsafe fn destroy(&mut self, ptr: NonNull<T>) -> Result<(), ArenaError> {
        ptr::drop_in_place(ptr.as_ptr());
        Ok(())
    }
}
