//! `ChunkArena` - a chunked arena handing out contiguous runs of typed slots.
//!
//! The arena owns a growing set of fixed-size chunks. Each chunk holds `C`
//! slots of `T` and a bitmap recording which slots are reserved.
//!
//! # Allocation
//! `allocate(n)` searches the chunks from the newest to the oldest and, inside
//! each chunk, takes the leftmost run of `n` free slots (first fit, not best
//! fit). If no chunk has such a run a new chunk is created and the run starts
//! at its slot 0. A run never spans two chunks, so `n` may be at most `C`.
//!
//! # Deallocation
//! `deallocate(ptr, n)` finds the chunk whose slot range contains `ptr` and
//! clears the run. The arena does not need to remember run lengths: the
//! caller passes the same `n` it allocated with. A length that would cross
//! the end of the chunk is always rejected; with
//! [`ArenaConfig::track_runs`] every mismatch is rejected.
//!
//! # Values
//! Reserved slots are uninitialized. `construct` places a value in one slot,
//! `destroy` drops it in place; neither changes the reservation. A run of
//! three slots can hold three separately constructed values.
//!
//! # Teardown
//! Dropping the arena releases every chunk. Values still constructed at that
//! point are leaked under [`TeardownPolicy::Leak`] (the default) and dropped
//! under [`TeardownPolicy::DropLive`]. Callers relying on `Leak` must destroy
//! their values first.
//!
//! Chunk slot storage never moves, so pointers stay valid until their run is
//! deallocated or the arena is dropped or reset. The arena is not `Clone`.

use crate::alloc::chunk::Chunk;
use crate::alloc::{ArenaConfig, ArenaError, ArenaStats, ConstructError, RunAlloc, TeardownPolicy};
use core::fmt;
use core::ptr::NonNull;

/// A chunked run allocator for values of type `T`, `C` slots per chunk.
///
/// Single owner, single thread: every mutating operation takes `&mut self`.
/// The arena is `Send` when `T` is, and never `Sync`.
///
/// Zero-sized `T` and `C == 0` are rejected at compile time.
pub struct ChunkArena<T, const C: usize> {
    /// Chunks in creation order; the newest is last and searched first.
    chunks: Vec<Chunk<T, C>>,
    config: ArenaConfig,
}

impl<T, const C: usize> ChunkArena<T, C> {
    const SHAPE_OK: () = {
        assert!(C > 0, "chunk capacity must be non-zero");
        assert!(core::mem::size_of::<T>() != 0, "zero-sized slot types are not supported");
    };

    /// Slots per chunk; also the longest run a single allocation may request.
    pub const CAPACITY: usize = C;

    /// Creates an empty arena with the default configuration. No chunk is
    /// allocated until the first request.
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default())
    }

    /// Creates an empty arena with `config`.
    pub fn with_config(config: ArenaConfig) -> Self {
        let () = Self::SHAPE_OK;
        Self {
            chunks: Vec::new(),
            config,
        }
    }

    /// The arena's configuration.
    #[inline]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Slots per chunk.
    #[inline]
    pub fn capacity(&self) -> usize {
        C
    }

    /// Number of chunks allocated so far.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Reserved slots across all chunks.
    pub fn reserved(&self) -> usize {
        self.chunks.iter().map(Chunk::reserved).sum()
    }

    /// Slots currently holding a constructed value.
    pub fn live(&self) -> usize {
        self.chunks.iter().map(Chunk::live).sum()
    }

    /// Usage summary.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            chunks: self.chunks.len(),
            slots_per_chunk: C,
            reserved: self.reserved(),
            live: self.live(),
        }
    }

    /// Reserves `n` contiguous slots and returns a pointer to the first one.
    ///
    /// The slots are reserved but hold no value; use [`ChunkArena::construct`]
    /// before reading them. `n == 0` returns a dangling pointer and touches
    /// nothing.
    ///
    /// # Errors
    /// - `ArenaError::CapacityExceeded` if `n > C`.
    /// - `ArenaError::AllocationFailure` if a new chunk was needed and could not
    ///   be allocated. The arena is unchanged in that case.
    pub fn allocate(&mut self, n: usize) -> Result<NonNull<T>, ArenaError> {
        if n == 0 {
            return Ok(NonNull::dangling());
        }
        if n > C {
            arena_event!(debug, requested = n, capacity = C, "run exceeds chunk capacity");
            return Err(ArenaError::CapacityExceeded {
                requested: n,
                capacity: C,
            });
        }

        for (_index, chunk) in self.chunks.iter_mut().enumerate().rev() {
            if let Some(offset) = chunk.find_run(n) {
                chunk.reserve(offset, n);
                arena_event!(trace, chunk = _index, offset, len = n, "reserved run");
                return Ok(chunk.slot_ptr(offset));
            }
        }

        self.grow(n)
    }

    /// Creates a new chunk holding a run of `n` at slot 0.
    fn grow(&mut self, n: usize) -> Result<NonNull<T>, ArenaError> {
        let failure = ArenaError::AllocationFailure {
            bytes: Chunk::<T, C>::bytes(),
        };
        self.chunks.try_reserve(1).map_err(|_| failure)?;
        let mut chunk = match Chunk::try_new(self.config.track_runs) {
            Ok(chunk) => chunk,
            Err(err) => {
                arena_event!(warn, chunks = self.chunks.len(), "chunk allocation failed");
                return Err(err);
            }
        };

        chunk.reserve(0, n);
        let ptr = chunk.slot_ptr(0);
        self.chunks.push(chunk);
        arena_event!(
            debug,
            chunk = self.chunks.len() - 1,
            slots = C,
            bytes = Chunk::<T, C>::bytes(),
            "allocated chunk"
        );
        Ok(ptr)
    }

    /// Finds the chunk index and slot offset of `ptr`.
    fn locate(&self, ptr: NonNull<T>) -> Result<(usize, usize), ArenaError> {
        let (index, chunk) = self
            .chunks
            .iter()
            .enumerate()
            .rev()
            .find(|(_, chunk)| chunk.contains(ptr))
            .ok_or(ArenaError::ForeignPointer)?;
        let offset = chunk.offset_of(ptr).ok_or(ArenaError::ForeignPointer)?;
        Ok((index, offset))
    }

    /// Releases the run of `n` slots starting at `ptr`.
    ///
    /// `n` must be the length passed to the `allocate` call that returned
    /// `ptr`. Slot memory is not cleared. Values still constructed in the run
    /// are leaked, not dropped: destroy them first.
    ///
    /// `n == 0` is a no-op.
    ///
    /// # Errors
    /// All checks happen before any state changes:
    /// - `ArenaError::ForeignPointer` if `ptr` is not a slot of this arena.
    /// - `ArenaError::RunOutOfBounds` if the run would cross the end of the chunk.
    /// - `ArenaError::NotReserved` if part of the run is already free.
    /// - `ArenaError::RunMismatch` (run tracking only) if `(ptr, n)` is not a
    ///   run handed out by `allocate`.
    pub fn deallocate(&mut self, ptr: NonNull<T>, n: usize) -> Result<(), ArenaError> {
        if n == 0 {
            return Ok(());
        }
        let (index, offset) = self.locate(ptr).map_err(|err| {
            arena_event!(debug, len = n, "deallocate of foreign pointer");
            err
        })?;
        let chunk = &mut self.chunks[index];
        if let Err(err) = chunk.check_release(offset, n) {
            arena_event!(debug, chunk = index, offset, len = n, error = %err, "deallocate rejected");
            return Err(err);
        }

        let abandoned = chunk.release(offset, n);
        if abandoned > 0 {
            arena_event!(warn, chunk = index, offset, len = n, abandoned, "released run still held values");
        }
        arena_event!(trace, chunk = index, offset, len = n, "released run");
        Ok(())
    }

    /// Locates a reserved, empty slot.
    fn vacant_slot(&self, ptr: NonNull<T>) -> Result<(usize, usize), ArenaError> {
        let (index, offset) = self.locate(ptr)?;
        let chunk = &self.chunks[index];
        if !chunk.is_reserved(offset) {
            return Err(ArenaError::NotReserved { offset, len: 1 });
        }
        if chunk.is_live(offset) {
            return Err(ArenaError::AlreadyConstructed { offset });
        }
        Ok((index, offset))
    }

    /// Locates a slot holding a value.
    fn live_slot(&self, ptr: NonNull<T>) -> Result<(usize, usize), ArenaError> {
        let (index, offset) = self.locate(ptr)?;
        if !self.chunks[index].is_live(offset) {
            return Err(ArenaError::NotConstructed { offset });
        }
        Ok((index, offset))
    }

    /// Moves `value` into the reserved slot at `ptr`.
    ///
    /// Occupancy is not touched: the slot must already be reserved by
    /// `allocate`.
    ///
    /// # Errors
    /// `ForeignPointer`, `NotReserved` or `AlreadyConstructed`; the value is
    /// returned inside the error.
    pub fn construct(&mut self, ptr: NonNull<T>, value: T) -> Result<(), ConstructError<T>> {
        match self.vacant_slot(ptr) {
            Ok((index, offset)) => {
                // SAFETY: vacant_slot checked the slot is reserved and empty.
                unsafe { self.chunks[index].write(offset, value) };
                Ok(())
            }
            Err(err) => Err(ConstructError::new(err, value)),
        }
    }

    /// Like [`ChunkArena::construct`], building the value with `make` only
    /// once the slot has been validated.
    ///
    /// # Errors
    /// `ForeignPointer`, `NotReserved` or `AlreadyConstructed`; `make` is not
    /// called.
    pub fn construct_with<F>(&mut self, ptr: NonNull<T>, make: F) -> Result<(), ArenaError>
    where
        F: FnOnce() -> T,
    {
        let (index, offset) = self.vacant_slot(ptr)?;
        // SAFETY: vacant_slot checked the slot is reserved and empty.
        unsafe { self.chunks[index].write(offset, make()) };
        Ok(())
    }

    /// Drops the value at `ptr` in place. The slot stays reserved.
    ///
    /// # Errors
    /// `ForeignPointer` or `NotConstructed`.
    pub fn destroy(&mut self, ptr: NonNull<T>) -> Result<(), ArenaError> {
        let (index, offset) = self.live_slot(ptr)?;
        // SAFETY: live_slot checked the slot holds a value.
        unsafe { self.chunks[index].drop_slot(offset) };
        Ok(())
    }

    /// Moves the value at `ptr` out of the arena. The slot stays reserved.
    ///
    /// # Errors
    /// `ForeignPointer` or `NotConstructed`.
    pub fn take(&mut self, ptr: NonNull<T>) -> Result<T, ArenaError> {
        let (index, offset) = self.live_slot(ptr)?;
        // SAFETY: live_slot checked the slot holds a value.
        Ok(unsafe { self.chunks[index].read(offset) })
    }

    /// Returns the value at `ptr`, if that slot holds one.
    pub fn get(&self, ptr: NonNull<T>) -> Option<&T> {
        let (index, offset) = self.live_slot(ptr).ok()?;
        // SAFETY: live_slot checked the slot holds a value.
        Some(unsafe { self.chunks[index].get(offset) })
    }

    /// Returns the value at `ptr` mutably, if that slot holds one.
    pub fn get_mut(&mut self, ptr: NonNull<T>) -> Option<&mut T> {
        let (index, offset) = self.live_slot(ptr).ok()?;
        // SAFETY: live_slot checked the slot holds a value.
        Some(unsafe { self.chunks[index].get_mut(offset) })
    }

    /// Returns `true` if `ptr` is a slot of this arena.
    pub fn contains(&self, ptr: NonNull<T>) -> bool {
        self.locate(ptr).is_ok()
    }

    /// Returns `true` if `ptr` is a reserved slot of this arena.
    pub fn is_reserved(&self, ptr: NonNull<T>) -> bool {
        self.locate(ptr)
            .is_ok_and(|(index, offset)| self.chunks[index].is_reserved(offset))
    }

    /// Returns `true` if `ptr` is a slot holding a value.
    pub fn is_live(&self, ptr: NonNull<T>) -> bool {
        self.live_slot(ptr).is_ok()
    }

    /// Frees every run while keeping the chunks for reuse.
    ///
    /// Live values are dropped or leaked according to the teardown policy.
    /// Every pointer previously returned by `allocate` becomes stale.
    pub fn reset(&mut self) {
        self.teardown();
        for chunk in &mut self.chunks {
            chunk.clear();
        }
        arena_event!(debug, chunks = self.chunks.len(), "arena reset");
    }

    /// Applies the teardown policy to live values.
    fn teardown(&mut self) {
        match self.config.teardown {
            TeardownPolicy::DropLive => {
                let dropped: usize = self.chunks.iter_mut().map(Chunk::drop_live).sum();
                if dropped > 0 {
                    arena_event!(debug, dropped, "dropped live values at teardown");
                }
            }
            TeardownPolicy::Leak => {
                let leaked = self.live();
                if leaked > 0 {
                    arena_event!(warn, leaked, "live values leaked at teardown");
                }
            }
        }
    }
}

impl<T, const C: usize> Default for ChunkArena<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const C: usize> Drop for ChunkArena<T, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T, const C: usize> fmt::Debug for ChunkArena<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkArena")
            .field("capacity", &C)
            .field("chunks", &self.chunks.len())
            .field("reserved", &self.reserved())
            .field("live", &self.live())
            .field("config", &self.config)
            .finish()
    }
}

impl<T, const C: usize> RunAlloc for ChunkArena<T, C> {
    type Value = T;
    type Rebind<U> = ChunkArena<U, C>;

    fn rebind<U>(&self) -> ChunkArena<U, C> {
        ChunkArena::with_config(self.config)
    }

    fn empty_like(&self) -> Self {
        Self::with_config(self.config)
    }

    fn allocate(&mut self, n: usize) -> Result<NonNull<T>, ArenaError> {
        ChunkArena::allocate(self, n)
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize) -> Result<(), ArenaError> {
        ChunkArena::deallocate(self, ptr, n)
    }

    unsafe fn construct(&mut self, ptr: NonNull<T>, value: T) -> Result<(), ConstructError<T>> {
        ChunkArena::construct(self, ptr, value)
    }

    unsafe fn take(&mut self, ptr: NonNull<T>) -> Result<T, ArenaError> {
        ChunkArena::take(self, ptr)
    }

    unsafe fn destroy(&mut self, ptr: NonNull<T>) -> Result<(), ArenaError> {
        ChunkArena::destroy(self, ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn addr<T>(ptr: NonNull<T>) -> usize {
        ptr.as_ptr() as usize
    }

    fn tracked<T, const C: usize>() -> ChunkArena<T, C> {
        ChunkArena::with_config(ArenaConfig::new().with_run_tracking(true))
    }

    #[test]
    fn test_zero_length_allocation_touches_nothing() {
        let mut arena = ChunkArena::<u32, 4>::new();
        let ptr = arena.allocate(0).unwrap();
        assert_eq!(ptr, NonNull::dangling());
        assert_eq!(arena.chunk_count(), 0);
        assert_eq!(arena.deallocate(ptr, 0), Ok(()));
    }

    #[test]
    fn test_capacity_exceeded_never_grows() {
        let mut arena = ChunkArena::<u32, 4>::new();
        assert_eq!(
            arena.allocate(5),
            Err(ArenaError::CapacityExceeded { requested: 5, capacity: 4 })
        );
        assert_eq!(arena.chunk_count(), 0);
    }

    #[test]
    fn test_full_chunk_run() {
        let mut arena = ChunkArena::<u8, 4>::new();
        let p1 = arena.allocate(4).unwrap();
        let p2 = arena.allocate(4).unwrap();
        assert_eq!(arena.chunk_count(), 2);
        assert!(addr(p2) + 4 <= addr(p1) || addr(p1) + 4 <= addr(p2));
    }

    #[test]
    fn test_newest_chunk_searched_first() {
        let mut arena = ChunkArena::<u64, 4>::new();
        let old = arena.allocate(2).unwrap(); // chunk 0: 2 free
        let new = arena.allocate(3).unwrap(); // chunk 1: 1 free
        let next = arena.allocate(1).unwrap();
        // The newest chunk wins even though the older one has more room.
        assert_eq!(addr(next), addr(new) + 3 * 8);
        let after = arena.allocate(1).unwrap();
        assert_eq!(addr(after), addr(old) + 2 * 8);
    }

    #[test]
    fn test_deallocate_foreign_pointer() {
        let mut arena = ChunkArena::<u32, 4>::new();
        arena.allocate(1).unwrap();
        let mut outside = 7u32;
        let foreign = NonNull::from(&mut outside);
        assert_eq!(arena.deallocate(foreign, 1), Err(ArenaError::ForeignPointer));
        assert_eq!(arena.reserved(), 1);
    }

    #[test]
    fn test_deallocate_twice_is_rejected() {
        let mut arena = ChunkArena::<u32, 4>::new();
        let p = arena.allocate(2).unwrap();
        arena.deallocate(p, 2).unwrap();
        assert_eq!(
            arena.deallocate(p, 2),
            Err(ArenaError::NotReserved { offset: 0, len: 2 })
        );
    }

    #[test]
    fn test_run_tracking_rejects_short_release() {
        let mut arena = tracked::<u32, 10>();
        let p = arena.allocate(4).unwrap();
        assert_eq!(
            arena.deallocate(p, 3),
            Err(ArenaError::RunMismatch { offset: 0, expected: Some(4), actual: 3 })
        );
        assert_eq!(arena.reserved(), 4);
        // Interior pointer of a run.
        let inner = NonNull::new(p.as_ptr().wrapping_add(1)).unwrap();
        assert_eq!(
            arena.deallocate(inner, 3),
            Err(ArenaError::RunMismatch { offset: 1, expected: None, actual: 3 })
        );
        arena.deallocate(p, 4).unwrap();
        assert_eq!(arena.reserved(), 0);
    }

    #[test]
    fn test_untracked_release_of_subrun() {
        let mut arena = ChunkArena::<u32, 10>::with_config(ArenaConfig::new().with_run_tracking(false));
        let p = arena.allocate(4).unwrap();
        // Without tracking a shorter in-bounds release is accepted.
        arena.deallocate(p, 3).unwrap();
        assert_eq!(arena.reserved(), 1);
    }

    #[test]
    fn test_construct_requires_reservation() {
        let mut arena = ChunkArena::<String, 4>::new();
        let p = arena.allocate(1).unwrap();
        let free = NonNull::new(p.as_ptr().wrapping_add(1)).unwrap();
        let err = arena.construct(free, "x".to_owned()).unwrap_err();
        assert_eq!(err.error(), ArenaError::NotReserved { offset: 1, len: 1 });
        assert_eq!(err.into_value(), "x");

        arena.construct(p, "a".to_owned()).unwrap();
        let err = arena.construct(p, "b".to_owned()).unwrap_err();
        assert_eq!(err.error(), ArenaError::AlreadyConstructed { offset: 0 });
        assert_eq!(arena.get(p).map(String::as_str), Some("a"));
        arena.destroy(p).unwrap();
    }

    #[test]
    fn test_construct_with_skips_closure_on_error() {
        let mut arena = ChunkArena::<u32, 2>::new();
        let p = arena.allocate(1).unwrap();
        arena.deallocate(p, 1).unwrap();
        let called = Cell::new(false);
        let result = arena.construct_with(p, || {
            called.set(true);
            1
        });
        assert_eq!(result, Err(ArenaError::NotReserved { offset: 0, len: 1 }));
        assert!(!called.get());
    }

    #[test]
    fn test_destroy_unconstructed_slot() {
        let mut arena = ChunkArena::<u32, 2>::new();
        let p = arena.allocate(1).unwrap();
        assert_eq!(arena.destroy(p), Err(ArenaError::NotConstructed { offset: 0 }));
    }

    #[test]
    fn test_take_leaves_slot_reserved() {
        let mut arena = ChunkArena::<Vec<u8>, 3>::new();
        let p = arena.allocate(1).unwrap();
        arena.construct(p, vec![1, 2]).unwrap();
        assert_eq!(arena.take(p).unwrap(), [1, 2]);
        assert!(arena.is_reserved(p));
        assert!(!arena.is_live(p));
        arena.deallocate(p, 1).unwrap();
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut arena = ChunkArena::<i64, 8>::new();
        let p = arena.allocate(1).unwrap();
        arena.construct(p, 5).unwrap();
        *arena.get_mut(p).unwrap() += 10;
        assert_eq!(arena.get(p), Some(&15));
    }

    #[test]
    fn test_drop_live_policy_runs_destructors() {
        let drops = Rc::new(Cell::new(0));
        struct Probe(Rc<Cell<usize>>);
        impl Drop for Probe {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        {
            let mut arena = ChunkArena::<Probe, 4>::with_config(
                ArenaConfig::new().with_teardown(TeardownPolicy::DropLive),
            );
            let run = arena.allocate(3).unwrap();
            for i in 0..3 {
                let slot = NonNull::new(run.as_ptr().wrapping_add(i)).unwrap();
                arena.construct(slot, Probe(Rc::clone(&drops))).unwrap();
            }
            arena.destroy(run).unwrap();
            assert_eq!(drops.get(), 1);
        }
        assert_eq!(drops.get(), 3);

        {
            let mut arena = ChunkArena::<Probe, 4>::with_config(
                ArenaConfig::new().with_teardown(TeardownPolicy::Leak),
            );
            let p = arena.allocate(1).unwrap();
            arena.construct(p, Probe(Rc::clone(&drops))).unwrap();
        }
        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn test_reset_keeps_chunks() {
        let mut arena = ChunkArena::<u16, 4>::new();
        arena.allocate(4).unwrap();
        arena.allocate(4).unwrap();
        arena.reset();
        assert_eq!(arena.chunk_count(), 2);
        assert_eq!(arena.reserved(), 0);
        arena.allocate(4).unwrap();
        arena.allocate(4).unwrap();
        assert_eq!(arena.chunk_count(), 2);
    }

    #[test]
    fn test_stats() {
        let mut arena = ChunkArena::<u32, 10>::new();
        let p = arena.allocate(6).unwrap();
        arena.allocate(5).unwrap();
        arena.construct(p, 1).unwrap();
        let stats = arena.stats();
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.slots_per_chunk, 10);
        assert_eq!(stats.reserved, 11);
        assert_eq!(stats.live, 1);
        assert_eq!(stats.free(), 9);
    }

    #[test]
    fn test_rebind_shares_configuration() {
        let config = ArenaConfig::new()
            .with_teardown(TeardownPolicy::DropLive)
            .with_run_tracking(true);
        let arena = ChunkArena::<u8, 16>::with_config(config);
        let rebound: ChunkArena<(u64, u64), 16> = arena.rebind();
        assert_eq!(rebound.config(), &config);
        assert_eq!(rebound.capacity(), 16);
        assert_eq!(rebound.chunk_count(), 0);
    }

    #[test]
    fn test_arena_moves_keep_pointers_valid() {
        let mut arena = ChunkArena::<u32, 4>::new();
        let p = arena.allocate(1).unwrap();
        arena.construct(p, 99).unwrap();
        let mut moved = Box::new(arena);
        for _ in 0..10 {
            moved.allocate(4).unwrap();
        }
        assert_eq!(moved.get(p), Some(&99));
        moved.destroy(p).unwrap();
    }
}
