//! A fixed-capacity block of `C` slots with occupancy tracking.

use crate::alloc::occupancy::OccupancyMap;
use crate::alloc::ArenaError;
use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};
use std::alloc::{alloc, dealloc};

/// One chunk of an arena.
///
/// Slot memory is a separate heap block, so moving the `Chunk` record (e.g.
/// when the arena's chunk vector grows) never moves the slots themselves.
pub(crate) struct Chunk<T, const C: usize> {
    slots: NonNull<T>,
    /// Reserved slots.
    occupancy: OccupancyMap,
    /// Slots holding a constructed value. Always a subset of `occupancy`.
    live: OccupancyMap,
    /// Run length starting at each slot (0 = no run starts there).
    runs: Option<Box<[usize]>>,
    _marker: PhantomData<T>,
}

// The chunk owns its slots exclusively; sending it sends the `T`s.
unsafe impl<T: Send, const C: usize> Send for Chunk<T, C> {}

impl<T, const C: usize> Chunk<T, C> {
    fn layout() -> Result<Layout, ArenaError> {
        Layout::array::<T>(C).map_err(|_| ArenaError::AllocationFailure { bytes: 0 })
    }

    /// Allocates a chunk with every slot free.
    ///
    /// Nothing is leaked on failure: partially built parts are dropped.
    pub(crate) fn try_new(track_runs: bool) -> Result<Self, ArenaError> {
        let layout = Self::layout()?;
        let failure = ArenaError::AllocationFailure {
            bytes: layout.size(),
        };

        let occupancy = OccupancyMap::try_new(C).ok_or(failure)?;
        let live = OccupancyMap::try_new(C).ok_or(failure)?;
        let runs = if track_runs {
            let mut table = Vec::new();
            table.try_reserve_exact(C).map_err(|_| failure)?;
            table.resize(C, 0);
            Some(table.into_boxed_slice())
        } else {
            None
        };

        debug_assert!(layout.size() != 0, "zero-sized chunks are rejected by the arena");
        // SAFETY: the layout has non-zero size (T is not zero-sized and C > 0).
        let raw = unsafe { alloc(layout) };
        let slots = NonNull::new(raw.cast::<T>()).ok_or(failure)?;

        Ok(Self {
            slots,
            occupancy,
            live,
            runs,
            _marker: PhantomData,
        })
    }

    /// Size of the slot storage in bytes.
    pub(crate) fn bytes() -> usize {
        mem::size_of::<T>().saturating_mul(C)
    }

    /// Pointer to slot `offset`.
    #[inline]
    pub(crate) fn slot_ptr(&self, offset: usize) -> NonNull<T> {
        debug_assert!(offset < C);
        // SAFETY: offset < C keeps the pointer inside the slot allocation.
        unsafe { NonNull::new_unchecked(self.slots.as_ptr().add(offset)) }
    }

    /// Returns `true` if `ptr` falls inside this chunk's slot storage.
    #[inline]
    pub(crate) fn contains(&self, ptr: NonNull<T>) -> bool {
        let start = self.slots.as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        addr >= start && addr - start < Self::bytes()
    }

    /// Slot offset of `ptr`, if it lies exactly on a slot boundary of this chunk.
    pub(crate) fn offset_of(&self, ptr: NonNull<T>) -> Option<usize> {
        if !self.contains(ptr) {
            return None;
        }
        let delta = ptr.as_ptr() as usize - self.slots.as_ptr() as usize;
        let size = mem::size_of::<T>();
        (delta % size == 0).then_some(delta / size)
    }

    #[inline]
    pub(crate) fn is_reserved(&self, offset: usize) -> bool {
        self.occupancy.get(offset)
    }

    #[inline]
    pub(crate) fn is_live(&self, offset: usize) -> bool {
        self.live.get(offset)
    }

    pub(crate) fn reserved(&self) -> usize {
        self.occupancy.count_ones()
    }

    pub(crate) fn live(&self) -> usize {
        self.live.count_ones()
    }

    /// First-fit search for `n` free slots.
    pub(crate) fn find_run(&self, n: usize) -> Option<usize> {
        self.occupancy.find_clear_run(n)
    }

    /// Marks `[offset, offset + n)` reserved. The range must be free.
    pub(crate) fn reserve(&mut self, offset: usize, n: usize) {
        debug_assert!(self.occupancy.is_range_clear(offset, offset + n));
        self.occupancy.set_range(offset, offset + n);
        if let Some(runs) = self.runs.as_deref_mut() {
            runs[offset] = n;
        }
    }

    /// Checks that `[offset, offset + n)` can be released. Mutates nothing.
    pub(crate) fn check_release(&self, offset: usize, n: usize) -> Result<(), ArenaError> {
        if n > C - offset {
            return Err(ArenaError::RunOutOfBounds {
                offset,
                len: n,
                capacity: C,
            });
        }
        if !self.occupancy.is_range_set(offset, offset + n) {
            return Err(ArenaError::NotReserved { offset, len: n });
        }
        if let Some(runs) = self.runs.as_deref() {
            let recorded = runs[offset];
            if recorded != n {
                return Err(ArenaError::RunMismatch {
                    offset,
                    expected: (recorded != 0).then_some(recorded),
                    actual: n,
                });
            }
        }
        Ok(())
    }

    /// Clears `[offset, offset + n)`. Returns how many live values were
    /// abandoned in the run (they are leaked, not dropped).
    pub(crate) fn release(&mut self, offset: usize, n: usize) -> usize {
        let end = offset + n;
        let abandoned = self.live.count_range(offset, end);
        self.live.clear_range(offset, end);
        self.occupancy.clear_range(offset, end);
        if let Some(runs) = self.runs.as_deref_mut() {
            runs[offset] = 0;
        }
        abandoned
    }

    /// Writes `value` into slot `offset` and marks it live.
    ///
    /// # Safety
    /// The slot must be reserved and not live.
    pub(crate) unsafe fn write(&mut self, offset: usize, value: T) {
        debug_assert!(self.is_reserved(offset) && !self.is_live(offset));
        ptr::write(self.slot_ptr(offset).as_ptr(), value);
        self.live.set(offset);
    }

    /// Moves the value out of slot `offset` and marks it not live.
    ///
    /// # Safety
    /// The slot must be live.
    pub(crate) unsafe fn read(&mut self, offset: usize) -> T {
        debug_assert!(self.is_live(offset));
        self.live.clear(offset);
        ptr::read(self.slot_ptr(offset).as_ptr())
    }

    /// Drops the value in slot `offset` in place.
    ///
    /// # Safety
    /// The slot must be live.
    pub(crate) unsafe fn drop_slot(&mut self, offset: usize) {
        debug_assert!(self.is_live(offset));
        // Cleared first: a panicking destructor must not lead to a second drop.
        self.live.clear(offset);
        ptr::drop_in_place(self.slot_ptr(offset).as_ptr());
    }

    /// # Safety
    /// The slot must be live.
    pub(crate) unsafe fn get(&self, offset: usize) -> &T {
        &*self.slot_ptr(offset).as_ptr()
    }

    /// # Safety
    /// The slot must be live.
    pub(crate) unsafe fn get_mut(&mut self, offset: usize) -> &mut T {
        &mut *self.slot_ptr(offset).as_ptr()
    }

    /// Drops every live value. Returns how many were dropped.
    pub(crate) fn drop_live(&mut self) -> usize {
        let live: Vec<usize> = self.live.iter_ones().collect();
        for &offset in &live {
            // SAFETY: offset came from the live map.
            unsafe { self.drop_slot(offset) };
        }
        live.len()
    }

    /// Frees every slot without dropping values. Returns how many live values
    /// were abandoned.
    pub(crate) fn clear(&mut self) -> usize {
        let abandoned = self.live.count_ones();
        self.live.clear_all();
        self.occupancy.clear_all();
        if let Some(runs) = self.runs.as_deref_mut() {
            runs.fill(0);
        }
        abandoned
    }
}

impl<T, const C: usize> Drop for Chunk<T, C> {
    fn drop(&mut self) {
        // The layout was valid when the chunk was created.
        if let Ok(layout) = Self::layout() {
            // SAFETY: `slots` was allocated with exactly this layout.
            unsafe { dealloc(self.slots.as_ptr().cast::<u8>(), layout) };
        }
    }
}
