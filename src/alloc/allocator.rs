//! The `RunAlloc` capability.

use crate::alloc::{ArenaError, ConstructError};
use core::ptr::NonNull;

/// A trait for allocators that hand out runs of contiguous, typed slots.
///
/// This is the capability containers are written against. Reservation
/// (`allocate` / `deallocate`) is separate from the value lifecycle
/// (`construct` / `take` / `destroy`): a run of `n` slots can be reserved once
/// and then filled and emptied slot by slot.
///
/// The caller is responsible for passing the same `n` to `deallocate` as was
/// passed to the `allocate` call that produced the pointer.
pub trait RunAlloc {
    /// The slot type.
    type Value;

    /// The same allocator shape for slots of type `U`.
    ///
    /// Containers use this to allocate their own node types from an allocator
    /// that was configured for the element type.
    type Rebind<U>: RunAlloc<Value = U>;

    /// Builds an empty allocator for `U` that shares this allocator's policy.
    fn rebind<U>(&self) -> Self::Rebind<U>;

    /// Builds an empty allocator of the same type and policy.
    fn empty_like(&self) -> Self
    where
        Self: Sized;

    /// Reserves `n` contiguous slots and returns a pointer to the first.
    ///
    /// `n == 0` returns a dangling pointer without touching any storage.
    ///
    /// # Errors
    /// Returns `ArenaError::CapacityExceeded` if `n` can never be satisfied and
    /// `ArenaError::AllocationFailure` if backing memory could not be obtained.
    fn allocate(&mut self, n: usize) -> Result<NonNull<Self::Value>, ArenaError>;

    /// Releases a run previously returned by [`RunAlloc::allocate`].
    ///
    /// Values still constructed in the run are not dropped.
    ///
    /// # Errors
    /// Implementations that can validate the run report invalid arguments
    /// without changing any state.
    ///
    /// # Safety
    /// `ptr` and `n` must describe a run returned by `allocate` on this
    /// allocator that has not been released yet.
    unsafe fn deallocate(&mut self, ptr: NonNull<Self::Value>, n: usize) -> Result<(), ArenaError>;

    /// Moves `value` into the reserved slot at `ptr`.
    ///
    /// # Errors
    /// On rejection the value is handed back inside the error.
    ///
    /// # Safety
    /// `ptr` must address a reserved slot of this allocator that holds no value.
    unsafe fn construct(
        &mut self,
        ptr: NonNull<Self::Value>,
        value: Self::Value,
    ) -> Result<(), ConstructError<Self::Value>>;

    /// Moves the value out of the slot at `ptr`, leaving the slot reserved but empty.
    ///
    /// # Errors
    /// Implementations that track slot state reject slots holding no value.
    ///
    /// # Safety
    /// `ptr` must address a slot of this allocator that holds a value.
    unsafe fn take(&mut self, ptr: NonNull<Self::Value>) -> Result<Self::Value, ArenaError>;

    /// Drops the value in the slot at `ptr` in place.
    ///
    /// # Errors
    /// Same as [`RunAlloc::take`].
    ///
    /// # Safety
    /// Same as [`RunAlloc::take`].
    unsafe fn destroy(&mut self, ptr: NonNull<Self::Value>) -> Result<(), ArenaError> {
        self.take(ptr).map(drop)
    }
}
