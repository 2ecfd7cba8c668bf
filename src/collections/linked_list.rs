//! `ArenaList` - a doubly linked list over any [`RunAlloc`].
//!
//! The list is handed an allocator for its element type and rebinds it to its
//! own node type, so one allocator "shape" (for the arena: the chunk capacity
//! and configuration) backs the list whatever `T` is.
//!
//! Nodes are allocated one slot at a time. On a [`ChunkArena`] consecutive
//! pushes land in consecutive slots of the same chunk.
//!
//! Positional edits go through [`CursorMut`]. As with `std`'s cursors, the
//! cursor may rest on a "ghost" position between the tail and the head.
//!
//! [`ChunkArena`]: crate::alloc::ChunkArena

use crate::alloc::{ArenaError, ChunkArena, GlobalRunAlloc, RunAlloc};
use core::alloc::Layout;
use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;
use std::alloc::handle_alloc_error;

/// A list node as stored in the allocator. Opaque outside this module.
pub struct Node<T> {
    value: T,
    prev: Link<T>,
    next: Link<T>,
}

type Link<T> = Option<NonNull<Node<T>>>;

/// A doubly linked list whose nodes live in a [`RunAlloc`].
pub struct ArenaList<T, A: RunAlloc = GlobalRunAlloc<T>> {
    alloc: A::Rebind<Node<T>>,
    head: Link<T>,
    tail: Link<T>,
    len: usize,
    _marker: PhantomData<Box<Node<T>>>,
}

/// A list whose nodes live in a [`ChunkArena`] with `C` nodes per chunk.
pub type ChunkList<T, const C: usize> = ArenaList<T, ChunkArena<T, C>>;

impl<T, A: RunAlloc> ArenaList<T, A>
where
    A::Rebind<Node<T>>: Default,
{
    /// Creates an empty list on a default-constructed node allocator.
    ///
    /// No allocator for `T` itself is built, so `T` may be zero-sized.
    pub fn new() -> Self {
        Self {
            alloc: Default::default(),
            head: None,
            tail: None,
            len: 0,
            _marker: PhantomData,
        }
    }
}

impl<T, A: RunAlloc> ArenaList<T, A> {
    /// Creates an empty list whose node allocator is `template` rebound to
    /// the node type. `template` itself is not used for storage.
    pub fn new_in(template: &A) -> Self {
        Self {
            alloc: template.rebind(),
            head: None,
            tail: None,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// The node allocator.
    pub fn allocator(&self) -> &A::Rebind<Node<T>> {
        &self.alloc
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocates and constructs an unlinked node.
    fn alloc_node(&mut self, value: T, prev: Link<T>, next: Link<T>) -> Result<NonNull<Node<T>>, ArenaError> {
        let ptr = self.alloc.allocate(1)?;
        // SAFETY: `ptr` is a freshly reserved, empty slot of `self.alloc`.
        unsafe {
            if let Err(err) = self.alloc.construct(ptr, Node { value, prev, next }) {
                let released = self.alloc.deallocate(ptr, 1);
                debug_assert!(released.is_ok(), "corrupted list: {released:?}");
                return Err(err.error());
            }
        }
        Ok(ptr)
    }

    /// Moves the node's value out and returns the slot to the allocator.
    /// The node must already be unlinked.
    fn free_node(&mut self, ptr: NonNull<Node<T>>) -> T {
        // SAFETY: every linked node was constructed by `alloc_node` and is
        // released exactly once.
        unsafe {
            let node = match self.alloc.take(ptr) {
                Ok(node) => node,
                Err(err) => panic!("corrupted list: node slot rejected: {err}"),
            };
            let released = self.alloc.deallocate(ptr, 1);
            debug_assert!(released.is_ok(), "corrupted list: {released:?}");
            node.value
        }
    }

    /// Inserts `value` between `prev` and `next`, which must be adjacent.
    fn link_between(&mut self, value: T, prev: Link<T>, next: Link<T>) -> Result<NonNull<Node<T>>, ArenaError> {
        let node = self.alloc_node(value, prev, next)?;
        // SAFETY: prev/next are live nodes of this list.
        unsafe {
            match prev {
                Some(p) => (*p.as_ptr()).next = Some(node),
                None => self.head = Some(node),
            }
            match next {
                Some(n) => (*n.as_ptr()).prev = Some(node),
                None => self.tail = Some(node),
            }
        }
        self.len += 1;
        Ok(node)
    }

    /// Unlinks `node` and returns its value.
    fn unlink(&mut self, node: NonNull<Node<T>>) -> T {
        // SAFETY: `node` is a live node of this list.
        unsafe {
            let Node { prev, next, .. } = *node.as_ptr();
            match prev {
                Some(p) => (*p.as_ptr()).next = next,
                None => self.head = next,
            }
            match next {
                Some(n) => (*n.as_ptr()).prev = prev,
                None => self.tail = prev,
            }
        }
        self.len -= 1;
        self.free_node(node)
    }

    /// Pushes an element to the front of the list.
    ///
    /// # Errors
    /// Propagates allocator failures; the list is unchanged.
    pub fn push_front(&mut self, value: T) -> Result<(), ArenaError> {
        self.link_between(value, None, self.head).map(drop)
    }

    /// Pushes an element to the back of the list.
    ///
    /// # Errors
    /// Propagates allocator failures; the list is unchanged.
    pub fn push_back(&mut self, value: T) -> Result<(), ArenaError> {
        self.link_between(value, self.tail, None).map(drop)
    }

    /// Removes and returns the first element.
    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        Some(self.unlink(head))
    }

    /// Removes and returns the last element.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        Some(self.unlink(tail))
    }

    /// Returns a reference to the first element.
    pub fn front(&self) -> Option<&T> {
        // SAFETY: head is a live node borrowed for the lifetime of &self.
        self.head.map(|n| unsafe { &(*n.as_ptr()).value })
    }

    /// Returns a reference to the last element.
    pub fn back(&self) -> Option<&T> {
        // SAFETY: tail is a live node borrowed for the lifetime of &self.
        self.tail.map(|n| unsafe { &(*n.as_ptr()).value })
    }

    /// Returns a mutable reference to the first element.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        // SAFETY: head is a live node, exclusively borrowed through &mut self.
        self.head.map(|n| unsafe { &mut (*n.as_ptr()).value })
    }

    /// Returns a mutable reference to the last element.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        // SAFETY: tail is a live node, exclusively borrowed through &mut self.
        self.tail.map(|n| unsafe { &mut (*n.as_ptr()).value })
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }

    /// Returns an iterator over the elements, front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            head: self.head,
            tail: self.tail,
            len: self.len,
            _marker: PhantomData,
        }
    }

    /// Returns an iterator over mutable references, front to back.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            head: self.head,
            tail: self.tail,
            len: self.len,
            _marker: PhantomData,
        }
    }

    /// Returns a cursor at the first element (the ghost position if empty).
    pub fn cursor_front(&mut self) -> CursorMut<'_, T, A> {
        CursorMut {
            current: self.head,
            list: self,
        }
    }

    /// Returns a cursor at the last element (the ghost position if empty).
    pub fn cursor_back(&mut self) -> CursorMut<'_, T, A> {
        CursorMut {
            current: self.tail,
            list: self,
        }
    }
}

impl<T, A: RunAlloc> Default for ArenaList<T, A>
where
    A::Rebind<Node<T>>: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: RunAlloc> Drop for ArenaList<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Clone, A: RunAlloc> Clone for ArenaList<T, A> {
    fn clone(&self) -> Self {
        let mut list = Self {
            alloc: self.alloc.empty_like(),
            head: None,
            tail: None,
            len: 0,
            _marker: PhantomData,
        };
        list.extend(self.iter().cloned());
        list
    }
}

impl<T, A: RunAlloc> Extend<T> for ArenaList<T, A> {
    /// # Panics
    /// Aborts through `handle_alloc_error` if a node cannot be allocated.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            if self.push_back(value).is_err() {
                handle_alloc_error(Layout::new::<Node<T>>());
            }
        }
    }
}

impl<T, A: RunAlloc> FromIterator<T> for ArenaList<T, A>
where
    A::Rebind<Node<T>>: Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<T: fmt::Debug, A: RunAlloc> fmt::Debug for ArenaList<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: RunAlloc, B: RunAlloc> PartialEq<ArenaList<T, B>> for ArenaList<T, A> {
    fn eq(&self, other: &ArenaList<T, B>) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq, A: RunAlloc> Eq for ArenaList<T, A> {}

impl<'a, T, A: RunAlloc> IntoIterator for &'a ArenaList<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: RunAlloc> IntoIterator for &'a mut ArenaList<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

impl<T, A: RunAlloc> IntoIterator for ArenaList<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter { list: self }
    }
}

/// Borrowing iterator over an [`ArenaList`].
pub struct Iter<'a, T> {
    head: Link<T>,
    tail: Link<T>,
    len: usize,
    _marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.len == 0 {
            return None;
        }
        self.head.map(|node| {
            // SAFETY: the list is borrowed for 'a, so the node stays live.
            let node = unsafe { &*node.as_ptr() };
            self.len -= 1;
            self.head = node.next;
            &node.value
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.len == 0 {
            return None;
        }
        self.tail.map(|node| {
            // SAFETY: the list is borrowed for 'a, so the node stays live.
            let node = unsafe { &*node.as_ptr() };
            self.len -= 1;
            self.tail = node.prev;
            &node.value
        })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

/// Mutable iterator over an [`ArenaList`].
pub struct IterMut<'a, T> {
    head: Link<T>,
    tail: Link<T>,
    len: usize,
    _marker: PhantomData<&'a mut Node<T>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.len == 0 {
            return None;
        }
        self.head.map(|node| {
            // SAFETY: the list is mutably borrowed for 'a and each node is
            // yielded once.
            let node = unsafe { &mut *node.as_ptr() };
            self.len -= 1;
            self.head = node.next;
            &mut node.value
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.len == 0 {
            return None;
        }
        self.tail.map(|node| {
            // SAFETY: as in `next`.
            let node = unsafe { &mut *node.as_ptr() };
            self.len -= 1;
            self.tail = node.prev;
            &mut node.value
        })
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}

/// Owning iterator over an [`ArenaList`].
pub struct IntoIter<T, A: RunAlloc> {
    list: ArenaList<T, A>,
}

impl<T, A: RunAlloc> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.list.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len, Some(self.list.len))
    }
}

impl<T, A: RunAlloc> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        self.list.pop_back()
    }
}

impl<T, A: RunAlloc> ExactSizeIterator for IntoIter<T, A> {}

/// A mutable cursor over an [`ArenaList`].
pub struct CursorMut<'a, T, A: RunAlloc> {
    list: &'a mut ArenaList<T, A>,
    current: Link<T>,
}

impl<'a, T, A: RunAlloc> CursorMut<'a, T, A> {
    /// Returns `true` if the cursor rests on the ghost position.
    pub fn is_ghost(&self) -> bool {
        self.current.is_none()
    }

    /// Returns a reference to the current element.
    pub fn current(&self) -> Option<&T> {
        // SAFETY: `current` is a live node of the borrowed list.
        self.current.map(|n| unsafe { &(*n.as_ptr()).value })
    }

    /// Returns a mutable reference to the current element.
    pub fn current_mut(&mut self) -> Option<&mut T> {
        // SAFETY: `current` is a live node of the exclusively borrowed list.
        self.current.map(|n| unsafe { &mut (*n.as_ptr()).value })
    }

    /// Moves to the next element; from the tail onto the ghost position, and
    /// from the ghost position onto the head.
    pub fn move_next(&mut self) {
        self.current = match self.current {
            // SAFETY: `current` is a live node of the borrowed list.
            Some(node) => unsafe { (*node.as_ptr()).next },
            None => self.list.head,
        };
    }

    /// Moves to the previous element; from the head onto the ghost position,
    /// and from the ghost position onto the tail.
    pub fn move_prev(&mut self) {
        self.current = match self.current {
            // SAFETY: `current` is a live node of the borrowed list.
            Some(node) => unsafe { (*node.as_ptr()).prev },
            None => self.list.tail,
        };
    }

    /// Inserts `value` before the current element. On the ghost position the
    /// element goes to the back. The cursor does not move.
    ///
    /// # Errors
    /// Propagates allocator failures; the list is unchanged.
    pub fn insert_before(&mut self, value: T) -> Result<(), ArenaError> {
        let (prev, next) = match self.current {
            // SAFETY: `current` is a live node of the borrowed list.
            Some(node) => (unsafe { (*node.as_ptr()).prev }, Some(node)),
            None => (self.list.tail, None),
        };
        self.list.link_between(value, prev, next).map(drop)
    }

    /// Inserts `value` after the current element. On the ghost position the
    /// element goes to the front. The cursor does not move.
    ///
    /// # Errors
    /// Propagates allocator failures; the list is unchanged.
    pub fn insert_after(&mut self, value: T) -> Result<(), ArenaError> {
        let (prev, next) = match self.current {
            // SAFETY: `current` is a live node of the borrowed list.
            Some(node) => (Some(node), unsafe { (*node.as_ptr()).next }),
            None => (None, self.list.head),
        };
        self.list.link_between(value, prev, next).map(drop)
    }

    /// Removes the current element and moves to the next one.
    /// Returns `None` on the ghost position.
    pub fn remove_current(&mut self) -> Option<T> {
        let node = self.current?;
        // SAFETY: `current` is a live node of the borrowed list.
        self.current = unsafe { (*node.as_ptr()).next };
        Some(self.list.unlink(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_basic() {
        let mut list: ChunkList<i32, 4> = ArenaList::new();
        list.push_back(1).unwrap();
        list.push_back(2).unwrap();
        list.push_front(0).unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list.front(), Some(&0));
        assert_eq!(list.back(), Some(&2));
        assert_eq!(list.pop_front(), Some(0));
        assert_eq!(list.pop_back(), Some(2));
        assert_eq!(list.pop_back(), Some(1));
        assert_eq!(list.pop_back(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_nodes_reuse_arena_slots() {
        let mut list: ChunkList<u32, 4> = ArenaList::new();
        for i in 0..6 {
            list.push_back(i).unwrap();
        }
        assert_eq!(list.allocator().chunk_count(), 2);
        assert_eq!(list.allocator().live(), 6);
        list.pop_front();
        list.pop_front();
        list.push_back(6).unwrap();
        list.push_back(7).unwrap();
        // Freed slots are found before another chunk is created.
        assert_eq!(list.allocator().chunk_count(), 2);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), [2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_zero_sized_elements_on_arena() {
        let mut list: ChunkList<(), 4> = ChunkList::new();
        for _ in 0..5 {
            list.push_back(()).unwrap();
        }
        assert_eq!(list.len(), 5);
        assert_eq!(list.allocator().chunk_count(), 2);
        assert_eq!(list.pop_front(), Some(()));
        let units: ChunkList<(), 4> = core::iter::repeat(()).take(3).collect();
        assert_eq!(units.len(), 3);
    }

    #[test]
    fn test_cursor_navigation() {
        let mut list: ChunkList<i32, 8> = [1, 2, 3].into_iter().collect();
        let mut cursor = list.cursor_front();
        assert_eq!(cursor.current(), Some(&1));
        cursor.move_next();
        assert_eq!(cursor.current(), Some(&2));
        cursor.move_next();
        cursor.move_next();
        assert!(cursor.is_ghost());
        cursor.move_next();
        assert_eq!(cursor.current(), Some(&1));
        cursor.move_prev();
        cursor.move_prev();
        assert_eq!(cursor.current(), Some(&3));
    }

    #[test]
    fn test_cursor_mutation() {
        let mut list: ChunkList<i32, 8> = [1, 3].into_iter().collect();
        let mut cursor = list.cursor_front();
        cursor.move_next(); // At 3
        cursor.insert_before(2).unwrap();
        assert_eq!(cursor.current(), Some(&3));
        cursor.insert_after(4).unwrap();
        cursor.move_prev();
        assert_eq!(cursor.current(), Some(&2));
        cursor.move_prev();
        assert_eq!(cursor.remove_current(), Some(1));
        assert_eq!(cursor.current(), Some(&2));
        *cursor.current_mut().unwrap() *= 10;

        assert_eq!(list.iter().copied().collect::<Vec<_>>(), [20, 3, 4]);
    }

    #[test]
    fn test_cursor_on_empty_list() {
        let mut list: ArenaList<&str> = ArenaList::new();
        let mut cursor = list.cursor_back();
        assert!(cursor.is_ghost());
        assert_eq!(cursor.remove_current(), None);
        cursor.insert_before("b").unwrap();
        cursor.insert_after("a").unwrap();
        cursor.insert_before("c").unwrap();
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn test_iterators_both_ends() {
        let mut list: ChunkList<i32, 3> = (1..=5).collect();
        let mut iter = list.iter();
        assert_eq!(iter.len(), 5);
        assert_eq!(iter.next(), Some(&1));
        assert_eq!(iter.next_back(), Some(&5));
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.copied().collect::<Vec<_>>(), [2, 3, 4]);

        for v in &mut list {
            *v += 1;
        }
        assert_eq!(list.iter().rev().copied().collect::<Vec<_>>(), [6, 5, 4, 3, 2]);
        assert_eq!(list.into_iter().collect::<Vec<_>>(), [2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_clone_uses_fresh_allocator() {
        let list: ChunkList<String, 4> = ["a", "b", "c"].iter().map(|s| (*s).to_owned()).collect();
        let copy = list.clone();
        assert_eq!(list, copy);
        assert_eq!(copy.allocator().live(), 3);
        assert_eq!(list.allocator().live(), 3);
    }

    #[test]
    fn test_lists_on_different_allocators_compare() {
        let on_arena: ChunkList<i32, 4> = (0..10).collect();
        let on_heap: ArenaList<i32> = (0..10).collect();
        assert_eq!(on_arena, on_heap);
        assert_eq!(format!("{on_arena:?}"), format!("{:?}", (0..10).collect::<Vec<_>>()));
    }

    #[test]
    fn test_drop_releases_every_value() {
        use std::rc::Rc;
        let shared = Rc::new(());
        {
            let mut list: ChunkList<Rc<()>, 2> = ArenaList::new();
            for _ in 0..5 {
                list.push_back(Rc::clone(&shared)).unwrap();
            }
            assert_eq!(Rc::strong_count(&shared), 6);
        }
        assert_eq!(Rc::strong_count(&shared), 1);
    }
}
