use chunk_arena::{ArenaConfig, ArenaError, ChunkArena};
use proptest::prelude::*;
use std::ptr::NonNull;

const C: usize = 10;

#[derive(Debug, Clone)]
enum Operation {
    Allocate(usize),
    Deallocate(usize),
    Construct(usize, u32),
}

/// Slot-level model: one `Vec<bool>` per chunk, oldest first.
#[derive(Default)]
struct Model {
    chunks: Vec<Vec<bool>>,
    bases: Vec<NonNull<u32>>,
}

impl Model {
    fn first_fit(slots: &[bool], n: usize) -> Option<usize> {
        (0..=C - n).find(|&start| slots[start..start + n].iter().all(|used| !used))
    }

    /// Where `allocate(n)` must land: `(chunk, offset)`, with `chunk == len`
    /// meaning a new chunk.
    fn placement(&self, n: usize) -> (usize, usize) {
        for (index, slots) in self.chunks.iter().enumerate().rev() {
            if let Some(offset) = Self::first_fit(slots, n) {
                return (index, offset);
            }
        }
        (self.chunks.len(), 0)
    }

    fn reserved(&self) -> usize {
        self.chunks.iter().flatten().filter(|used| **used).count()
    }
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (0..=C + 1).prop_map(Operation::Allocate),
        2 => any::<usize>().prop_map(Operation::Deallocate),
        1 => (any::<usize>(), any::<u32>()).prop_map(|(i, v)| Operation::Construct(i, v)),
    ]
}

proptest! {
    #[test]
    fn test_arena_matches_slot_model(
        ops in proptest::collection::vec(operation(), 1..200),
        track_runs in any::<bool>(),
    ) {
        let mut arena: ChunkArena<u32, C> =
            ChunkArena::with_config(ArenaConfig::new().with_run_tracking(track_runs));
        let mut model = Model::default();
        // Outstanding runs: (ptr, len, chunk, offset, constructed value).
        let mut runs: Vec<(NonNull<u32>, usize, usize, usize, Option<u32>)> = Vec::new();

        for op in ops {
            match op {
                Operation::Allocate(n) if n > C => {
                    prop_assert_eq!(
                        arena.allocate(n),
                        Err(ArenaError::CapacityExceeded { requested: n, capacity: C })
                    );
                }
                Operation::Allocate(0) => {
                    prop_assert!(arena.allocate(0).is_ok());
                }
                Operation::Allocate(n) => {
                    let (chunk, offset) = model.placement(n);
                    let ptr = arena.allocate(n).unwrap();
                    if chunk == model.chunks.len() {
                        model.chunks.push(vec![false; C]);
                        model.bases.push(ptr);
                    }
                    let expected = model.bases[chunk].as_ptr().wrapping_add(offset);
                    prop_assert_eq!(ptr.as_ptr(), expected, "allocate({}) misplaced", n);
                    model.chunks[chunk][offset..offset + n].fill(true);
                    runs.push((ptr, n, chunk, offset, None));
                }
                Operation::Deallocate(pick) => {
                    if runs.is_empty() {
                        continue;
                    }
                    let (ptr, n, chunk, offset, value) = runs.swap_remove(pick % runs.len());
                    if let Some(v) = value {
                        prop_assert_eq!(arena.take(ptr), Ok(v));
                    }
                    prop_assert_eq!(arena.deallocate(ptr, n), Ok(()));
                    model.chunks[chunk][offset..offset + n].fill(false);
                    // A second release of the same run always fails.
                    prop_assert!(arena.deallocate(ptr, n).is_err());
                }
                Operation::Construct(pick, v) => {
                    if runs.is_empty() {
                        continue;
                    }
                    let index = pick % runs.len();
                    let (ptr, _, _, offset, value) = runs[index];
                    if value.is_some() {
                        let err = arena.construct(ptr, v).unwrap_err();
                        prop_assert_eq!(err.error(), ArenaError::AlreadyConstructed { offset });
                    } else {
                        arena.construct(ptr, v).unwrap();
                        runs[index].4 = Some(v);
                    }
                }
            }

            prop_assert_eq!(arena.chunk_count(), model.chunks.len());
            prop_assert_eq!(arena.reserved(), model.reserved());
        }

        for (ptr, _, _, _, value) in &runs {
            prop_assert_eq!(arena.get(*ptr).copied(), *value);
        }
    }

    #[test]
    fn test_crossing_release_never_mutates(lead in 1..C, extra in 1..=C) {
        let mut arena: ChunkArena<u64, C> = ChunkArena::new();
        arena.allocate(lead).unwrap();
        let tail = arena.allocate(C - lead).unwrap();
        let before = arena.stats();

        let err = arena.deallocate(tail, C - lead + extra).unwrap_err();
        prop_assert_eq!(err, ArenaError::RunOutOfBounds { offset: lead, len: C - lead + extra, capacity: C });
        prop_assert_eq!(arena.stats(), before);
    }
}
