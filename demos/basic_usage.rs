//! Fills containers with factorials, once on the global allocator and once
//! on a chunk arena of ten slots per chunk, and prints the arena's usage.
//!
//! Run with `cargo run --example basic_usage`.

use anyhow::{Context, Result};
use chunk_arena::{factorial, ArenaConfig, ArenaList, ChunkArena, ChunkList, TeardownPolicy};
use std::collections::BTreeMap;

fn fill_map(map: &mut BTreeMap<u32, u64>) -> Result<()> {
    for i in 0..10 {
        let value = factorial::<u64>(i).with_context(|| format!("{i}! overflows u64"))?;
        map.insert(i, value);
    }
    Ok(())
}

fn fill_list<A: chunk_arena::RunAlloc>(list: &mut ArenaList<u64, A>) -> Result<()> {
    for i in 0..10u32 {
        list.push_back(u64::from(i)).context("list allocation failed")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut map = BTreeMap::new();
    fill_map(&mut map)?;
    for (k, v) in &map {
        println!("{k} {v}");
    }

    let mut on_heap: ArenaList<u64> = ArenaList::new();
    fill_list(&mut on_heap)?;

    let template: ChunkArena<u64, 10> =
        ChunkArena::with_config(ArenaConfig::new().with_teardown(TeardownPolicy::DropLive));
    let mut on_arena: ChunkList<u64, 10> = ArenaList::new_in(&template);
    fill_list(&mut on_arena)?;

    let line: Vec<String> = on_arena.iter().map(u64::to_string).collect();
    println!("{}", line.join(" "));
    anyhow::ensure!(on_arena == on_heap, "lists diverged");

    // A raw run of slots, filled in place.
    let mut arena: ChunkArena<u64, 10> = ChunkArena::new();
    let run = arena.allocate(6)?;
    for (offset, i) in (0..6u32).enumerate() {
        let slot = std::ptr::NonNull::new(run.as_ptr().wrapping_add(offset)).context("null slot")?;
        let value = factorial::<u64>(i).context("overflow")?;
        arena.construct(slot, value).map_err(|err| err.error())?;
    }
    let tail = arena.allocate(4)?;
    println!(
        "run of 4 follows run of 6: {}",
        tail.as_ptr() == run.as_ptr().wrapping_add(6)
    );
    println!("{}", serde_json::to_string_pretty(&arena.stats())?);

    for offset in 0..6 {
        let slot = std::ptr::NonNull::new(run.as_ptr().wrapping_add(offset)).context("null slot")?;
        arena.destroy(slot)?;
    }
    arena.deallocate(run, 6)?;
    arena.deallocate(tail, 4)?;
    println!("{}", serde_json::to_string(&on_arena.allocator().stats())?);
    Ok(())
}
