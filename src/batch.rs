//! Parallel stepping of independent arenas
//!
//! Each arena steps on its own rayon worker with its own single-threaded tick
//! loop, so the results match stepping the arenas one after another. Only the
//! arena geometry is shared, and it is read-only.

use std::any::Any;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::arena::Arena;
use crate::error::ArenaError;

/// An arena that can be handed to worker threads
pub type SharedArena = Arc<Mutex<Arena>>;

/// Step every arena by `ticks` ticks in parallel
///
/// Fails before touching any arena if the same arena appears twice. If a
/// callback fails, the other arenas halt at their next tick boundary and the
/// first error in list order is returned once every worker has finished.
pub fn multi_step(arenas: &[SharedArena], ticks: u32) -> Result<(), ArenaError> {
    if arenas.is_empty() {
        return Ok(());
    }

    let mut seen = HashSet::with_capacity(arenas.len());
    for (index, arena) in arenas.iter().enumerate() {
        if !seen.insert(Arc::as_ptr(arena)) {
            log::warn!("Rejected batch: arena at index {} is a duplicate", index);
            return Err(ArenaError::DuplicateArena { index });
        }
    }

    log::debug!("Stepping {} arenas by {} ticks", arenas.len(), ticks);
    let abort = AtomicBool::new(false);
    let results: Vec<Result<(), ArenaError>> = arenas
        .par_iter()
        .enumerate()
        .map(|(index, arena)| {
            let mut arena = arena
                .lock()
                .map_err(|_| ArenaError::PoisonedArena { index })?;
            let result = arena.step_with_abort(ticks, Some(&abort));
            if result.is_err() {
                abort.store(true, Ordering::Relaxed);
            }
            result
        })
        .collect();

    results.into_iter().collect()
}

/// `multi_step` over type-erased handles; each must be a `SharedArena`
pub fn multi_step_dyn(items: &[Arc<dyn Any + Send + Sync>], ticks: u32) -> Result<(), ArenaError> {
    let arenas = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            Arc::clone(item)
                .downcast::<Mutex<Arena>>()
                .map_err(|_| ArenaError::UnexpectedType { index })
        })
        .collect::<Result<Vec<SharedArena>, _>>()?;
    multi_step(&arenas, ticks)
}
