//! Recursion depth accounting for tree-walking passes.
//!
//! The visitors are mutually recursive over deeply nestable syntax, so every
//! entry point checks a shared depth counter against the configured limit.
//! `Cell` keeps the guard usable from `&mut self` visitor methods.

use std::cell::Cell;
use std::rc::Rc;

/// A shared depth counter with a configured ceiling.
#[derive(Debug)]
pub struct RecursionDepth {
    depth: Rc<Cell<usize>>,
    limit: usize,
}

impl RecursionDepth {
    pub fn new(limit: usize) -> Self {
        RecursionDepth {
            depth: Rc::new(Cell::new(0)),
            limit,
        }
    }

    /// Enter one level of recursion. Returns `None` when the limit is
    /// reached; the caller reports `CodeTooComplex` and backs out.
    pub fn enter(&self) -> Option<RecursionGuard> {
        if self.depth.get() >= self.limit {
            return None;
        }
        self.depth.set(self.depth.get() + 1);
        Some(RecursionGuard {
            depth: Rc::clone(&self.depth),
        })
    }

    pub fn current(&self) -> usize {
        self.depth.get()
    }
}

/// RAII guard returned by [`RecursionDepth::enter`]; decrements on drop.
pub struct RecursionGuard {
    depth: Rc<Cell<usize>>,
}

impl Drop for RecursionGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

#[cfg(test)]
#[path = "tests/recursion.rs"]
mod tests;
