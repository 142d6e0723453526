//! Small object pool guarded by a compare-and-swap gate.
//!
//! `try_pop` / `try_push` never block: if another thread holds the gate they
//! give up and the caller allocates (or drops) instead. The pool only caches
//! objects, so losing a race costs an allocation, not correctness.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct ObjectPool<T> {
    gate: AtomicBool,
    items: UnsafeCell<Vec<T>>,
    max_size: usize,
}

// SAFETY: `items` is only touched while `gate` is held, which gives
// exclusive access across threads; items move in and out by value.
unsafe impl<T: Send> Sync for ObjectPool<T> {}

struct GateGuard<'a>(&'a AtomicBool);

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T> ObjectPool<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            gate: AtomicBool::new(false),
            items: UnsafeCell::new(Vec::new()),
            max_size,
        }
    }

    #[inline]
    fn try_enter(&self) -> Option<GateGuard<'_>> {
        self.gate
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| GateGuard(&self.gate))
    }

    /// Take a pooled object. `None` when empty or contended.
    pub fn try_pop(&self) -> Option<T> {
        let _guard = self.try_enter()?;
        // SAFETY: gate held.
        unsafe { (*self.items.get()).pop() }
    }

    /// Return an object. Gives it back (`Err`) when full or contended.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let Some(_guard) = self.try_enter() else {
            return Err(item);
        };
        // SAFETY: gate held.
        let items = unsafe { &mut *self.items.get() };
        if items.len() >= self.max_size {
            return Err(item);
        }
        items.push(item);
        Ok(())
    }

    /// Pooled object count; 0 when contended.
    pub fn len(&self) -> usize {
        match self.try_enter() {
            // SAFETY: gate held.
            Some(_guard) => unsafe { (*self.items.get()).len() },
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("len", &self.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn push_pop_respects_max_size() {
        let pool = ObjectPool::new(2);
        assert!(pool.try_push(1).is_ok());
        assert!(pool.try_push(2).is_ok());
        assert_eq!(pool.try_push(3), Err(3));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.try_pop(), Some(2));
        assert_eq!(pool.try_pop(), Some(1));
        assert_eq!(pool.try_pop(), None);
    }

    #[test]
    fn contended_gate_fails_fast() {
        let pool = ObjectPool::new(4);
        let guard = pool.try_enter().expect("gate free");
        assert_eq!(pool.try_push(7), Err(7));
        assert_eq!(pool.try_pop(), None);
        drop(guard);
        assert!(pool.try_push(7).is_ok());
    }

    #[test]
    fn shared_across_threads() {
        let pool = Arc::new(ObjectPool::new(1024));
        let workers: Vec<_> = (0..4)
            .map(|t| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    let mut pushed = 0usize;
                    for i in 0..100 {
                        if pool.try_push(t * 100 + i).is_ok() {
                            pushed += 1;
                        }
                    }
                    pushed
                })
            })
            .collect();
        let pushed: usize = workers
            .into_iter()
            .map(|w| w.join().expect("worker"))
            .sum();
        let mut popped = 0;
        while pool.try_pop().is_some() {
            popped += 1;
        }
        assert_eq!(pushed, popped);
    }
}
