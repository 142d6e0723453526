//! Awaiting a motion.
//!
//! [`Engine::completion`](crate::Engine::completion) hands out a [`Completion`]
//! future that resolves when the motion completes or is canceled. The engine
//! keeps one end of a shared cell in the callback registry and resolves it
//! from the same place `on_complete` / `on_cancel` fire. `Completion` is
//! `Send`, so it can be awaited on another executor while the engine keeps
//! ticking on the main thread.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use serde::{Deserialize, Serialize};

use crate::pool::ObjectPool;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionStatus {
    Completed,
    Canceled,
}

#[derive(Debug, Default)]
struct CellState {
    result: Option<CompletionStatus>,
    waker: Option<Waker>,
}

#[derive(Debug, Default)]
pub(crate) struct CompletionCell {
    state: Mutex<CellState>,
}

impl CompletionCell {
    pub(crate) fn resolve(&self, status: CompletionStatus) {
        let waker = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.result.is_some() {
                return;
            }
            state.result = Some(status);
            state.waker.take()
        };
        if let Some(w) = waker {
            w.wake();
        }
    }

    fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.result = None;
        state.waker = None;
    }

    fn result(&self) -> Option<CompletionStatus> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).result
    }
}

pub(crate) type CompletionPool = ObjectPool<Arc<CompletionCell>>;

/// Hand a cell back to the pool once nobody else can observe it.
pub(crate) fn recycle(pool: &CompletionPool, cell: Arc<CompletionCell>) {
    if Arc::strong_count(&cell) == 1 {
        cell.reset();
        // Full or contended pool: just drop the cell.
        let _ = pool.try_push(cell);
    }
}

/// Take a fresh cell from the pool (or allocate one).
pub(crate) fn acquire(pool: &CompletionPool) -> Arc<CompletionCell> {
    pool.try_pop().unwrap_or_default()
}

/// Resolves to how the awaited motion ended.
#[derive(Debug)]
pub struct Completion {
    cell: Option<Arc<CompletionCell>>,
    pool: Arc<CompletionPool>,
}

impl Completion {
    pub(crate) fn pending(cell: Arc<CompletionCell>, pool: Arc<CompletionPool>) -> Self {
        Self {
            cell: Some(cell),
            pool,
        }
    }

    pub(crate) fn ready(status: CompletionStatus, pool: Arc<CompletionPool>) -> Self {
        let cell = acquire(&pool);
        cell.resolve(status);
        Self::pending(cell, pool)
    }

    /// Non-blocking check, for hosts that poll instead of awaiting.
    pub fn status(&self) -> Option<CompletionStatus> {
        self.cell.as_ref().and_then(|c| c.result())
    }

    pub fn is_done(&self) -> bool {
        self.status().is_some()
    }
}

impl Future for Completion {
    type Output = CompletionStatus;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(cell) = self.cell.as_ref() else {
            return Poll::Ready(CompletionStatus::Canceled);
        };
        let mut state = cell.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.result {
            Some(status) => Poll::Ready(status),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.take() {
            recycle(&self.pool, cell);
        }
    }
}
