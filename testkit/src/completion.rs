//! A countdown latch shared by one or more call expectations.
//!
//! # Design
//! The outstanding count lives behind a `Mutex`. Blocking waiters park on a
//! `Condvar`; async waiters park on a tokio `Notify`. Both are woken when the
//! count reaches zero. Totals are added while expectations are registered,
//! before traffic starts, and each accepted call takes one unit off.

use std::{
    pin::pin,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use tokio::sync::Notify;

/// Handle to a shared countdown. Clones refer to the same counter.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    inner: Arc<Latch>,
}

#[derive(Debug, Default)]
struct Latch {
    remaining: Mutex<usize>,
    zero: Condvar,
    notify: Notify,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the outstanding count by `count`.
    pub fn add(&self, count: usize) {
        *self.lock() += count;
    }

    /// Take one unit off the count, waking waiters when it reaches zero.
    ///
    /// Returns `false` if the count was already zero; the signal is then
    /// dropped.
    pub(crate) fn signal(&self) -> bool {
        let mut remaining = self.lock();
        if *remaining == 0 {
            tracing::warn!("completion signalled past zero");
            return false;
        }
        *remaining -= 1;
        if *remaining == 0 {
            drop(remaining);
            self.inner.zero.notify_all();
            self.inner.notify.notify_waiters();
        }
        true
    }

    pub fn remaining(&self) -> usize {
        *self.lock()
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Block the current thread until the count reaches zero.
    ///
    /// There is no timeout; prefer [`wait_timeout`](Self::wait_timeout) in
    /// tests.
    pub fn wait(&self) {
        let mut remaining = self.lock();
        while *remaining > 0 {
            remaining = self
                .inner
                .zero
                .wait(remaining)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the count reaches zero or `timeout` elapses. Returns
    /// whether the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut remaining = self.lock();
        while *remaining > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            remaining = self
                .inner
                .zero
                .wait_timeout(remaining, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Wait asynchronously until the count reaches zero.
    pub async fn wait_async(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            notified.as_mut().enable();
            if self.is_complete() {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.inner
            .remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
