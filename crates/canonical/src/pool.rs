//! Bounded pool of reusable [`Parser`]s.
//!
//! The pool is the backpressure valve of the tokenization pipeline: at most
//! `capacity` documents or keywords are parsed at once, and everyone else
//! waits in [`ParserPool::take`]. A wait ends with a parser or with
//! [`PoolError::Cancelled`] once the pool is closed.
//!
//! Every successful `take` must be paired with exactly one `place`. The
//! [`ParserPool::acquire`] guard does that on every exit path and is the
//! preferred entry point.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::PoolError;
use crate::token::Parser;

#[derive(Debug)]
pub struct ParserPool {
    idle: Mutex<Vec<Parser>>,
    permits: Semaphore,
    capacity: usize,
    checked_out: AtomicUsize,
}

impl ParserPool {
    /// Create a pool holding `capacity` parsers. A zero capacity is raised to
    /// one so that `take` can ever succeed.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let idle = (0..capacity).map(|_| Parser::new()).collect();
        Self {
            idle: Mutex::new(idle),
            permits: Semaphore::new(capacity),
            capacity,
            checked_out: AtomicUsize::new(0),
        }
    }

    /// Wait for a parser and take exclusive ownership of it.
    pub async fn take(&self) -> Result<Parser, PoolError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| PoolError::Cancelled)?;
        // The permit now stands for the parser we pop; `place` re-issues it.
        permit.forget();

        let parser = self.idle().pop().unwrap_or_default();
        self.checked_out.fetch_add(1, Ordering::AcqRel);
        Ok(parser)
    }

    /// Return a parser taken with [`take`](Self::take).
    ///
    /// Placing into a closed pool is accepted; the parser is kept but nobody
    /// can take it any more.
    pub fn place(&self, parser: Parser) {
        let previous = self
            .checked_out
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous.is_err() {
            warn!(capacity = self.capacity, "parser_pool_unexpected_place");
            return;
        }

        self.idle().push(parser);
        self.permits.add_permits(1);
    }

    /// Take a parser wrapped in a guard that places it back on drop.
    pub async fn acquire(&self) -> Result<PooledParser<'_>, PoolError> {
        let parser = self.take().await?;
        Ok(PooledParser { pool: self, parser })
    }

    /// Cancel every current and future wait with [`PoolError::Cancelled`].
    pub fn close(&self) {
        debug!(capacity = self.capacity, "parser_pool_closed");
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Parsers currently held by callers.
    pub fn checked_out(&self) -> usize {
        self.checked_out.load(Ordering::Acquire)
    }

    /// Parsers ready to be taken without waiting.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    fn idle(&self) -> MutexGuard<'_, Vec<Parser>> {
        // A panic while holding the lock cannot leave a Vec<Parser> in a
        // broken state, so poisoning is ignored.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A parser on loan from a [`ParserPool`]. Dereferences to [`Parser`].
#[derive(Debug)]
pub struct PooledParser<'a> {
    pool: &'a ParserPool,
    parser: Parser,
}

impl Deref for PooledParser<'_> {
    type Target = Parser;

    fn deref(&self) -> &Parser {
        &self.parser
    }
}

impl DerefMut for PooledParser<'_> {
    fn deref_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }
}

impl Drop for PooledParser<'_> {
    fn drop(&mut self) {
        self.pool.place(std::mem::take(&mut self.parser));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn take_blocks_until_place() {
        let pool = Arc::new(ParserPool::new(1));
        let held = pool.take().await.expect("first take");
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.checked_out(), 1);

        let blocked = timeout(Duration::from_millis(50), pool.take()).await;
        assert!(blocked.is_err(), "take must wait while the pool is empty");

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.take().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        pool.place(held);
        let parser = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter wakes after place")
            .expect("join")
            .expect("parser");
        assert_eq!(pool.checked_out(), 1);
        pool.place(parser);
        assert_eq!(pool.checked_out(), 0);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn close_cancels_waiters() {
        let pool = Arc::new(ParserPool::new(1));
        let held = pool.take().await.expect("take");

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.take().await })
        };
        tokio::task::yield_now().await;
        pool.close();

        let outcome = waiter.await.expect("join");
        assert_eq!(outcome.unwrap_err(), PoolError::Cancelled);
        assert!(pool.is_closed());

        pool.place(held);
        assert_eq!(pool.checked_out(), 0);
        assert_eq!(pool.take().await.unwrap_err(), PoolError::Cancelled);
    }

    #[tokio::test]
    async fn guard_places_on_drop() {
        let pool = ParserPool::new(2);
        {
            let mut parser = pool.acquire().await.expect("acquire");
            let out = parser.parse("pooled parser", None, None, true);
            assert_eq!(out.len(), 2);
            assert_eq!(pool.checked_out(), 1);
        }
        assert_eq!(pool.checked_out(), 0);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn unexpected_place_does_not_grow_pool() {
        let pool = ParserPool::new(1);
        pool.place(Parser::new());
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.checked_out(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_use_never_exceeds_capacity() {
        let pool = Arc::new(ParserPool::new(3));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..32 {
            let pool = Arc::clone(&pool);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let mut parser = pool.acquire().await.expect("acquire");
                peak.fetch_max(pool.checked_out(), Ordering::AcqRel);
                let out = parser.parse(&format!("task {i} text"), None, None, false);
                tokio::time::sleep(Duration::from_millis(2)).await;
                out.len()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.expect("join"), 3);
        }

        assert!(peak.load(Ordering::Acquire) <= 3);
        assert_eq!(pool.checked_out(), 0);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn zero_capacity_is_raised() {
        assert_eq!(ParserPool::new(0).capacity(), 1);
    }
}
