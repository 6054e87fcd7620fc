//! Bounded, blocking pool of reusable backing-store connections.
//!
//! Connections are opened lazily by a [`ConnectionFactory`] the first time a
//! caller finds no idle connection and the pool is below `max_size`. When the
//! pool is exhausted, callers block on a condition variable until a
//! connection is returned.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                              Pool<C>                                 │
//!   │                                                                      │
//!   │   Mutex<PoolState>                       Condvar `available`         │
//!   │   ┌────────────────────────────────┐     ┌────────────────────────┐  │
//!   │   │ idle:  VecDeque<C>  [c1][c2]   │     │ waiters blocked while  │  │
//!   │   │ total: 4  (idle + checked out) │     │ idle empty and         │  │
//!   │   └────────────────────────────────┘     │ total == max_size      │  │
//!   │                                          └────────────────────────┘  │
//!   │   factory: Box<dyn ConnectionFactory<C>>   (called without the lock) │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   acquire():
//!     idle non-empty         ──► pop front, return guard
//!     total < max_size       ──► total += 1, unlock, factory.connect()
//!                                  ok  ──► return guard
//!                                  err ──► total -= 1, notify_one, return err
//!     otherwise              ──► wait on `available`, retry
//!
//!   PooledConnection dropped ──► push back to idle, notify_one
//! ```
//!
//! ## Invariants
//!
//! - `idle + checked_out == total <= max_size` whenever the lock is free.
//! - Every acquired connection returns to the pool exactly once, through the
//!   guard's `Drop`, or leaves the pool's accounting through
//!   [`PooledConnection::detach`].
//!
//! ## Example
//!
//! ```
//! use cachekv::pool::Pool;
//!
//! let pool = Pool::new(2, || Ok(String::from("conn"))).unwrap();
//! {
//!     let conn = pool.acquire().unwrap();
//!     assert_eq!(conn.as_str(), "conn");
//!     assert_eq!(pool.stats().in_use(), 1);
//! }
//! assert_eq!(pool.idle_count(), 1);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::error::{AcquireError, ConfigError, ConnectionError};

/// Produces new backing-store connections for a [`Pool`].
///
/// Implemented for every `Fn() -> Result<C, ConnectionError> + Send + Sync`.
pub trait ConnectionFactory<C>: Send + Sync {
    fn connect(&self) -> Result<C, ConnectionError>;
}

impl<C, F> ConnectionFactory<C> for F
where
    F: Fn() -> Result<C, ConnectionError> + Send + Sync,
{
    fn connect(&self) -> Result<C, ConnectionError> {
        self()
    }
}

/// Point-in-time view of pool occupancy, taken under one lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub total: usize,
    pub max_size: usize,
}

impl PoolStats {
    /// Connections currently checked out.
    pub fn in_use(&self) -> usize {
        self.total - self.idle
    }
}

struct PoolState<C> {
    idle: VecDeque<C>,
    total: usize,
}

enum Checkout<C> {
    Idle(C),
    Open,
}

/// Bounded blocking pool of connections of type `C`.
pub struct Pool<C> {
    state: Mutex<PoolState<C>>,
    available: Condvar,
    max_size: usize,
    factory: Box<dyn ConnectionFactory<C>>,
}

impl<C> Pool<C> {
    /// Creates an empty pool. No connection is opened until first use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `max_size` is 0.
    pub fn new<F>(max_size: usize, factory: F) -> Result<Self, ConfigError>
    where
        F: ConnectionFactory<C> + 'static,
    {
        if max_size == 0 {
            return Err(ConfigError::new("pool max size must be greater than 0"));
        }
        Ok(Pool {
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(max_size),
                total: 0,
            }),
            available: Condvar::new(),
            max_size,
            factory: Box::new(factory),
        })
    }

    /// Takes an idle connection, opens a new one, or blocks until one is
    /// returned. Waits indefinitely.
    ///
    /// # Errors
    ///
    /// Returns the factory's [`ConnectionError`] when a new connection was
    /// needed and could not be opened. The reserved slot is released first.
    pub fn acquire(&self) -> Result<PooledConnection<'_, C>, ConnectionError> {
        let mut state = self.state.lock();
        let checkout = loop {
            if let Some(checkout) = self.try_checkout(&mut state) {
                break checkout;
            }
            trace!(max_size = self.max_size, "pool exhausted, waiting");
            self.available.wait(&mut state);
        };
        drop(state);
        self.complete(checkout)
    }

    /// Like [`acquire`](Self::acquire), but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`AcquireError::Timeout`] when no connection became available in time,
    /// [`AcquireError::Connection`] when the factory failed.
    pub fn acquire_timeout(
        &self,
        timeout: Duration,
    ) -> Result<PooledConnection<'_, C>, AcquireError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        let checkout = loop {
            if let Some(checkout) = self.try_checkout(&mut state) {
                break checkout;
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                match self.try_checkout(&mut state) {
                    Some(checkout) => break checkout,
                    None => return Err(AcquireError::Timeout(timeout)),
                }
            }
        };
        drop(state);
        Ok(self.complete(checkout)?)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Connections that exist, idle or checked out.
    pub fn total_count(&self) -> usize {
        self.state.lock().total
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            idle: state.idle.len(),
            total: state.total,
            max_size: self.max_size,
        }
    }

    fn try_checkout(&self, state: &mut PoolState<C>) -> Option<Checkout<C>> {
        if let Some(conn) = state.idle.pop_front() {
            return Some(Checkout::Idle(conn));
        }
        if state.total < self.max_size {
            state.total += 1;
            return Some(Checkout::Open);
        }
        None
    }

    fn complete(
        &self,
        checkout: Checkout<C>,
    ) -> Result<PooledConnection<'_, C>, ConnectionError> {
        match checkout {
            Checkout::Idle(conn) => Ok(PooledConnection::new(self, conn)),
            Checkout::Open => {
                let reservation = Reservation { pool: self };
                match self.factory.connect() {
                    Ok(conn) => {
                        std::mem::forget(reservation);
                        debug!(max_size = self.max_size, "opened pooled connection");
                        Ok(PooledConnection::new(self, conn))
                    },
                    Err(err) => {
                        warn!(error = %err, "connection factory failed");
                        drop(reservation);
                        Err(err)
                    },
                }
            },
        }
    }

    fn release(&self, conn: C) {
        {
            let mut state = self.state.lock();
            state.idle.push_back(conn);
        }
        self.available.notify_one();
    }

    fn forget_one(&self) {
        {
            let mut state = self.state.lock();
            state.total -= 1;
        }
        self.available.notify_one();
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let state = self.state.lock();
        assert!(state.idle.len() <= state.total);
        assert!(state.total <= self.max_size);
    }
}

impl<C> fmt::Debug for Pool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("Pool")
            .field("idle", &stats.idle)
            .field("total", &stats.total)
            .field("max_size", &stats.max_size)
            .finish_non_exhaustive()
    }
}

/// Gives back a reserved slot if opening the connection fails or panics.
struct Reservation<'a, C> {
    pool: &'a Pool<C>,
}

impl<C> Drop for Reservation<'_, C> {
    fn drop(&mut self) {
        self.pool.forget_one();
    }
}

/// Exclusive handle to a pooled connection.
///
/// Dereferences to `C`. Dropping the guard returns the connection to the pool
/// and wakes one waiter.
pub struct PooledConnection<'a, C> {
    conn: Option<C>,
    pool: &'a Pool<C>,
}

impl<'a, C> PooledConnection<'a, C> {
    fn new(pool: &'a Pool<C>, conn: C) -> Self {
        PooledConnection {
            conn: Some(conn),
            pool,
        }
    }

    /// Takes the connection out of the pool for good.
    ///
    /// The pool forgets it, freeing a slot for a fresh connection. Use this for
    /// connections known to be broken.
    pub fn detach(mut self) -> C {
        match self.conn.take() {
            Some(conn) => conn,
            // `conn` is only taken here and in `Drop`.
            None => unreachable!("pooled connection already detached"),
        }
    }
}

impl<C> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn.as_ref().expect("pooled connection present until drop")
    }
}

impl<C> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("pooled connection present until drop")
    }
}

impl<C> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        match self.conn.take() {
            Some(conn) => self.pool.release(conn),
            None => self.pool.forget_one(),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for PooledConnection<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledConnection").field(&self.conn).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    fn counting_pool(max_size: usize) -> (Pool<usize>, Arc<AtomicUsize>) {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = opened.clone();
        let pool =
            Pool::new(max_size, move || Ok(counter.fetch_add(1, Ordering::SeqCst))).unwrap();
        (pool, opened)
    }

    #[test]
    fn rejects_zero_max_size() {
        let err = Pool::<u32>::new(0, || Ok(1)).unwrap_err();
        assert!(err.message().contains("max size"));
    }

    #[test]
    fn connections_are_created_lazily() {
        let (pool, opened) = counting_pool(4);
        assert_eq!(opened.load(Ordering::SeqCst), 0);
        assert_eq!(pool.total_count(), 0);

        let conn = pool.acquire().unwrap();
        assert_eq!(*conn, 0);
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(pool.total_count(), 1);
    }

    #[test]
    fn returned_connection_is_reused() {
        let (pool, opened) = counting_pool(4);
        drop(pool.acquire().unwrap());
        drop(pool.acquire().unwrap());
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(
            pool.stats(),
            PoolStats {
                idle: 1,
                total: 1,
                max_size: 4
            }
        );
    }

    #[test]
    fn holds_several_distinct_connections() {
        let (pool, _) = counting_pool(3);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();
        let mut ids = vec![*a, *b, *c];
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(pool.stats().in_use(), 3);
        pool.debug_validate_invariants();
    }

    #[test]
    fn factory_failure_releases_slot() {
        let fail = Arc::new(AtomicBool::new(true));
        let flag = fail.clone();
        let pool = Pool::new(1, move || {
            if flag.load(Ordering::SeqCst) {
                Err(ConnectionError::new("refused"))
            } else {
                Ok(7_u32)
            }
        })
        .unwrap();

        let err = pool.acquire().unwrap_err();
        assert_eq!(err.message(), "refused");
        assert_eq!(pool.total_count(), 0);

        fail.store(false, Ordering::SeqCst);
        assert_eq!(*pool.acquire().unwrap(), 7);
    }

    #[test]
    fn detach_frees_a_slot() {
        let (pool, opened) = counting_pool(1);
        let conn = pool.acquire().unwrap();
        assert_eq!(conn.detach(), 0);
        assert_eq!(pool.total_count(), 0);

        let fresh = pool.acquire().unwrap();
        assert_eq!(*fresh, 1);
        assert_eq!(opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn acquire_blocks_until_release() {
        let (pool, _) = counting_pool(1);
        let pool = Arc::new(pool);
        let held = pool.acquire().unwrap();

        let acquired = Arc::new(AtomicBool::new(false));
        let waiter = {
            let pool = pool.clone();
            let acquired = acquired.clone();
            thread::spawn(move || {
                let conn = pool.acquire().unwrap();
                acquired.store(true, Ordering::SeqCst);
                *conn
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        drop(held);
        assert_eq!(waiter.join().unwrap(), 0);
        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(pool.total_count(), 1);
    }

    #[test]
    fn acquire_timeout_expires_when_exhausted() {
        let (pool, _) = counting_pool(1);
        let _held = pool.acquire().unwrap();
        let err = pool.acquire_timeout(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, AcquireError::Timeout(_)));
    }

    #[test]
    fn acquire_timeout_succeeds_when_idle() {
        let (pool, _) = counting_pool(1);
        drop(pool.acquire().unwrap());
        let conn = pool.acquire_timeout(Duration::from_millis(20)).unwrap();
        assert_eq!(*conn, 0);
    }

    #[test]
    fn concurrent_users_never_exceed_max_size() {
        let (pool, opened) = counting_pool(3);
        let pool = Arc::new(pool);
        let in_use = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                let in_use = in_use.clone();
                let peak = peak.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..50 {
                        let _conn = pool.acquire().unwrap();
                        let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        in_use.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(opened.load(Ordering::SeqCst) <= 3);
        assert_eq!(pool.stats().in_use(), 0);
        pool.debug_validate_invariants();
    }
}
