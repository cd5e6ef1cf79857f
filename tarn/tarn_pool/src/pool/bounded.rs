//! The bounded resource pool.
//!
//! All accounting (`free`, `outstanding`, `capacity`, the waiter queue) lives
//! behind one pool-wide mutex. Critical sections only move values around;
//! the factory, `reset()` and `close()` always run with the lock released.
//!
//! Blocked acquires queue up by ticket. A release with waiters present hands
//! the resource straight to the oldest ticket instead of putting it back in
//! the free set, so waiters are served in arrival order and later arrivals
//! cannot overtake them.

use super::lease::{Detached, Lease};
use super::resource::{ResetOutcome, Resource};
use super::stats::PoolStats;
use crate::config::PoolConfig;
use crate::error::{
    AcquireError, BoxError, ConstructionError, ExhaustionError, MisuseError, PoolError,
};
use crate::id::{PoolId, ResourceId};
use log::{debug, info, trace, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

type Factory<R> = dyn Fn() -> Result<R, BoxError> + Send + Sync;

/// A resource that is not held by any caller
struct Idle<R> {
    sequence: u64,
    resource: R,
}

/// What a blocked acquire receives once it reaches the head of the queue
enum Grant<R> {
    /// A released resource, already counted as outstanding
    Resource(Idle<R>),

    /// A reserved slot to construct a replacement into
    Construct,

    /// The pool shut down while the caller was waiting
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaseState {
    Held,
    /// Being reset by a releasing caller
    Returning,
}

struct State<R> {
    free: VecDeque<Idle<R>>,
    outstanding: HashMap<u64, LeaseState>,
    capacity: usize,
    /// Capacity reserved by constructions running outside the lock
    pending: usize,
    waiters: VecDeque<u64>,
    grants: HashMap<u64, Grant<R>>,
    next_sequence: u64,
    next_ticket: u64,
    high_water_mark: usize,
    created: u64,
    reused: u64,
    discarded: u64,
    handoffs: u64,
    timeouts: u64,
    shutdown: bool,
}

impl<R> State<R> {
    fn new() -> Self {
        Self {
            free: VecDeque::new(),
            outstanding: HashMap::new(),
            capacity: 0,
            pending: 0,
            waiters: VecDeque::new(),
            grants: HashMap::new(),
            next_sequence: 0,
            next_ticket: 0,
            high_water_mark: 0,
            created: 0,
            reused: 0,
            discarded: 0,
            handoffs: 0,
            timeouts: 0,
            shutdown: false,
        }
    }

    fn has_room(&self, limit: Option<usize>) -> bool {
        limit.map_or(true, |max| self.capacity + self.pending < max)
    }

    /// Count a newly constructed resource and number it.
    fn admit(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.capacity += 1;
        self.created += 1;
        self.high_water_mark = self.high_water_mark.max(self.capacity);
        sequence
    }

    fn take_free(&mut self) -> Option<Idle<R>> {
        let idle = self.free.pop_front()?;
        self.outstanding.insert(idle.sequence, LeaseState::Held);
        self.reused += 1;
        Some(idle)
    }

    fn enqueue(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.waiters.push_back(ticket);
        ticket
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            free: self.free.len(),
            outstanding: self.outstanding.len(),
            capacity: self.capacity,
            waiting: self.waiters.len(),
            pending: self.pending,
            high_water_mark: self.high_water_mark,
            created: self.created,
            reused: self.reused,
            discarded: self.discarded,
            handoffs: self.handoffs,
            timeouts: self.timeouts,
        }
    }
}

pub(crate) struct Shared<R: Resource> {
    id: PoolId,
    config: PoolConfig,
    limit: Option<usize>,
    factory: Box<Factory<R>>,
    state: Mutex<State<R>>,
    /// Signalled whenever a grant is issued
    available: Condvar,
}

impl<R: Resource> Shared<R> {
    /// Put a reset resource back: hand it to the oldest waiter, or into `free`.
    fn restock(&self, state: &mut State<R>, idle: Idle<R>) {
        match state.waiters.pop_front() {
            Some(ticket) => {
                trace!(
                    "Handing resource {} to waiter {} in pool {}",
                    idle.sequence,
                    ticket,
                    self.id
                );
                state.outstanding.insert(idle.sequence, LeaseState::Held);
                state.handoffs += 1;
                state.reused += 1;
                state.grants.insert(ticket, Grant::Resource(idle));
                self.available.notify_all();
            }
            None => state.free.push_back(idle),
        }
    }

    /// Serve waiters from whatever supply exists, oldest first.
    fn dispatch(&self, state: &mut State<R>) {
        let mut granted = false;

        while let Some(&ticket) = state.waiters.front() {
            let grant = if let Some(idle) = state.take_free() {
                state.handoffs += 1;
                Grant::Resource(idle)
            } else if state.has_room(self.limit) {
                state.pending += 1;
                Grant::Construct
            } else {
                break;
            };

            state.waiters.pop_front();
            state.grants.insert(ticket, grant);
            granted = true;
        }

        if granted {
            self.available.notify_all();
        }
    }

    /// Mark an outstanding resource as returning, or say why it cannot be.
    fn check_in(&self, id: ResourceId) -> Result<(), MisuseError> {
        if id.pool() != self.id {
            warn!("Rejected resource {} returned to pool {}", id, self.id);
            return Err(MisuseError::ForeignPool(id));
        }

        let sequence = id.sequence();
        let mut state = self.state.lock();
        let issued = sequence < state.next_sequence;

        match state.outstanding.get(&sequence).copied() {
            Some(LeaseState::Held) => {
                state.outstanding.insert(sequence, LeaseState::Returning);
                Ok(())
            }
            Some(LeaseState::Returning) => {
                warn!("Resource {} released twice", id);
                Err(MisuseError::AlreadyReleased(id))
            }
            None if issued => {
                warn!("Resource {} released twice", id);
                Err(MisuseError::AlreadyReleased(id))
            }
            None => {
                warn!("Resource {} was never issued by pool {}", id, self.id);
                Err(MisuseError::NotIssued(id))
            }
        }
    }

    /// Take back an issued resource, resetting it outside the lock.
    ///
    /// A rejected resource is closed.
    pub(crate) fn give_back(&self, id: ResourceId, mut resource: R) -> Result<(), MisuseError> {
        if let Err(e) = self.check_in(id) {
            resource.close();
            return Err(e);
        }

        let sequence = id.sequence();

        // The releasing caller still owns the resource here, so reset runs unlocked.
        let outcome = resource.reset();

        let mut state = self.state.lock();
        state.outstanding.remove(&sequence);

        if state.shutdown {
            state.capacity -= 1;
            drop(state);
            trace!("Closing resource {} returned after shutdown", id);
            resource.close();
            return Ok(());
        }

        match outcome {
            ResetOutcome::Reuse => {
                self.restock(&mut state, Idle { sequence, resource });
                trace!("Resource {} returned to pool {}", sequence, self.id);
            }
            ResetOutcome::Discard => {
                state.capacity -= 1;
                state.discarded += 1;
                self.dispatch(&mut state);
                drop(state);
                debug!("Discarding resource {} that could not be reset", id);
                resource.close();
            }
        }

        Ok(())
    }
}

impl<R: Resource> Drop for Shared<R> {
    fn drop(&mut self) {
        let state = self.state.get_mut();

        if !state.outstanding.is_empty() {
            warn!(
                "Pool {} dropped with {} resources outstanding",
                self.id,
                state.outstanding.len()
            );
        }

        for mut idle in state.free.drain(..) {
            idle.resource.close();
        }
    }
}

/// A pool of reusable resources
///
/// `Pool` is a cheap, cloneable handle; every clone refers to the same pool.
/// There is no global instance: whoever needs the pool is given a handle.
///
/// # Examples
///
/// ```
/// use tarn_pool::{Pool, PoolConfig};
///
/// let pool = Pool::with_fn(PoolConfig::fail(2), Vec::<u8>::new).unwrap();
///
/// let mut buf = pool.acquire().unwrap();
/// buf.extend_from_slice(b"hello");
/// let id = buf.id();
/// pool.release(buf).unwrap();
///
/// let second = pool.acquire().unwrap();
/// let third = pool.acquire().unwrap();
/// // Resources are reused in FIFO order and come back reset.
/// assert_ne!(second.id(), id);
/// assert_eq!(third.id(), id);
/// assert!(third.is_empty());
/// assert!(pool.try_acquire().is_err());
/// ```
pub struct Pool<R: Resource> {
    shared: Arc<Shared<R>>,
}

impl<R: Resource> Clone for Pool<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: Resource> Pool<R> {
    /// Create a new resource pool, constructing `initial_size` resources eagerly.
    ///
    /// Fails if the configuration is invalid or if the factory fails for any
    /// of the eager resources.
    pub fn new<F, E>(config: PoolConfig, factory: F) -> Result<Self, PoolError>
    where
        F: Fn() -> Result<R, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        config.validate()?;

        let id = PoolId::new();
        let factory: Box<Factory<R>> = Box::new(move || factory().map_err(Into::into));

        info!(
            "Initializing resource pool {} with {} resources ({})",
            id, config.initial_size, config.policy
        );

        let mut state = State::new();
        for _ in 0..config.initial_size {
            match factory() {
                Ok(resource) => {
                    let sequence = state.admit();
                    state.free.push_back(Idle { sequence, resource });
                }
                Err(e) => {
                    warn!("Failed to create resource during initialization: {}", e);
                    for mut idle in state.free.drain(..) {
                        idle.resource.close();
                    }
                    return Err(ConstructionError::new(e).into());
                }
            }
        }

        Ok(Self {
            shared: Arc::new(Shared {
                id,
                limit: config.limit(),
                config,
                factory,
                state: Mutex::new(state),
                available: Condvar::new(),
            }),
        })
    }

    /// Create a pool from a factory that cannot fail.
    pub fn with_fn<F>(config: PoolConfig, factory: F) -> Result<Self, PoolError>
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        Self::new(config, move || Ok::<R, Infallible>(factory()))
    }

    /// Identifier of this pool
    pub fn id(&self) -> PoolId {
        self.shared.id
    }

    /// The configuration this pool was built with
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Acquire a resource, applying the pool's exhaustion policy.
    ///
    /// Block pools wait up to their configured timeout.
    pub fn acquire(&self) -> Result<Lease<R>, AcquireError> {
        self.acquire_inner(self.shared.config.policy.timeout())
    }

    /// Acquire a resource, waiting at most `timeout` on a Block pool.
    ///
    /// Fail and Grow pools never wait, so `timeout` has no effect on them.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<Lease<R>, AcquireError> {
        self.acquire_inner(Some(timeout))
    }

    /// Try to acquire a resource without waiting, whatever the policy.
    pub fn try_acquire(&self) -> Result<Lease<R>, AcquireError> {
        self.acquire_inner(None)
    }

    fn acquire_inner(&self, wait: Option<Duration>) -> Result<Lease<R>, AcquireError> {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        if state.shutdown {
            return Err(AcquireError::Shutdown);
        }

        // Arrivals may only skip the queue when nobody is waiting ahead of them.
        if state.waiters.is_empty() {
            if let Some(idle) = state.take_free() {
                trace!("Reusing resource {} from pool {}", idle.sequence, shared.id);
                return Ok(self.lease(idle));
            }

            if state.has_room(shared.limit) {
                state.pending += 1;
                drop(state);
                return self.construct();
            }
        }

        let timeout = match wait {
            Some(timeout) if shared.config.policy.may_wait() => timeout,
            _ => {
                trace!("Pool {} exhausted ({})", shared.id, shared.config.policy);
                return Err(shared.config.policy.exhausted().into());
            }
        };

        let ticket = state.enqueue();
        let deadline = Instant::now().checked_add(timeout);
        trace!("Waiting for resource in pool {} (ticket {})", shared.id, ticket);

        let mut timed_out = false;
        loop {
            // Wakes may be spurious or meant for another ticket; only a grant counts.
            if let Some(grant) = state.grants.remove(&ticket) {
                return match grant {
                    Grant::Resource(idle) => Ok(self.lease(idle)),
                    Grant::Construct => {
                        drop(state);
                        self.construct()
                    }
                    Grant::Shutdown => Err(AcquireError::Shutdown),
                };
            }

            if timed_out {
                state.waiters.retain(|waiting| *waiting != ticket);
                state.timeouts += 1;
                debug!(
                    "Acquire on pool {} timed out after {:?}",
                    shared.id, timeout
                );
                return Err(ExhaustionError::Timeout(timeout).into());
            }

            match deadline {
                Some(deadline) => {
                    timed_out = shared.available.wait_until(&mut state, deadline).timed_out();
                }
                None => shared.available.wait(&mut state),
            }
        }
    }

    /// Run the factory against capacity already reserved in `pending`.
    fn construct(&self) -> Result<Lease<R>, AcquireError> {
        let shared = &self.shared;
        let created = (shared.factory)();

        let mut state = shared.state.lock();
        state.pending -= 1;

        match created {
            Ok(mut resource) => {
                if state.shutdown {
                    drop(state);
                    resource.close();
                    return Err(AcquireError::Shutdown);
                }

                let sequence = state.admit();
                state.outstanding.insert(sequence, LeaseState::Held);
                debug!(
                    "Created resource {} in pool {} (capacity {})",
                    sequence, shared.id, state.capacity
                );
                Ok(self.lease(Idle { sequence, resource }))
            }
            Err(e) => {
                // The reservation is gone; let the next waiter try instead.
                shared.dispatch(&mut state);
                drop(state);
                warn!("Failed to create resource in pool {}: {}", shared.id, e);
                Err(ConstructionError::new(e).into())
            }
        }
    }

    fn lease(&self, idle: Idle<R>) -> Lease<R> {
        Lease::new(
            ResourceId::new(self.shared.id, idle.sequence),
            idle.resource,
            Arc::downgrade(&self.shared),
        )
    }

    /// Return a leased resource to the pool.
    ///
    /// The resource is reset before anyone else can acquire it. Leases from
    /// another pool are rejected and go back to their own pool when dropped.
    pub fn release(&self, mut lease: Lease<R>) -> Result<(), MisuseError> {
        let id = lease.id();

        if id.pool() != self.shared.id {
            warn!("Rejected lease {} released into pool {}", id, self.shared.id);
            return Err(MisuseError::ForeignPool(id));
        }

        match lease.take() {
            Some(resource) => self.shared.give_back(id, resource),
            None => Err(MisuseError::AlreadyReleased(id)),
        }
    }

    /// Return a resource previously taken out with [`Lease::detach`].
    ///
    /// Resources detached from another pool are rejected with
    /// [`MisuseError::ForeignPool`]. A rejected resource is closed and this
    /// pool is left untouched.
    pub fn restore(&self, detached: Detached<R>) -> Result<(), MisuseError> {
        let (id, resource) = detached.into_parts();
        self.shared.give_back(id, resource)
    }

    /// Shut down the pool, closing all free resources.
    ///
    /// Blocked acquires fail with [`AcquireError::Shutdown`], as do later
    /// acquires. Resources still leased are closed when they come back.
    /// Shutting down with resources outstanding is a caller error and is
    /// reported, but the shutdown still takes effect.
    pub fn shutdown(&self) -> Result<(), MisuseError> {
        info!("Shutting down resource pool {}...", self.shared.id);

        let (closing, outstanding) = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;

            if state.shutdown {
                return Ok(());
            }
            state.shutdown = true;

            let closing: Vec<R> = state.free.drain(..).map(|idle| idle.resource).collect();
            state.capacity -= closing.len();

            for ticket in state.waiters.drain(..) {
                state.grants.insert(ticket, Grant::Shutdown);
            }
            self.shared.available.notify_all();

            (closing, state.outstanding.len())
        };

        for mut resource in closing {
            resource.close();
        }

        if outstanding > 0 {
            warn!(
                "Pool {} shut down with {} resources outstanding",
                self.shared.id, outstanding
            );
            return Err(MisuseError::OutstandingAtShutdown(outstanding));
        }

        info!("Resource pool shutdown complete.");
        Ok(())
    }

    /// Whether [`Pool::shutdown`] has been called
    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().shutdown
    }

    /// Get the current number of available resources
    pub fn free_count(&self) -> usize {
        self.shared.state.lock().free.len()
    }

    /// Get the number of resources held by callers
    pub fn outstanding(&self) -> usize {
        self.shared.state.lock().outstanding.len()
    }

    /// Get the total number of live resources (available + in use)
    pub fn capacity(&self) -> usize {
        self.shared.state.lock().capacity
    }

    /// Get the number of callers blocked in acquire
    pub fn waiting(&self) -> usize {
        self.shared.state.lock().waiters.len()
    }

    /// Get the largest capacity this pool has reached
    pub fn high_water_mark(&self) -> usize {
        self.shared.state.lock().high_water_mark
    }

    /// Snapshot all counters at once
    pub fn stats(&self) -> PoolStats {
        self.shared.state.lock().stats()
    }
}

impl<R: Resource> fmt::Debug for Pool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.shared.id)
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}
