//! Graceful shutdown bookkeeping shared by the server, its app and every
//! in-flight request.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, error, info};

use super::http_server::ServerHandle;
use crate::runtime_config::DEFAULT_GRACEFUL_DELAY;

/// Top bit of the state word; the remaining bits count in-flight requests.
const STOPPING: usize = 1 << (usize::BITS - 1);

pub(crate) struct Lifecycle {
    state: AtomicUsize,
    closing: AtomicBool,
    graceful_delay_ms: AtomicU64,
    closed: Mutex<bool>,
    closed_signal: Condvar,
    accept: Mutex<Option<ServerHandle>>,
}

impl Lifecycle {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: AtomicUsize::new(0),
            closing: AtomicBool::new(false),
            graceful_delay_ms: AtomicU64::new(duration_ms(DEFAULT_GRACEFUL_DELAY)),
            closed: Mutex::new(false),
            closed_signal: Condvar::new(),
            accept: Mutex::new(None),
        })
    }

    pub(crate) fn set_graceful_delay(&self, delay: Duration) {
        self.graceful_delay_ms
            .store(duration_ms(delay), Ordering::Relaxed);
    }

    pub(crate) fn graceful_delay(&self) -> Duration {
        Duration::from_millis(self.graceful_delay_ms.load(Ordering::Relaxed))
    }

    /// Count a request as in flight until the returned guard drops.
    pub(crate) fn enter(self: &Arc<Self>) -> InFlight {
        self.state.fetch_add(1, Ordering::SeqCst);
        InFlight(Arc::clone(self))
    }

    /// Install the accept loop, or stop it right away if a stop already
    /// happened.
    pub(crate) fn attach(&self, handle: ServerHandle) {
        let mut accept = self.accept.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_stopping() {
            drop(accept);
            handle.stop();
            return;
        }
        *accept = Some(handle);
    }

    /// Mark the server stopping and cancel the accept loop.
    ///
    /// The stop and the last in-flight request race on the same state word, so
    /// exactly one of them closes: the stop when nothing was in flight at that
    /// instant, otherwise the last request after the graceful delay.
    pub(crate) fn stop(self: &Arc<Self>) {
        let prev = self.state.fetch_or(STOPPING, Ordering::SeqCst);
        if prev & STOPPING != 0 {
            return;
        }
        let active = prev & !STOPPING;
        info!(active_requests = active, "Server stopping");
        let handle = self
            .accept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop();
        }
        if active == 0 {
            self.close(Duration::ZERO);
        }
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.state.load(Ordering::SeqCst) & STOPPING != 0
    }

    pub(crate) fn active_requests(&self) -> usize {
        self.state.load(Ordering::SeqCst) & !STOPPING
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block the calling thread until closure has been signalled.
    pub(crate) fn wait_closed(&self) {
        let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        while !*closed {
            closed = self
                .closed_signal
                .wait(closed)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Signal closure once, after `delay`.
    ///
    /// A non-zero delay runs on its own coroutine so the connection that
    /// finished last can still flush its response.
    fn close(self: &Arc<Self>, delay: Duration) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        if delay.is_zero() {
            self.signal_closed();
            return;
        }
        debug!(graceful_delay_ms = delay.as_millis(), "Closing after graceful delay");
        let lifecycle = Arc::clone(self);
        // SAFETY: the closure owns everything it touches (an `Arc` and a
        // `Duration`) and only sleeps and signals.
        #[allow(unsafe_code)]
        let spawned = unsafe {
            may::coroutine::Builder::new()
                .name("yawf-close".to_string())
                .spawn(move || {
                    may::coroutine::sleep(delay);
                    lifecycle.signal_closed();
                })
        };
        if let Err(err) = spawned {
            error!(error = %err, "Failed to spawn close coroutine, closing now");
            self.signal_closed();
        }
    }

    fn signal_closed(&self) {
        let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        if !*closed {
            *closed = true;
            self.closed_signal.notify_all();
            debug!("Server closure signalled");
        }
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("active", &self.active_requests())
            .field("stopping", &self.is_stopping())
            .field("graceful_delay", &self.graceful_delay())
            .finish()
    }
}

fn duration_ms(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// An in-flight request. The last one to finish during a stop closes the
/// server once the graceful delay has passed.
pub(crate) struct InFlight(Arc<Lifecycle>);

impl Drop for InFlight {
    fn drop(&mut self) {
        let prev = self.0.state.fetch_sub(1, Ordering::SeqCst);
        if prev == STOPPING | 1 {
            debug!("Last in-flight request done");
            self.0.close(self.0.graceful_delay());
        }
    }
}

/// Cloneable handle for stopping a server from handlers or other threads.
#[derive(Clone, Debug)]
pub struct ShutdownHandle(pub(crate) Arc<Lifecycle>);

impl ShutdownHandle {
    /// Stop accepting connections; closure is signalled once in-flight
    /// requests finish.
    pub fn stop(&self) {
        self.0.stop();
    }

    pub fn is_stopping(&self) -> bool {
        self.0.is_stopping()
    }

    /// Whether the server has been fully closed.
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    pub fn active_requests(&self) -> usize {
        self.0.active_requests()
    }

    /// Block until the server has closed.
    pub fn wait_closed(&self) {
        self.0.wait_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_stop_with_nothing_in_flight_closes_immediately() {
        let lifecycle = Lifecycle::new();
        lifecycle.stop();
        assert!(lifecycle.is_closed());
    }

    #[test]
    fn test_closure_waits_for_in_flight_request() {
        let lifecycle = Lifecycle::new();
        lifecycle.set_graceful_delay(Duration::from_millis(10));
        let guard = lifecycle.enter();
        lifecycle.stop();
        assert!(!lifecycle.is_closed());
        assert_eq!(lifecycle.active_requests(), 1);

        let waiter = {
            let lifecycle = Arc::clone(&lifecycle);
            thread::spawn(move || lifecycle.wait_closed())
        };
        drop(guard);
        waiter.join().unwrap();
        assert!(lifecycle.is_closed());
        assert_eq!(lifecycle.active_requests(), 0);
    }

    #[test]
    fn test_requests_finishing_before_stop_do_not_close() {
        let lifecycle = Lifecycle::new();
        drop(lifecycle.enter());
        assert!(!lifecycle.is_closed());
    }

    #[test]
    fn test_graceful_delay_runs_after_last_request() {
        let lifecycle = Lifecycle::new();
        lifecycle.set_graceful_delay(Duration::from_millis(100));
        let guard = lifecycle.enter();
        lifecycle.stop();

        let finished = Instant::now();
        drop(guard);
        assert!(!lifecycle.is_closed());
        lifecycle.wait_closed();
        assert!(finished.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_stop_and_last_request_close_exactly_once() {
        for _ in 0..100 {
            let lifecycle = Lifecycle::new();
            lifecycle.set_graceful_delay(Duration::from_millis(20));
            let guard = lifecycle.enter();

            let stopper = {
                let lifecycle = Arc::clone(&lifecycle);
                thread::spawn(move || lifecycle.stop())
            };
            drop(guard);
            stopper.join().unwrap();

            // Whichever side closes, it closes once.
            lifecycle.wait_closed();
            assert!(lifecycle.is_closed());
            assert_eq!(lifecycle.active_requests(), 0);
            assert!(lifecycle.is_stopping());
        }
    }

    #[test]
    fn test_attach_after_stop_cancels_accept_loop() {
        use crate::server::{AppService, HttpServer, Server};

        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let service = AppService::new(Server::new().into_app());
        let handle = HttpServer(service).start(addr).unwrap();

        let lifecycle = Lifecycle::new();
        lifecycle.stop();
        lifecycle.attach(handle);
        assert!(lifecycle.accept.lock().unwrap().is_none());
        assert!(std::net::TcpStream::connect(addr).is_err());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let lifecycle = Lifecycle::new();
        let guard = lifecycle.enter();
        lifecycle.stop();
        lifecycle.stop();
        assert!(lifecycle.is_stopping());
        assert_eq!(lifecycle.active_requests(), 1);
        assert!(!lifecycle.is_closed());
        lifecycle.set_graceful_delay(Duration::ZERO);
        drop(guard);
        assert!(lifecycle.is_closed());
    }
}
