//! Bookkeeping for in-flight requests so they can be cancelled as a group.

use parking_lot::{Mutex, ReentrantMutex};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

struct Inner {
    token: CancellationToken,
    handles: Vec<AbortHandle>,
}

/// Tracks every spawned request. Cancelling clears the set and leaves the
/// registry ready for new requests.
pub struct RequestRegistry {
    inner: Mutex<Inner>,
    // Held while a callback runs. Reentrant so a callback may cancel or
    // issue new requests on its own thread.
    delivery: ReentrantMutex<()>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                token: CancellationToken::new(),
                handles: Vec::new(),
            }),
            delivery: ReentrantMutex::new(()),
        }
    }

    /// Token for a new request. It fires when the current generation is cleared.
    pub fn token(&self) -> CancellationToken {
        self.inner.lock().token.child_token()
    }

    pub fn register(&self, handle: AbortHandle) {
        let mut inner = self.inner.lock();
        inner.handles.retain(|h| !h.is_finished());
        inner.handles.push(handle);
    }

    /// Run `deliver` unless `token` has been cancelled. Returns whether it ran.
    ///
    /// `clear()` waits for a running delivery, so once it returns no callback
    /// of the cleared generation can start.
    pub fn deliver_if_current<F>(&self, token: &CancellationToken, deliver: F) -> bool
    where
        F: FnOnce(),
    {
        let _guard = self.delivery.lock();
        if token.is_cancelled() {
            return false;
        }
        deliver();
        true
    }

    /// Cancel and abort everything registered so far. Returns how many
    /// requests were still running.
    pub fn clear(&self) -> usize {
        let (token, handles) = {
            let mut inner = self.inner.lock();
            let token = std::mem::replace(&mut inner.token, CancellationToken::new());
            (token, std::mem::take(&mut inner.handles))
        };

        {
            let _guard = self.delivery.lock();
            token.cancel();
        }

        let mut running = 0;
        for handle in handles {
            if !handle.is_finished() {
                running += 1;
                handle.abort();
            }
        }
        running
    }

    /// Number of requests still running.
    pub fn pending(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.handles.retain(|h| !h.is_finished());
        inner.handles.len()
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}
