//! Single-assignment promises.
//!
//! A [`Promise`] starts pending and is completed exactly once, with either a
//! value or an error. Observers registered before completion are queued and run
//! on the completing thread, in registration order; observers registered
//! afterwards run immediately on the registering thread. Nothing is ever
//! delivered twice and nothing registered is ever missed.
//!
//! Promises also implement [`Future`], so async code can simply `.await` them.
//!
//! ```rust,ignore
//! let promise = Promise::<u32>::new();
//! let doubled = promise.map(|v| v * 2);
//!
//! promise.succeed(21);
//! assert_eq!(doubled.try_result(), Some(Ok(42)));
//! ```

mod when;

pub use when::when;

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::ResourceError;

type Callback<T, E> = Box<dyn FnOnce(&Result<T, E>) + Send>;

enum State<T, E> {
    Pending {
        callbacks: Vec<Callback<T, E>>,
        wakers: Vec<Waker>,
    },
    Done(Arc<Result<T, E>>),
}

/// A single-assignment asynchronous result.
///
/// Cloning a promise yields another handle to the same result. Every observer
/// borrows that one result, so values and errors must be `Send + Sync` for the
/// promise to cross threads.
pub struct Promise<T, E = ResourceError> {
    state: Arc<Mutex<State<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> Default for Promise<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Promise<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Creates a pending promise.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Pending {
                callbacks: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// Creates a promise that has already succeeded.
    pub fn succeeded(value: T) -> Self {
        Self::completed(Ok(value))
    }

    /// Creates a promise that has already failed.
    pub fn failed(error: E) -> Self {
        Self::completed(Err(error))
    }

    /// Creates a promise that is already complete.
    pub fn completed(result: Result<T, E>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Done(Arc::new(result)))),
        }
    }

    /// Completes the promise with a value.
    ///
    /// Returns `false`, leaving the promise untouched, if it was already complete.
    pub fn succeed(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Completes the promise with an error.
    ///
    /// Returns `false`, leaving the promise untouched, if it was already complete.
    pub fn fail(&self, error: E) -> bool {
        self.complete(Err(error))
    }

    /// Completes the promise, flushing every queued observer exactly once.
    pub fn complete(&self, result: Result<T, E>) -> bool {
        let (callbacks, wakers, result) = {
            let mut state = self.state.lock();
            let State::Pending { callbacks, wakers } = &mut *state else {
                trace!("Ignoring completion of an already completed promise");
                return false;
            };
            let callbacks = mem::take(callbacks);
            let wakers = mem::take(wakers);
            let result = Arc::new(result);
            *state = State::Done(Arc::clone(&result));
            (callbacks, wakers, result)
        };

        for callback in callbacks {
            callback(&result);
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Returns `true` once the promise has completed.
    pub fn is_done(&self) -> bool {
        matches!(*self.state.lock(), State::Done(_))
    }

    /// Registers an observer for the terminal result.
    pub fn on_complete<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&Result<T, E>) + Send + 'static,
    {
        let mut state = self.state.lock();
        let done = match &mut *state {
            State::Pending { callbacks, .. } => {
                callbacks.push(Box::new(f));
                return self;
            }
            State::Done(result) => Arc::clone(result),
        };
        drop(state);

        f(&done);
        self
    }

    /// Registers an observer that only runs on success.
    pub fn on_success<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.on_complete(move |result| {
            if let Ok(value) = result {
                f(value);
            }
        })
    }

    /// Registers an observer that only runs on failure.
    pub fn on_failure<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&E) + Send + 'static,
    {
        self.on_complete(move |result| {
            if let Err(error) = result {
                f(error);
            }
        })
    }

    /// Registers an observer that runs on completion regardless of outcome.
    pub fn then_always<F>(&self, f: F) -> &Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_complete(move |_| f())
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Returns a copy of the result if the promise has completed.
    pub fn try_result(&self) -> Option<Result<T, E>> {
        match &*self.state.lock() {
            State::Done(result) => Some((**result).clone()),
            State::Pending { .. } => None,
        }
    }

    /// Derives a promise whose value is `f` applied to this promise's value.
    pub fn map<U, F>(&self, f: F) -> Promise<U, E>
    where
        U: Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let derived = Promise::new();
        let target = derived.clone();
        self.on_complete(move |result| {
            target.complete(result.clone().map(f));
        });
        derived
    }

    /// Derives a promise whose error is `f` applied to this promise's error.
    pub fn map_err<E2, F>(&self, f: F) -> Promise<T, E2>
    where
        E2: Send + Sync + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        let derived = Promise::new();
        let target = derived.clone();
        self.on_complete(move |result| {
            target.complete(result.clone().map_err(f));
        });
        derived
    }

    /// Chains an asynchronous step that runs when this promise succeeds.
    pub fn then<U, F>(&self, f: F) -> Promise<U, E>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Promise<U, E> + Send + 'static,
    {
        let derived = Promise::new();
        let target = derived.clone();
        self.on_complete(move |result| match result.clone() {
            Ok(value) => {
                f(value).on_complete(move |next| {
                    target.complete(next.clone());
                });
            }
            Err(error) => {
                target.fail(error);
            }
        });
        derived
    }

    /// Chains a recovery step that runs when this promise fails.
    pub fn or_else<F>(&self, f: F) -> Promise<T, E>
    where
        F: FnOnce(E) -> Promise<T, E> + Send + 'static,
    {
        let derived = Promise::new();
        let target = derived.clone();
        self.on_complete(move |result| match result.clone() {
            Ok(value) => {
                target.succeed(value);
            }
            Err(error) => {
                f(error).on_complete(move |next| {
                    target.complete(next.clone());
                });
            }
        });
        derived
    }

    /// Runs `future` on the current tokio runtime and completes the returned
    /// promise with its output.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let promise = Self::new();
        let target = promise.clone();
        tokio::spawn(async move {
            target.complete(future.await);
        });
        promise
    }
}

impl<T, E> Future for Promise<T, E>
where
    T: Clone,
    E: Clone,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.lock();
        match &mut *state {
            State::Done(result) => Poll::Ready((**result).clone()),
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.state.lock() {
            State::Pending { callbacks, .. } => f
                .debug_struct("Promise")
                .field("state", &"pending")
                .field("observers", &callbacks.len())
                .finish(),
            State::Done(result) => f
                .debug_struct("Promise")
                .field("result", result)
                .finish(),
        }
    }
}
