//! Deadline and cancellation plumbing shared by every transport call.
//!
//! A [Context] is cheap to clone. Children created with
//! [Context::with_timeout] or [Context::with_cancel] observe the
//! cancellation and deadline of all their ancestors, and a child deadline
//! never extends past its parent's.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{after, bounded, never, select, Receiver};
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;
use tracing::warn;

/// Number of threads running calls made through [call_with_timeout].
pub const CALL_POOL_SIZE: usize = 64;

fn call_pool() -> Option<&'static ThreadPool> {
    static POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();
    POOL.get_or_init(|| {
        ThreadPoolBuilder::new()
            .num_threads(CALL_POOL_SIZE)
            .thread_name(|index| format!("eigenda-call-{}", index))
            .build()
            .map_err(|err| warn!(error = %err, "failed to build call pool, using the global pool"))
            .ok()
    })
    .as_ref()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug)]
struct ContextInner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
}

#[derive(Clone, Debug)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A root context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                cancelled: AtomicBool::new(false),
                deadline: None,
                parent: None,
            }),
        }
    }

    fn child(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent: Some(self.clone()),
            }),
        }
    }

    /// A child that expires after `timeout`, or at the parent deadline if
    /// that comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now() + timeout;
        let deadline = match self.deadline() {
            Some(parent) if parent < own => parent,
            _ => own,
        };
        self.child(Some(deadline))
    }

    /// A child that can be cancelled without affecting this context.
    pub fn with_cancel(&self) -> Self {
        self.child(self.deadline())
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        match &self.inner.parent {
            Some(parent) => parent.is_cancelled(),
            None => false,
        }
    }

    /// Why the context is done, if it is.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline() {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Returns `Err` once the context is done.
    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// A channel that fires at the deadline, or never.
    pub fn deadline_channel(&self) -> Receiver<Instant> {
        match self.remaining() {
            Some(remaining) => after(remaining),
            None => never(),
        }
    }

    /// Sleeps for `duration` or until the context is done, whichever comes
    /// first.
    pub fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        let step = Duration::from_millis(5);
        let end = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= end {
                return Ok(());
            }
            thread::sleep(step.min(end - now));
        }
    }
}

/// Runs `call` on the call pool with a child of `ctx` that expires after
/// `timeout`, and stops waiting once that child is done.
///
/// Collaborators are expected to honour the context they are handed. If
/// one does not, it keeps its pool thread until it returns and its result
/// is dropped. The pool holds [CALL_POOL_SIZE] threads, so such calls
/// queue up behind each other rather than piling up threads.
pub fn call_with_timeout<T, E, F>(ctx: &Context, timeout: Duration, call: F) -> Result<T, E>
where
    T: Send + 'static,
    E: From<ContextError> + Send + 'static,
    F: FnOnce(Context) -> Result<T, E> + Send + 'static,
{
    let timeout_ctx = ctx.with_timeout(timeout);
    let (sender, receiver) = bounded(1);
    let call_ctx = timeout_ctx.clone();
    let job = move || {
        let _ = sender.send(call(call_ctx));
    };
    match call_pool() {
        Some(pool) => pool.spawn(job),
        None => rayon::spawn(job),
    }

    let deadline = timeout_ctx.deadline_channel();
    loop {
        select! {
            recv(receiver) -> result => {
                return match result {
                    Ok(result) => result,
                    Err(_) => Err(E::from(ContextError::Cancelled)),
                };
            }
            recv(deadline) -> _ => {
                timeout_ctx.cancel();
                return Err(E::from(ContextError::DeadlineExceeded));
            }
            default(Duration::from_millis(10)) => {
                if let Some(err) = timeout_ctx.err() {
                    timeout_ctx.cancel();
                    return Err(E::from(err));
                }
            }
        }
    }
}
