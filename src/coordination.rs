//! Coordination context marker and the synchronous wait helper.
//!
//! Screenlet state is only mutated while a screenlet processes its
//! completion queue. That code runs inside a [`CoordinationGuard`], and the
//! blocking helpers below refuse to run there: a coordination context that
//! blocks waiting for a completion would never deliver it.

use std::cell::Cell;

use tokio::sync::oneshot;

thread_local! {
    static IN_COORDINATION: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running a coordination context.
pub struct CoordinationGuard {
    previous: bool,
}

/// Enter a coordination context until the guard is dropped.
pub fn enter() -> CoordinationGuard {
    let previous = IN_COORDINATION.with(|flag| flag.replace(true));
    CoordinationGuard { previous }
}

impl Drop for CoordinationGuard {
    fn drop(&mut self) {
        IN_COORDINATION.with(|flag| flag.set(self.previous));
    }
}

pub fn is_coordination_context() -> bool {
    IN_COORDINATION.with(Cell::get)
}

/// One-shot reply slot handed to callback-style code.
pub struct Reply<T>(oneshot::Sender<T>);

impl<T> Reply<T> {
    /// Deliver the value. Returns false if nobody waits any more.
    pub fn send(self, value: T) -> bool {
        self.0.send(value).is_ok()
    }
}

/// Completion signal without a value.
pub type Signal = Reply<()>;

impl Signal {
    pub fn fire(self) -> bool {
        self.send(())
    }
}

/// Block the calling thread until `start` replies.
///
/// Returns `None` if the reply slot was dropped without a value.
///
/// # Panics
/// Panics when called from a coordination context, and (through tokio)
/// when called from inside an async runtime.
pub fn wait_for<T, F>(start: F) -> Option<T>
where
    F: FnOnce(Reply<T>),
{
    assert!(
        !is_coordination_context(),
        "wait_for called from a coordination context"
    );

    let (sender, receiver) = oneshot::channel();
    start(Reply(sender));
    receiver.blocking_recv().ok()
}

/// Block until `start` fires the signal. Returns false if it never will.
pub fn wait_for_signal<F>(start: F) -> bool
where
    F: FnOnce(Signal),
{
    wait_for(start).is_some()
}
