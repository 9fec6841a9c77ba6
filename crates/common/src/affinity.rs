use std::thread::{self, ThreadId};

/// A graphics or window call arrived on a thread that does not own the context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{operation}` must run on thread {owner:?}, called from {caller:?}")]
pub struct WrongThread {
    pub operation: &'static str,
    pub owner: ThreadId,
    pub caller: ThreadId,
}

/// The thread that owns a window and its graphics context.
///
/// Captured once on the owning thread. This is a programmer-error guard, not a
/// lock: it rejects cross-thread calls, it does not serialize them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Fail with [`WrongThread`] unless called from the owning thread.
    pub fn check(&self, operation: &'static str) -> Result<(), WrongThread> {
        let caller = thread::current().id();
        if caller == self.owner {
            Ok(())
        } else {
            Err(WrongThread {
                operation,
                owner: self.owner,
                caller,
            })
        }
    }
}
