//! Consent prompts the test answers later.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

#[derive(Default)]
struct GateCore {
    released: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

/// Holds a permission request pending until [`release`](Self::release).
#[derive(Clone, Default)]
pub struct PromptGate {
    core: Rc<GateCore>,
}

impl PromptGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the held request resolve according to the script.
    pub fn release(&self) {
        self.core.released.set(true);
        if let Some(waker) = self.core.waker.borrow_mut().take() {
            waker.wake();
        }
    }

    pub fn is_released(&self) -> bool {
        self.core.released.get()
    }

    pub(crate) fn wait(&self) -> GateWait {
        GateWait {
            core: self.core.clone(),
        }
    }
}

pub(crate) struct GateWait {
    core: Rc<GateCore>,
}

impl Future for GateWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.core.released.get() {
            return Poll::Ready(());
        }
        *self.core.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_completes_after_release() {
        let gate = PromptGate::new();
        let waiter = gate.clone();
        tokio::join!(
            async {
                tokio::task::yield_now().await;
                assert!(!gate.is_released());
                gate.release();
            },
            waiter.wait()
        );
        assert!(gate.is_released());
    }
}
