//! # Fault Guard
//!
//! Boundary around externally supplied code. A panic inside the guarded
//! future is caught and returned as a [`HandlerFault`] so it never unwinds
//! into the transport's delivery task.
//!
//! The stack is recorded by a process-wide panic hook while the panicking
//! frames are still live, then handed to the guard that catches the unwind.
//! The hook chains to whatever hook was installed before it.

use futures::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use thiserror::Error;

/// A contained panic.
#[derive(Debug, Clone, Error)]
#[error("handler panicked: {message}")]
pub struct HandlerFault {
    /// Panic payload rendered as text.
    pub message: String,
    /// `file:line:column` of the panic, when known.
    pub location: Option<String>,
    /// Stack captured at the panic site.
    pub backtrace: String,
}

struct PanicSite {
    location: Option<String>,
    backtrace: String,
}

thread_local! {
    /// Number of guarded polls active on this thread.
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) > 0 {
                let site = PanicSite {
                    location: info.location().map(ToString::to_string),
                    backtrace: Backtrace::force_capture().to_string(),
                };
                LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(site));
            }
            previous(info);
        }));
    });
}

/// Marks the current thread as polling guarded code until dropped.
struct Armed;

impl Armed {
    fn enter() -> Self {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Armed
    }
}

impl Drop for Armed {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

impl HandlerFault {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        // Falls back to the catch site if another hook replaced ours.
        let site = LAST_PANIC
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| PanicSite {
                location: None,
                backtrace: Backtrace::force_capture().to_string(),
            });

        Self {
            message,
            location: site.location,
            backtrace: site.backtrace,
        }
    }
}

/// Poll `future` to completion, converting a panic into `Err`.
pub async fn contain<F, T>(future: F) -> Result<T, HandlerFault>
where
    F: Future<Output = T>,
{
    install_panic_hook();

    let mut guarded = std::pin::pin!(AssertUnwindSafe(future).catch_unwind());
    std::future::poll_fn(|cx| {
        let _armed = Armed::enter();
        guarded
            .as_mut()
            .poll(cx)
            .map(|r| r.map_err(HandlerFault::from_panic))
    })
    .await
}
