//! The process-wide runtime anchor shared by store-bridge contexts.
//!
//! A bridge implementation backed by a hosted runtime holds a
//! [`RuntimeHandle`] for as long as its context lives; the anchor is created
//! on the first acquisition and torn down when the last handle drops.

use crate::PvResult;
use std::sync::{Arc, Mutex, Weak};

lazy_static! {
    static ref RUNTIME: Mutex<Weak<StoreRuntime>> = Mutex::new(Weak::new());
}

/// A reference-counted handle on the process-wide runtime anchor.
pub type RuntimeHandle = Arc<StoreRuntime>;

/// The runtime anchor. Obtained through [`acquire`]; dropping the last
/// handle tears it down.
#[derive(Debug)]
pub struct StoreRuntime {
    _private: (),
}

impl StoreRuntime {
    fn start() -> Self {
        info!("Store runtime started");
        Self { _private: () }
    }
}

impl Drop for StoreRuntime {
    fn drop(&mut self) {
        info!("Store runtime stopped");
    }
}

/// Acquires a handle on the runtime anchor, starting it when no context
/// holds one.
pub fn acquire() -> PvResult<RuntimeHandle> {
    let mut anchor = RUNTIME.lock()?;

    if let Some(runtime) = anchor.upgrade() {
        return Ok(runtime);
    }

    let runtime = Arc::new(StoreRuntime::start());
    *anchor = Arc::downgrade(&runtime);
    Ok(runtime)
}

/// Whether any context currently holds the runtime.
pub fn is_live() -> bool {
    RUNTIME
        .lock()
        .map(|anchor| anchor.upgrade().is_some())
        .unwrap_or(false)
}
