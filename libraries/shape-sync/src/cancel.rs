use std::{
    cell::{Cell, RefCell},
    future::Future,
};

use futures::future::{AbortHandle, Abortable, Aborted};
use slotmap::SlotMap;

use crate::store::StoreError;

slotmap::new_key_type! {
    struct CallKey;
}

/// Tracks in-flight store calls so they can all be aborted at teardown.
///
/// Once cancelled, the scope stays closed: later calls fail with
/// [`StoreError::Cancelled`] without starting.
#[derive(Default)]
pub struct CancelScope {
    in_flight: RefCell<SlotMap<CallKey, AbortHandle>>,
    closed: Cell<bool>,
}

impl CancelScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        if self.closed.get() {
            return Err(StoreError::Cancelled);
        }

        let (handle, registration) = AbortHandle::new_pair();
        let key = self.in_flight.borrow_mut().insert(handle);
        let result = Abortable::new(call, registration).await;
        self.in_flight.borrow_mut().remove(key);

        match result {
            Ok(result) => result,
            Err(Aborted) => Err(StoreError::Cancelled),
        }
    }

    pub fn cancel_all(&self) {
        self.closed.set(true);
        let handles = std::mem::take(&mut *self.in_flight.borrow_mut());
        if !handles.is_empty() {
            log::info!("Cancelling {} in-flight request(s)", handles.len());
        }
        for (_, handle) in handles {
            handle.abort();
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.borrow().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}
