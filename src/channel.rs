//! Result delivery.
//!
//! Every public operation produces one `Result`. A caller that also wants a
//! callback attaches a [`Listener`], which observes that same result before
//! it is returned, so the two can never disagree.

use crate::error::{Result, ScrapeError};
use std::future::Future;

/// Callback invoked with the outcome of an operation.
pub type Listener<T> = Box<dyn FnOnce(std::result::Result<&T, &ScrapeError>) + Send>;

/// Wrap a closure as a [`Listener`].
pub fn listener<T, F>(f: F) -> Listener<T>
where
    F: FnOnce(std::result::Result<&T, &ScrapeError>) + Send + 'static,
{
    Box::new(f)
}

/// Show `outcome` to `listener`, if any.
pub fn notify<T>(outcome: &Result<T>, listener: Option<Listener<T>>) {
    if let Err(e) = outcome {
        log::error!("Operation failed: {}", e);
    }
    if let Some(listener) = listener {
        listener(outcome.as_ref());
    }
}

/// Await `operation`, show its outcome to `listener`, then return it.
pub async fn deliver<T, Fut>(operation: Fut, listener: Option<Listener<T>>) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let outcome = operation.await;
    notify(&outcome, listener);
    outcome
}
