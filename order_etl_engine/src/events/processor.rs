use std::{future::Future, pin::Pin, sync::Arc};

use thiserror::Error;

/// A processor failed to handle an event. The queue logs it and moves on to the next processor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProcessorError(pub String);

impl From<String> for ProcessorError {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ProcessorError {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

pub type ProcessorFuture = Pin<Box<dyn Future<Output = Result<(), ProcessorError>> + Send>>;

/// A callback that the queue invokes for every event it dequeues.
pub type Processor<E> = Arc<dyn Fn(E) -> ProcessorFuture + Send + Sync>;

/// Anything that consumes events from a queue.
pub trait EventProcessor<E>: Send + Sync + 'static {
    fn process(&self, event: E) -> impl Future<Output = Result<(), ProcessorError>> + Send;
}

/// Wraps an [`EventProcessor`] so that it can be registered with a queue.
pub fn processor_from<E, P>(processor: Arc<P>) -> Processor<E>
where
    E: Send + 'static,
    P: EventProcessor<E>,
{
    Arc::new(move |event| {
        let processor = Arc::clone(&processor);
        Box::pin(async move { processor.process(event).await }) as ProcessorFuture
    })
}
