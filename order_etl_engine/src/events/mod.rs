mod processor;
mod queue;

pub use processor::{processor_from, EventProcessor, Processor, ProcessorError, ProcessorFuture};
pub use queue::{EventQueue, InMemoryEventQueue, DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE_CAPACITY};
