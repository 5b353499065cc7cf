//! A bounded, in-process FIFO that decouples the detection of new data from its processing.
//!
//! Producers call [`EventQueue::put`], which never blocks. When the queue is full the event is dropped and a warning
//! is logged; the producer is not told. A single consumer task takes one event at a time and hands it to every
//! registered processor in turn, so there is never more than one event in flight.
use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
        Mutex,
        RwLock,
    },
    time::Duration,
};

use futures_util::FutureExt;
use log::*;
use tokio::{
    sync::{mpsc, mpsc::error::TrySendError, Mutex as AsyncMutex, Notify},
    task::JoinHandle,
};

use crate::events::Processor;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub trait EventQueue<E>: Send + Sync {
    /// Enqueue an event without blocking. If the queue is full, the event is dropped.
    fn put(&self, event: E);

    /// Register a processor. Processors are called in registration order for every event.
    fn add_processor(&self, processor: Processor<E>);

    /// Start consuming events. Calling `start` on a running queue does nothing.
    fn start(&self);

    /// Stop consuming events and wait for the consumer to finish the event it is working on. Events still in the
    /// queue are discarded. Calling `stop` on a stopped queue does nothing.
    fn stop(&self) -> impl Future<Output = ()> + Send;
}

pub struct InMemoryEventQueue<E> {
    capacity: usize,
    poll_interval: Duration,
    sender: mpsc::Sender<E>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<E>>>,
    processors: Arc<RwLock<Vec<Processor<E>>>>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl<E> std::fmt::Debug for InMemoryEventQueue<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InMemoryEventQueue(capacity: {}, running: {})", self.capacity, self.running.load(Ordering::SeqCst))
    }
}

impl<E> Default for InMemoryEventQueue<E>
where E: Clone + Send + 'static
{
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, DEFAULT_POLL_INTERVAL)
    }
}

impl<E> InMemoryEventQueue<E>
where E: Clone + Send + 'static
{
    /// Create a queue holding at most `capacity` events (at least one). The consumer is woken as soon as `stop` is
    /// called, and in any case checks for a stop signal at least every `poll_interval`.
    pub fn new(capacity: usize, poll_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            capacity,
            poll_interval,
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
            processors: Arc::new(RwLock::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            worker: Mutex::new(None),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of events waiting to be consumed.
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The number of events dropped because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }
}

async fn consume<E: Clone + Send + 'static>(
    receiver: Arc<AsyncMutex<mpsc::Receiver<E>>>,
    processors: Arc<RwLock<Vec<Processor<E>>>>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    poll_interval: Duration,
) {
    debug!("📬️ Event queue consumer started");
    let mut receiver = receiver.lock().await;
    loop {
        // Register for the stop notification before reading the flag so that a stop in between is not missed.
        let stopped = shutdown.notified();
        tokio::pin!(stopped);
        stopped.as_mut().enable();
        if !running.load(Ordering::SeqCst) {
            break;
        }
        tokio::select! {
            biased;
            _ = &mut stopped => break,
            received = tokio::time::timeout(poll_interval, receiver.recv()) => match received {
                Err(_) => continue,
                Ok(None) => {
                    debug!("📬️ All producers have gone away");
                    break;
                },
                Ok(Some(_)) if !running.load(Ordering::SeqCst) => {
                    debug!("📬️ Event arrived after stop was requested. Discarded.");
                    break;
                },
                Ok(Some(event)) => dispatch(&processors, event).await,
            },
        }
    }
    debug!("📬️ Event queue consumer has shut down");
}

async fn dispatch<E: Clone + Send + 'static>(processors: &RwLock<Vec<Processor<E>>>, event: E) {
    let processors = match processors.read() {
        Ok(p) => p.clone(),
        Err(e) => e.into_inner().clone(),
    };
    if processors.is_empty() {
        warn!("📬️ No processors registered. Event discarded.");
        return;
    }
    for (i, processor) in processors.iter().enumerate() {
        let event = event.clone();
        let result = AssertUnwindSafe(async move { processor(event).await }).catch_unwind().await;
        match result {
            Ok(Ok(())) => trace!("📬️ Processor {i} handled event"),
            Ok(Err(e)) => error!("📬️ Processor {i} failed to handle event. {e}"),
            Err(_) => error!("📬️ Processor {i} panicked while handling event"),
        }
    }
}

impl<E> EventQueue<E> for InMemoryEventQueue<E>
where E: Clone + Send + Sync + 'static
{
    fn put(&self, event: E) {
        match self.sender.try_send(event) {
            Ok(()) => trace!("📬️ Event queued"),
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::SeqCst) + 1;
                warn!("📬️ Event queue is full ({} events). Event dropped. {dropped} events dropped so far.", self.capacity);
            },
            Err(TrySendError::Closed(_)) => error!("📬️ Event queue is closed. Event dropped."),
        }
    }

    fn add_processor(&self, processor: Processor<E>) {
        match self.processors.write() {
            Ok(mut p) => p.push(processor),
            Err(e) => e.into_inner().push(processor),
        }
    }

    fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("📬️ Event queue is already running");
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(e) => {
                error!("📬️ Cannot start the event queue outside of a tokio runtime. {e}");
                self.running.store(false, Ordering::SeqCst);
                return;
            },
        };
        let handle = runtime.spawn(consume(
            Arc::clone(&self.receiver),
            Arc::clone(&self.processors),
            Arc::clone(&self.running),
            Arc::clone(&self.shutdown),
            self.poll_interval,
        ));
        if let Ok(mut worker) = self.worker.lock() {
            *worker = Some(handle);
        }
        info!("📬️ Event queue started");
    }

    async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("📬️ Event queue is not running");
            return;
        }
        self.shutdown.notify_waiters();
        let handle = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("📬️ Event queue consumer did not shut down cleanly. {e}");
            }
        }
        let mut receiver = self.receiver.lock().await;
        let mut discarded = 0usize;
        while receiver.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            warn!("📬️ Discarded {discarded} unprocessed events");
        }
        info!("📬️ Event queue stopped");
    }
}
