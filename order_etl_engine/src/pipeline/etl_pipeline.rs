use std::{fmt::Display, path::PathBuf, sync::Arc, time::Duration};

use log::*;
use serde_json::Value;

use crate::{
    db::traits::AnalyticsStore,
    etl::{OrderExtractor, DEFAULT_BATCH_SIZE},
    events::{processor_from, EventQueue, InMemoryEventQueue, DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE_CAPACITY},
    pipeline::{OrderProcessor, PipelineError},
    watcher::{FileWatcher, NotifyFileWatcher, RetryPolicy},
};

/// Everything needed to put a pipeline together. Read once, at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    /// Glob matched against file names, for both the bulk pass and the watcher
    pub file_pattern: String,
    pub batch_size: usize,
    pub queue_capacity: usize,
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            file_pattern: "*.json".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
        }
    }
}

/// The outcome of a startup bulk pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub extracted: usize,
    pub transformed: usize,
    pub items: usize,
}

impl Display for BulkSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} orders extracted, {} orders and {} items loaded", self.extracted, self.transformed, self.items)
    }
}

/// Wires the watcher to the queue and the queue to an [`OrderProcessor`].
///
/// Two paths lead into the store. [`EtlPipeline::run_bulk_pass`] goes straight through extract, transform and load for
/// every file already in the data directory. New files arrive through the watcher, are put on the queue, and are
/// processed one envelope at a time by the queue's consumer.
pub struct EtlPipeline<B, Q, W> {
    processor: Arc<OrderProcessor<B>>,
    queue: Arc<Q>,
    watcher: W,
    file_pattern: String,
}

impl<B, Q, W> std::fmt::Debug for EtlPipeline<B, Q, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EtlPipeline({})", self.file_pattern)
    }
}

impl<B> EtlPipeline<B, InMemoryEventQueue<Value>, NotifyFileWatcher>
where B: AnalyticsStore + 'static
{
    /// A pipeline backed by the in-memory queue and the OS filesystem watcher.
    pub fn in_memory(store: B, config: PipelineConfig) -> Result<Self, PipelineError> {
        let queue = InMemoryEventQueue::new(config.queue_capacity, config.poll_interval);
        let watcher = NotifyFileWatcher::new(&config.data_dir, &config.file_pattern, config.retry)?;
        Self::new(store, queue, watcher, config)
    }
}

impl<B, Q, W> EtlPipeline<B, Q, W>
where
    B: AnalyticsStore + 'static,
    Q: EventQueue<Value> + 'static,
    W: FileWatcher,
{
    pub fn new(store: B, queue: Q, watcher: W, config: PipelineConfig) -> Result<Self, PipelineError> {
        let extractor = OrderExtractor::new(&config.data_dir)?;
        let processor = Arc::new(OrderProcessor::new(extractor, store).with_batch_size(config.batch_size));
        let queue = Arc::new(queue);
        queue.add_processor(processor_from(Arc::clone(&processor)));
        Ok(Self { processor, queue, watcher, file_pattern: config.file_pattern })
    }

    pub fn processor(&self) -> &OrderProcessor<B> {
        &self.processor
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    /// Extract, transform and load every matching file in the data directory, bypassing the queue.
    pub async fn run_bulk_pass(&self) -> Result<BulkSummary, PipelineError> {
        info!("🚀️ Starting bulk pass over files matching '{}'", self.file_pattern);
        let orders = self.processor.extractor().extract_orders(&self.file_pattern)?;
        let (records, items) = self.processor.transformer().transform_orders(&orders);
        self.processor.loader().load_data(&records, &items, self.processor.batch_size()).await?;
        let summary = BulkSummary { extracted: orders.len(), transformed: records.len(), items: items.len() };
        info!("🚀️ Bulk pass complete. {summary}");
        Ok(summary)
    }

    /// Run the bulk pass, then start the queue consumer and the file watcher.
    ///
    /// A failed bulk pass is logged and does not stop the live loop from starting. Returns once the live loop is up;
    /// call [`EtlPipeline::stop`] to shut it down.
    pub async fn run(&self) -> Result<(), PipelineError> {
        if let Err(e) = self.run_bulk_pass().await {
            error!("🚀️ Bulk pass failed. Starting the live loop anyway. {e}");
        }
        self.queue.start();
        let queue = Arc::clone(&self.queue);
        if let Err(e) = self.watcher.start(Arc::new(move |envelope| queue.put(envelope))) {
            error!("🚀️ Could not start the file watcher. {e}");
            self.queue.stop().await;
            return Err(e.into());
        }
        info!("🚀️ Pipeline is running");
        Ok(())
    }

    pub async fn stop(&self) {
        self.watcher.stop();
        self.queue.stop().await;
        info!("🚀️ Pipeline stopped");
    }
}
