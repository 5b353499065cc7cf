use std::fmt::{Debug, Display};

use log::*;
use serde_json::Value;

use crate::{
    db::traits::AnalyticsStore,
    etl::{envelope_orders, OrderExtractor, OrderLoader, OrderTransformer, DEFAULT_BATCH_SIZE},
    events::{EventProcessor, ProcessorError},
};

/// What happened to one batch of raw orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Raw orders found in the envelope
    pub received: usize,
    /// Orders that passed extraction
    pub extracted: usize,
    /// Orders that passed extraction and transformation
    pub transformed: usize,
    /// Orders dropped during extraction or transformation
    pub rejected: usize,
    /// Orders written to the store. Zero if the load failed.
    pub loaded: usize,
}

impl Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} received, {} extracted, {} transformed, {} rejected, {} loaded",
            self.received, self.extracted, self.transformed, self.rejected, self.loaded
        )
    }
}

/// Consumes export envelopes from the event queue and runs them through extract, transform and load.
///
/// Nothing in here returns an error. Every failure is logged and reflected in the [`BatchReport`] instead, since the
/// processor runs inside the queue's consumer loop and there is nobody upstream to report to.
pub struct OrderProcessor<B> {
    extractor: OrderExtractor,
    transformer: OrderTransformer,
    loader: OrderLoader<B>,
    batch_size: usize,
}

impl<B> Debug for OrderProcessor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderProcessor(batch_size: {})", self.batch_size)
    }
}

impl<B> OrderProcessor<B> {
    pub fn new(extractor: OrderExtractor, store: B) -> Self {
        Self { extractor, transformer: OrderTransformer::new(), loader: OrderLoader::new(store), batch_size: DEFAULT_BATCH_SIZE }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn extractor(&self) -> &OrderExtractor {
        &self.extractor
    }

    pub fn transformer(&self) -> &OrderTransformer {
        &self.transformer
    }

    pub fn loader(&self) -> &OrderLoader<B> {
        &self.loader
    }
}

impl<B> OrderProcessor<B>
where B: AnalyticsStore
{
    /// Process every order in an export envelope as one batch, with a single load at the end.
    pub async fn process_event(&self, envelope: Value) -> BatchReport {
        let orders = match envelope_orders(&envelope) {
            Ok(orders) => orders,
            Err(e) => {
                error!("📦️ Discarding event. {e}");
                return BatchReport::default();
            },
        };
        let report = self.process_orders(orders).await;
        info!("📦️ Event processed: {report}");
        report
    }

    /// Extract, transform and load a single raw order.
    pub async fn process_order(&self, raw: &Value) -> BatchReport {
        let report = self.process_orders(std::slice::from_ref(raw)).await;
        debug!("📦️ Single order processed: {report}");
        report
    }

    async fn process_orders(&self, raw_orders: &[Value]) -> BatchReport {
        let mut report = BatchReport { received: raw_orders.len(), ..Default::default() };
        let mut records = Vec::with_capacity(raw_orders.len());
        let mut items = Vec::new();
        for (i, raw) in raw_orders.iter().enumerate() {
            if !raw.is_object() {
                report.rejected += 1;
                error!("📦️ Order at position {i} is not a JSON object. Skipping it.");
                continue;
            }
            if raw.get("id").map_or(true, Value::is_null) {
                report.rejected += 1;
                error!("📦️ Order at position {i} has no id. Skipping it.");
                continue;
            }
            let order = match self.extractor.extract_order(raw) {
                Ok(order) => order,
                Err(e) => {
                    report.rejected += 1;
                    error!("📦️ {e}");
                    continue;
                },
            };
            report.extracted += 1;
            match self.transformer.transform_with_items(&order) {
                Ok((record, order_items)) => {
                    report.transformed += 1;
                    records.push(record);
                    items.extend(order_items);
                },
                Err(e) => {
                    report.rejected += 1;
                    error!("📦️ {e}");
                },
            }
        }
        if records.is_empty() {
            info!(
                "📦️ Nothing to load from batch of {}. {} orders failed extraction, {} failed transformation.",
                report.received,
                report.received - report.extracted,
                report.extracted - report.transformed
            );
            return report;
        }
        match self.loader.load_data(&records, &items, self.batch_size).await {
            Ok(()) => report.loaded = records.len(),
            Err(e) => error!("📦️ Batch of {} orders was not loaded and has been discarded. {e}", records.len()),
        }
        report
    }
}

impl<B> EventProcessor<Value> for OrderProcessor<B>
where B: AnalyticsStore + 'static
{
    async fn process(&self, event: Value) -> Result<(), ProcessorError> {
        self.process_event(event).await;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::{
        db::traits::StoreTable,
        test_utils::{envelope, MemoryStore, RawOrderBuilder},
    };

    fn processor(store: &MemoryStore) -> (tempfile::TempDir, OrderProcessor<MemoryStore>) {
        let dir = tempfile::tempdir().unwrap();
        let extractor = OrderExtractor::new(dir.path()).unwrap();
        (dir, OrderProcessor::new(extractor, store.clone()))
    }

    #[tokio::test]
    async fn order_without_id_is_skipped() {
        let _ = env_logger::try_init();
        let store = MemoryStore::new();
        let (_dir, processor) = processor(&store);
        let mut orders = (1..=10).map(|id| RawOrderBuilder::new().id(id).build()).collect::<Vec<_>>();
        orders[4].as_object_mut().unwrap().remove("id");
        let report = processor.process_event(envelope(orders)).await;
        assert_eq!(report, BatchReport { received: 10, extracted: 9, transformed: 9, rejected: 1, loaded: 9 });
        assert_eq!(store.order_insert_calls(), vec![9]);
        assert_eq!(store.orders().len(), 9);
        assert!(store.orders().iter().all(|o| o.id != 5));
    }

    #[tokio::test]
    async fn one_load_per_event() {
        let store = MemoryStore::new();
        let (_dir, processor) = processor(&store);
        let processor = processor.with_batch_size(2);
        let orders = (1..=5).map(|id| RawOrderBuilder::new().id(id).line_items(1).build()).collect::<Vec<_>>();
        let report = processor.process_event(envelope(orders)).await;
        assert_eq!(report.loaded, 5);
        assert_eq!(store.order_insert_calls(), vec![2, 2, 1]);
        assert_eq!(store.item_insert_calls(), vec![2, 2, 1]);
        assert_eq!(store.count_rows(StoreTable::OrderItems).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn malformed_envelopes_and_orders() {
        let store = MemoryStore::new();
        let (_dir, processor) = processor(&store);
        assert_eq!(processor.process_event(json!({"orders": "nope"})).await, BatchReport::default());
        assert_eq!(processor.process_event(json!([1, 2])).await, BatchReport::default());
        let report = processor.process_event(json!({"orders": [1, null, {"id": null}, {"id": 3}]})).await;
        assert_eq!(report, BatchReport { received: 4, extracted: 0, transformed: 0, rejected: 4, loaded: 0 });
        assert!(store.order_insert_calls().is_empty());
    }

    #[tokio::test]
    async fn transform_rejections_are_counted_separately() {
        let store = MemoryStore::new();
        let (_dir, processor) = processor(&store);
        let orders = vec![
            RawOrderBuilder::new().id(1).total_price("100000000.00").build(),
            RawOrderBuilder::new().id(2).total_price("-250000000").build(),
        ];
        let report = processor.process_event(envelope(orders)).await;
        assert_eq!(report, BatchReport { received: 2, extracted: 2, transformed: 0, rejected: 2, loaded: 0 });
        assert_eq!(report.to_string(), "2 received, 2 extracted, 0 transformed, 2 rejected, 0 loaded");
        assert!(store.order_insert_calls().is_empty());
    }

    #[tokio::test]
    async fn load_failure_is_reported_not_raised() {
        let store = MemoryStore::new();
        store.fail_order_insert_on_call(1);
        let (_dir, processor) = processor(&store);
        let report = processor.process_event(envelope(vec![RawOrderBuilder::random_order()])).await;
        assert_eq!(report.extracted, 1);
        assert_eq!(report.loaded, 0);
        assert!(processor.process(envelope(vec![])).await.is_ok());
    }

    #[tokio::test]
    async fn single_order() {
        let store = MemoryStore::new();
        let (_dir, processor) = processor(&store);
        let report = processor.process_order(&RawOrderBuilder::new().id(9).line_items(3).build()).await;
        assert_eq!(report.loaded, 1);
        assert_eq!(store.items().len(), 3);
        let report = processor.process_order(&json!({"id": 10, "name": "#10"})).await;
        assert_eq!(report.rejected, 1);
    }
}
