use std::{
    fs,
    path::{Path, PathBuf},
};

use glob::Pattern;
use log::*;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    db_types::{Address, Customer, LineItem, Order, OrderId, RawAmount},
    etl::errors::{ExtractError, MalformedInput, OrderValidationError},
    helpers::parse_timestamp,
};

/// The result of extracting one order from an envelope: the order itself, or the reason it was rejected.
pub type OrderOutcome = Result<Order, OrderValidationError>;

//--------------------------------------   Raw payloads     ---------------------------------------------------------
// Nested entities are kept as raw JSON at this level so that each one can be validated with its own context.
#[derive(Deserialize)]
struct RawOrder {
    id: OrderId,
    name: String,
    email: String,
    created_at: String,
    updated_at: String,
    processed_at: String,
    total_price: RawAmount,
    subtotal_price: RawAmount,
    total_tax: RawAmount,
    total_discounts: RawAmount,
    currency: String,
    financial_status: String,
    fulfillment_status: Option<String>,
    customer: Option<Value>,
    billing_address: Option<Value>,
    shipping_address: Option<Value>,
    #[serde(default)]
    line_items: Option<Vec<Value>>,
    #[serde(default)]
    shipping_lines: Option<Vec<Value>>,
    #[serde(default)]
    tax_lines: Option<Vec<Value>>,
    #[serde(default)]
    discount_codes: Option<Vec<Value>>,
    note: Option<String>,
    tags: Option<String>,
}

#[derive(Deserialize)]
struct RawCustomer {
    id: u64,
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    created_at: String,
    updated_at: String,
}

//--------------------------------------   OrderExtractor   ---------------------------------------------------------
/// Reads order export files from a directory and validates their contents.
#[derive(Debug, Clone)]
pub struct OrderExtractor {
    data_dir: PathBuf,
}

impl OrderExtractor {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, ExtractError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        check_directory(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Validate a single raw order and convert it into an [`Order`].
    ///
    /// Timestamps must parse, and so must every nested customer, address and line item. Any failure rejects the whole
    /// order with an [`OrderValidationError`] that carries the order id (when it can be read) and the location of the
    /// problem.
    pub fn extract_order(&self, raw: &Value) -> Result<Order, OrderValidationError> {
        let order_id = raw.get("id").and_then(Value::as_u64);
        let fail = |context: &str, message: String| OrderValidationError::new(order_id, context, message);

        let order = RawOrder::deserialize(raw).map_err(|e| fail("order", e.to_string()))?;
        let created_at = parse_timestamp(&order.created_at).map_err(|e| fail("created_at", e.to_string()))?;
        let updated_at = parse_timestamp(&order.updated_at).map_err(|e| fail("updated_at", e.to_string()))?;
        let processed_at = parse_timestamp(&order.processed_at).map_err(|e| fail("processed_at", e.to_string()))?;

        let customer = order.customer.as_ref().map(|c| extract_customer(order.id, c)).transpose()?;
        let billing_address =
            order.billing_address.as_ref().map(|a| extract_address(order.id, "billing_address", a)).transpose()?;
        let shipping_address =
            order.shipping_address.as_ref().map(|a| extract_address(order.id, "shipping_address", a)).transpose()?;
        let line_items = order
            .line_items
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, item)| {
                LineItem::deserialize(item)
                    .map_err(|e| OrderValidationError::new(Some(order.id), format!("line_items[{i}]"), e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Order {
            id: order.id,
            name: order.name,
            email: order.email,
            created_at,
            updated_at,
            processed_at,
            total_price: order.total_price,
            subtotal_price: order.subtotal_price,
            total_tax: order.total_tax,
            total_discounts: order.total_discounts,
            currency: order.currency,
            financial_status: order.financial_status,
            fulfillment_status: order.fulfillment_status,
            customer,
            billing_address,
            shipping_address,
            line_items,
            shipping_lines: order.shipping_lines.unwrap_or_default(),
            tax_lines: order.tax_lines.unwrap_or_default(),
            discount_codes: order.discount_codes.unwrap_or_default(),
            note: order.note,
            tags: order.tags.unwrap_or_default(),
        })
    }

    /// Extract every order in an `{"orders": [...]}` envelope.
    ///
    /// An envelope with a bad shape yields [`MalformedInput`]. Otherwise there is one outcome per entry in the
    /// `orders` list, in order.
    pub fn extract_envelope(&self, envelope: &Value) -> Result<Vec<OrderOutcome>, MalformedInput> {
        let orders = envelope_orders(envelope)?;
        Ok(orders.iter().map(|raw| self.extract_order(raw)).collect())
    }

    /// Read and extract a single export file.
    pub fn extract_file(&self, path: &Path) -> Result<Vec<OrderOutcome>, MalformedInput> {
        let content =
            fs::read_to_string(path).map_err(|source| MalformedInput::Io { path: path.to_path_buf(), source })?;
        let envelope: Value = serde_json::from_str(&content)
            .map_err(|source| MalformedInput::Json { path: path.to_path_buf(), source })?;
        self.extract_envelope(&envelope)
    }

    /// Extract orders from every file in the data directory whose name matches `file_pattern`.
    ///
    /// Bad files and bad orders are logged and skipped. This only fails if the directory itself cannot be used.
    pub fn extract_orders(&self, file_pattern: &str) -> Result<Vec<Order>, ExtractError> {
        let files = self.matching_files(file_pattern)?;
        if files.is_empty() {
            warn!("🧾️ No files matching '{file_pattern}' found in {}", self.data_dir.display());
            return Ok(Vec::new());
        }
        let mut all_orders = Vec::new();
        let mut rejected = 0usize;
        for path in &files {
            info!("🧾️ Processing file: {}", path.display());
            match self.extract_file(path) {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        match outcome {
                            Ok(order) => all_orders.push(order),
                            Err(e) => {
                                rejected += 1;
                                error!("🧾️ Error processing order in {}: {e}", path.display());
                            },
                        }
                    }
                },
                Err(MalformedInput::MissingOrders) => {
                    warn!("🧾️ No 'orders' key found in {}. Skipping it.", path.display());
                },
                Err(e) => {
                    error!("🧾️ Error processing file {}: {e}", path.display());
                },
            }
        }
        info!(
            "🧾️ Successfully extracted {} orders from {} files ({rejected} orders rejected)",
            all_orders.len(),
            files.len()
        );
        Ok(all_orders)
    }

    fn matching_files(&self, file_pattern: &str) -> Result<Vec<PathBuf>, ExtractError> {
        check_directory(&self.data_dir)?;
        let dir = Pattern::escape(&self.data_dir.to_string_lossy());
        let full_pattern = format!("{dir}/{file_pattern}");
        let entries = glob::glob(&full_pattern).map_err(|e| ExtractError::InvalidPattern {
            pattern: file_pattern.to_string(),
            message: e.to_string(),
        })?;
        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {},
                Err(e) if e.path() == self.data_dir.as_path() => {
                    let path = e.path().to_path_buf();
                    return Err(ExtractError::Unreadable { path, source: e.into_error() });
                },
                Err(e) => warn!("🧾️ Skipping unreadable path: {e}"),
            }
        }
        Ok(files)
    }
}

/// Returns the `orders` list of an envelope, or the reason the envelope is unusable.
pub(crate) fn envelope_orders(envelope: &Value) -> Result<&Vec<Value>, MalformedInput> {
    let map = envelope.as_object().ok_or(MalformedInput::NotAnObject)?;
    let orders = map.get("orders").ok_or(MalformedInput::MissingOrders)?;
    orders.as_array().ok_or(MalformedInput::OrdersNotASequence)
}

fn check_directory(dir: &Path) -> Result<(), ExtractError> {
    if !dir.exists() {
        return Err(ExtractError::DirectoryMissing(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(ExtractError::NotADirectory(dir.to_path_buf()));
    }
    fs::read_dir(dir).map_err(|source| ExtractError::Unreadable { path: dir.to_path_buf(), source })?;
    Ok(())
}

fn extract_customer(order_id: OrderId, raw: &Value) -> Result<Customer, OrderValidationError> {
    let fail = |context: &str, message: String| OrderValidationError::new(Some(order_id), context, message);
    let c = RawCustomer::deserialize(raw).map_err(|e| fail("customer", e.to_string()))?;
    Ok(Customer {
        id: c.id,
        email: c.email,
        first_name: c.first_name,
        last_name: c.last_name,
        phone: c.phone,
        created_at: parse_timestamp(&c.created_at).map_err(|e| fail("customer.created_at", e.to_string()))?,
        updated_at: parse_timestamp(&c.updated_at).map_err(|e| fail("customer.updated_at", e.to_string()))?,
    })
}

fn extract_address(order_id: OrderId, field: &str, raw: &Value) -> Result<Address, OrderValidationError> {
    Address::deserialize(raw).map_err(|e| OrderValidationError::new(Some(order_id), field, e.to_string()))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::test_utils::RawOrderBuilder;

    fn extractor() -> (tempfile::TempDir, OrderExtractor) {
        let dir = tempfile::tempdir().unwrap();
        let extractor = OrderExtractor::new(dir.path()).unwrap();
        (dir, extractor)
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = OrderExtractor::new("/definitely/not/a/real/dir").unwrap_err();
        assert!(matches!(err, ExtractError::DirectoryMissing(_)));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, extractor) = extractor();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o000)).unwrap();
        let readable_anyway = fs::read_dir(dir.path()).is_ok();
        let result = extractor.extract_orders("*.json");
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
        if readable_anyway {
            // Permission bits do not apply to the superuser.
            return;
        }
        assert!(matches!(result, Err(ExtractError::Unreadable { .. })));
    }

    #[test]
    fn extracts_a_complete_order() {
        let (_dir, extractor) = extractor();
        let raw = RawOrderBuilder::new().id(1001).line_items(2).build();
        let order = extractor.extract_order(&raw).unwrap();
        assert_eq!(order.id, 1001);
        assert_eq!(order.line_items.len(), 2);
        assert!(order.customer.is_some());
        assert_eq!(order.created_at, parse_timestamp("2024-05-01T10:00:00Z").unwrap());
    }

    #[test]
    fn bad_timestamp_rejects_the_order() {
        let (_dir, extractor) = extractor();
        let raw = RawOrderBuilder::new().id(7).created_at("last tuesday").build();
        let err = extractor.extract_order(&raw).unwrap_err();
        assert_eq!(err.order_id, Some(7));
        assert_eq!(err.context, "created_at");
    }

    #[test]
    fn nested_failures_carry_their_context() {
        let (_dir, extractor) = extractor();
        let mut raw = RawOrderBuilder::new().id(8).line_items(3).build();
        raw["customer"]["updated_at"] = json!("not-a-date");
        let err = extractor.extract_order(&raw).unwrap_err();
        assert_eq!(err.context, "customer.updated_at");

        let mut raw = RawOrderBuilder::new().id(9).line_items(3).build();
        raw["line_items"][2].as_object_mut().unwrap().remove("sku");
        let err = extractor.extract_order(&raw).unwrap_err();
        assert_eq!(err.order_id, Some(9));
        assert_eq!(err.context, "line_items[2]");
        assert!(err.message.contains("sku"));
    }

    #[test]
    fn missing_id_is_reported_without_an_id() {
        let (_dir, extractor) = extractor();
        let mut raw = RawOrderBuilder::new().build();
        raw.as_object_mut().unwrap().remove("id");
        let err = extractor.extract_order(&raw).unwrap_err();
        assert_eq!(err.order_id, None);
        assert_eq!(err.context, "order");
    }

    #[test]
    fn optional_nested_entities_may_be_absent() {
        let (_dir, extractor) = extractor();
        let mut raw = RawOrderBuilder::new().id(5).build();
        let obj = raw.as_object_mut().unwrap();
        obj.remove("customer");
        obj.insert("billing_address".into(), Value::Null);
        obj.remove("shipping_address");
        obj.remove("line_items");
        obj.insert("note".into(), Value::Null);
        obj.remove("tags");
        let order = extractor.extract_order(&raw).unwrap();
        assert!(order.customer.is_none());
        assert!(order.billing_address.is_none());
        assert!(order.line_items.is_empty());
        assert_eq!(order.tags, "");
    }

    #[test]
    fn envelope_shapes() {
        let (_dir, extractor) = extractor();
        assert!(matches!(extractor.extract_envelope(&json!([1, 2])), Err(MalformedInput::NotAnObject)));
        assert!(matches!(extractor.extract_envelope(&json!({"data": []})), Err(MalformedInput::MissingOrders)));
        assert!(matches!(
            extractor.extract_envelope(&json!({"orders": {"id": 1}})),
            Err(MalformedInput::OrdersNotASequence)
        ));
        let outcomes = extractor
            .extract_envelope(&json!({"orders": [RawOrderBuilder::new().id(1).build(), {"id": 2}]}))
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_ok());
        assert_eq!(outcomes[1].as_ref().unwrap_err().order_id, Some(2));
    }
}
