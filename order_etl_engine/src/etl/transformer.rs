use etl_common::Money;
use log::*;

use crate::{
    db_types::{Address, LineItemRecord, Order, OrderId, OrderRecord, RawAmount},
    etl::errors::TransformError,
};

/// Flattens [`Order`]s into the records held by the `orders` and `order_items` relations.
///
/// Missing customers and addresses are filled with empty values. Malformed amounts are logged and recorded as zero, so
/// the only way an order can fail here is by holding an amount that the store's `Decimal(10,2)` columns cannot
/// represent.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderTransformer;

impl OrderTransformer {
    pub fn new() -> Self {
        Self
    }

    fn money(order_id: OrderId, field: &str, amount: &RawAmount) -> Result<Money, TransformError> {
        let money = amount.to_money().unwrap_or_else(|e| {
            error!("🔄️ Order #{order_id}: could not convert {field}. {e}. Using 0.00 instead.");
            Money::zero()
        });
        if money.fits_store_precision() {
            Ok(money)
        } else {
            Err(TransformError::AmountOutOfRange { order_id, field: field.to_string(), amount: money })
        }
    }

    pub fn transform_order(&self, order: &Order) -> Result<OrderRecord, TransformError> {
        let customer = order.customer.as_ref();
        let billing = order.billing_address.as_ref();
        let shipping = order.shipping_address.as_ref();
        let (billing_city, billing_province, billing_country) = locality(billing);
        let (shipping_city, shipping_province, shipping_country) = locality(shipping);
        Ok(OrderRecord {
            id: order.id,
            name: order.name.clone(),
            email: order.email.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
            processed_at: order.processed_at,
            total_price: Self::money(order.id, "total_price", &order.total_price)?,
            subtotal_price: Self::money(order.id, "subtotal_price", &order.subtotal_price)?,
            total_tax: Self::money(order.id, "total_tax", &order.total_tax)?,
            total_discounts: Self::money(order.id, "total_discounts", &order.total_discounts)?,
            currency: order.currency.clone(),
            financial_status: order.financial_status.clone(),
            fulfillment_status: order.fulfillment_status.clone().unwrap_or_default(),
            customer_id: customer.map(|c| c.id).unwrap_or_default(),
            customer_email: customer.map(|c| c.email.clone()).unwrap_or_default(),
            customer_first_name: customer.map(|c| c.first_name.clone()).unwrap_or_default(),
            customer_last_name: customer.map(|c| c.last_name.clone()).unwrap_or_default(),
            customer_phone: customer.and_then(|c| c.phone.clone()).unwrap_or_default(),
            billing_address_city: billing_city,
            billing_address_province: billing_province,
            billing_address_country: billing_country,
            shipping_address_city: shipping_city,
            shipping_address_province: shipping_province,
            shipping_address_country: shipping_country,
            note: order.note.clone().unwrap_or_default(),
            tags: order.tags.clone(),
        })
    }

    /// Flattens the order's line items, tagging each with the order's id.
    pub fn transform_order_items(&self, order: &Order) -> Result<Vec<LineItemRecord>, TransformError> {
        order
            .line_items
            .iter()
            .map(|item| {
                Ok(LineItemRecord {
                    id: item.id,
                    order_id: order.id,
                    name: item.name.clone(),
                    price: Self::money(order.id, "line_items.price", &item.price)?,
                    quantity: item.quantity,
                    sku: item.sku.clone(),
                    title: item.title.clone(),
                    variant_id: item.variant_id,
                    product_id: item.product_id,
                    total_discount: Self::money(order.id, "line_items.total_discount", &item.total_discount)?,
                })
            })
            .collect()
    }

    /// Transforms an order together with its line items. Either both succeed or the order is rejected as a whole.
    pub fn transform_with_items(&self, order: &Order) -> Result<(OrderRecord, Vec<LineItemRecord>), TransformError> {
        Ok((self.transform_order(order)?, self.transform_order_items(order)?))
    }

    /// Transforms a batch of orders. A failing order is excluded from both outputs and does not affect the others.
    pub fn transform_orders(&self, orders: &[Order]) -> (Vec<OrderRecord>, Vec<LineItemRecord>) {
        let mut records = Vec::with_capacity(orders.len());
        let mut items = Vec::new();
        let mut failed = 0usize;
        for order in orders {
            match self.transform_with_items(order) {
                Ok((record, order_items)) => {
                    records.push(record);
                    items.extend(order_items);
                },
                Err(e) => {
                    failed += 1;
                    error!("🔄️ Error transforming order #{}: {e}", order.id);
                },
            }
        }
        info!(
            "🔄️ Successfully transformed {} orders and {} order items. {failed} orders failed.",
            records.len(),
            items.len()
        );
        (records, items)
    }
}

/// City, province and country of an address, or empty strings when there is no address.
fn locality(address: Option<&Address>) -> (String, String, String) {
    address.map(|a| (a.city.clone(), a.province.clone(), a.country.clone())).unwrap_or_default()
}
