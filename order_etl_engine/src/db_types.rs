//! Domain entities produced by the extractor, and the flat records that the loader writes to the analytical store.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use etl_common::{Money, MoneyConversionError};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type OrderId = u64;

//--------------------------------------     RawAmount      ---------------------------------------------------------
/// A monetary amount exactly as it appears in an export file, e.g. `"199.00"`.
///
/// Amounts are only ever converted into [`Money`], never into a float. The conversion is done by the transformer,
/// which recovers from malformed amounts instead of rejecting the order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct RawAmount(pub String);

impl RawAmount {
    pub fn to_money(&self) -> Result<Money, MoneyConversionError> {
        Money::parse(&self.0)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<S: Into<String>> From<S> for RawAmount {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for RawAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RawAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(D::Error::custom(format!("expected a decimal amount, found {other}"))),
        }
    }
}

//--------------------------------------      Customer      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Address       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    pub province: String,
    pub country: String,
    pub zip: String,
    pub phone: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

//--------------------------------------      LineItem      ---------------------------------------------------------
/// A single product line of an order. Line items do not know which order they belong to; the order id is attached
/// when the item is flattened into a [`LineItemRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: u64,
    pub name: String,
    pub price: RawAmount,
    pub quantity: u32,
    pub sku: String,
    pub title: String,
    pub variant_id: u64,
    pub product_id: u64,
    pub total_discount: RawAmount,
    #[serde(default)]
    pub tax_lines: Vec<Value>,
}

//--------------------------------------       Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    pub total_price: RawAmount,
    pub subtotal_price: RawAmount,
    pub total_tax: RawAmount,
    pub total_discounts: RawAmount,
    pub currency: String,
    pub financial_status: String,
    pub fulfillment_status: Option<String>,
    pub customer: Option<Customer>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
    pub line_items: Vec<LineItem>,
    pub shipping_lines: Vec<Value>,
    pub tax_lines: Vec<Value>,
    pub discount_codes: Vec<Value>,
    pub note: Option<String>,
    pub tags: String,
}

//--------------------------------------    OrderRecord     ---------------------------------------------------------
/// A flattened order, one row of the `orders` relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    pub total_price: Money,
    pub subtotal_price: Money,
    pub total_tax: Money,
    pub total_discounts: Money,
    pub currency: String,
    pub financial_status: String,
    pub fulfillment_status: String,
    pub customer_id: u64,
    pub customer_email: String,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_phone: String,
    pub billing_address_city: String,
    pub billing_address_province: String,
    pub billing_address_country: String,
    pub shipping_address_city: String,
    pub shipping_address_province: String,
    pub shipping_address_country: String,
    pub note: String,
    pub tags: String,
}

impl OrderRecord {
    pub fn key(&self) -> (OrderId, DateTime<Utc>) {
        (self.id, self.created_at)
    }
}

//--------------------------------------   LineItemRecord   ---------------------------------------------------------
/// A flattened line item, one row of the `order_items` relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemRecord {
    pub id: u64,
    pub order_id: OrderId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub sku: String,
    pub title: String,
    pub variant_id: u64,
    pub product_id: u64,
    pub total_discount: Money,
}

impl LineItemRecord {
    pub fn key(&self) -> (u64, OrderId) {
        (self.id, self.order_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn raw_amount_accepts_strings_and_numbers() {
        let a: RawAmount = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(a.as_str(), "19.99");
        let b: RawAmount = serde_json::from_str("42").unwrap();
        assert_eq!(b.to_money().unwrap(), Money::from_cents(4_200));
        assert!(serde_json::from_str::<RawAmount>("true").is_err());
    }

    #[test]
    fn line_item_tax_lines_default_to_empty() {
        let item: LineItem = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Mug", "price": "9.50", "quantity": 2, "sku": "MUG-1", "title": "Mug",
            "variant_id": 11, "product_id": 12, "total_discount": "0.00"
        }))
        .unwrap();
        assert!(item.tax_lines.is_empty());
        assert_eq!(item.price.to_money().unwrap(), Money::from_cents(950));
    }
}
