use chrono::{DateTime, Utc};
use clickhouse::Row;
use etl_common::Money;
use serde::{Deserialize, Serialize};

use super::ClickHouseStoreError;
use crate::db_types::{LineItemRecord, OrderRecord};

/// Wire format of a row in the `orders` table.
///
/// `DateTime` columns travel as unix seconds and `Decimal(10,2)` columns as their `i64` mantissa at scale 2.
#[derive(Debug, Clone, PartialEq, Eq, Row, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub created_at: u32,
    pub updated_at: u32,
    pub processed_at: u32,
    pub total_price: i64,
    pub subtotal_price: i64,
    pub total_tax: i64,
    pub total_discounts: i64,
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

/// Wire format of a row in the `order_items` table.
#[derive(Debug, Clone, PartialEq, Eq, Row, Serialize, Deserialize)]
pub struct OrderItemRow {
    pub id: u64,
    pub order_id: u64,
    pub name: String,
    pub price: i64,
    pub quantity: u32,
    pub sku: String,
    pub title: String,
    pub variant_id: u64,
    pub product_id: u64,
    pub total_discount: i64,
}

fn datetime_column(field: &str, value: &DateTime<Utc>) -> Result<u32, ClickHouseStoreError> {
    u32::try_from(value.timestamp())
        .map_err(|_| ClickHouseStoreError::RowConversion(format!("{field}={value} is outside the DateTime range")))
}

fn decimal_column(field: &str, value: &Money) -> Result<i64, ClickHouseStoreError> {
    value.to_store_mantissa().map_err(|e| ClickHouseStoreError::RowConversion(format!("{field}: {e}")))
}

impl TryFrom<&OrderRecord> for OrderRow {
    type Error = ClickHouseStoreError;

    fn try_from(r: &OrderRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name.clone(),
            email: r.email.clone(),
            created_at: datetime_column("created_at", &r.created_at)?,
            updated_at: datetime_column("updated_at", &r.updated_at)?,
            processed_at: datetime_column("processed_at", &r.processed_at)?,
            total_price: decimal_column("total_price", &r.total_price)?,
            subtotal_price: decimal_column("subtotal_price", &r.subtotal_price)?,
            total_tax: decimal_column("total_tax", &r.total_tax)?,
            total_discounts: decimal_column("total_discounts", &r.total_discounts)?,
            currency: r.currency.clone(),
            financial_status: r.financial_status.clone(),
            fulfillment_status: r.fulfillment_status.clone(),
            customer_id: r.customer_id,
            customer_email: r.customer_email.clone(),
            customer_first_name: r.customer_first_name.clone(),
            customer_last_name: r.customer_last_name.clone(),
            customer_phone: r.customer_phone.clone(),
            billing_address_city: r.billing_address_city.clone(),
            billing_address_province: r.billing_address_province.clone(),
            billing_address_country: r.billing_address_country.clone(),
            shipping_address_city: r.shipping_address_city.clone(),
            shipping_address_province: r.shipping_address_province.clone(),
            shipping_address_country: r.shipping_address_country.clone(),
            note: r.note.clone(),
            tags: r.tags.clone(),
        })
    }
}

impl TryFrom<&LineItemRecord> for OrderItemRow {
    type Error = ClickHouseStoreError;

    fn try_from(r: &LineItemRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            order_id: r.order_id,
            name: r.name.clone(),
            price: decimal_column("price", &r.price)?,
            quantity: r.quantity,
            sku: r.sku.clone(),
            title: r.title.clone(),
            variant_id: r.variant_id,
            product_id: r.product_id,
            total_discount: decimal_column("total_discount", &r.total_discount)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helpers::parse_timestamp;

    fn item(price: &str) -> LineItemRecord {
        LineItemRecord {
            id: 7,
            order_id: 1001,
            name: "Tea".into(),
            price: Money::parse(price).unwrap(),
            quantity: 3,
            sku: "TEA".into(),
            title: "Tea".into(),
            variant_id: 70,
            product_id: 700,
            total_discount: Money::zero(),
        }
    }

    #[test]
    fn money_travels_as_scaled_mantissa() {
        let row = OrderItemRow::try_from(&item("12.5")).unwrap();
        assert_eq!(row.price, 1_250);
        assert_eq!(row.total_discount, 0);
        assert_eq!(row.order_id, 1001);
    }

    #[test]
    fn out_of_range_money_is_rejected() {
        let err = OrderItemRow::try_from(&item("123456789.00")).unwrap_err();
        assert!(matches!(err, ClickHouseStoreError::RowConversion(_)));
    }

    #[test]
    fn datetime_travels_as_unix_seconds() {
        let dt = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(datetime_column("created_at", &dt).unwrap(), 1_704_067_200);
        let ancient = parse_timestamp("1969-12-31T23:59:59Z").unwrap();
        assert!(datetime_column("created_at", &ancient).is_err());
    }
}
