pub(super) const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id UInt64,
    name String,
    email String,
    created_at DateTime,
    updated_at DateTime,
    processed_at DateTime,
    total_price Decimal(10,2),
    subtotal_price Decimal(10,2),
    total_tax Decimal(10,2),
    total_discounts Decimal(10,2),
    currency String,
    financial_status String,
    fulfillment_status String,
    customer_id UInt64,
    customer_email String,
    customer_first_name String,
    customer_last_name String,
    customer_phone String,
    billing_address_city String,
    billing_address_province String,
    billing_address_country String,
    shipping_address_city String,
    shipping_address_province String,
    shipping_address_country String,
    note String,
    tags String
) ENGINE = ReplacingMergeTree()
ORDER BY (id, created_at)
PRIMARY KEY id
"#;

pub(super) const CREATE_ORDER_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS order_items (
    id UInt64,
    order_id UInt64,
    name String,
    price Decimal(10,2),
    quantity UInt32,
    sku String,
    title String,
    variant_id UInt64,
    product_id UInt64,
    total_discount Decimal(10,2)
) ENGINE = ReplacingMergeTree()
ORDER BY (id, order_id)
PRIMARY KEY (id, order_id)
"#;
