use rand::{Rng, RngCore};
use serde_json::{json, Value};

/// Wraps a list of raw orders in an export envelope.
pub fn envelope(orders: Vec<Value>) -> Value {
    json!({ "orders": orders })
}

/// Builds raw order payloads in the export format. Anything not set explicitly gets a sensible (and for ids and
/// emails, random) default.
#[derive(Debug, Clone)]
pub struct RawOrderBuilder {
    id: Option<u64>,
    created_at: Option<String>,
    total_price: Option<String>,
    line_items: usize,
    item_price: String,
    with_customer: bool,
    with_addresses: bool,
}

impl Default for RawOrderBuilder {
    fn default() -> Self {
        Self {
            id: None,
            created_at: None,
            total_price: None,
            line_items: 1,
            item_price: "10.00".to_string(),
            with_customer: true,
            with_addresses: true,
        }
    }
}

impl RawOrderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn random_order() -> Value {
        RawOrderBuilder::new().build()
    }

    pub fn id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn created_at(mut self, created_at: &str) -> Self {
        self.created_at = Some(created_at.to_string());
        self
    }

    pub fn total_price(mut self, total_price: &str) -> Self {
        self.total_price = Some(total_price.to_string());
        self
    }

    pub fn line_items(mut self, count: usize) -> Self {
        self.line_items = count;
        self
    }

    pub fn item_price(mut self, price: &str) -> Self {
        self.item_price = price.to_string();
        self
    }

    pub fn without_customer(mut self) -> Self {
        self.with_customer = false;
        self
    }

    pub fn without_addresses(mut self) -> Self {
        self.with_addresses = false;
        self
    }

    pub fn build(self) -> Value {
        let mut rng = rand::thread_rng();
        let id = self.id.unwrap_or_else(|| rng.next_u64() >> 12);
        let email = format!("buyer{}@example.com", rng.gen_range(0..1000));
        let created_at = self.created_at.unwrap_or_else(|| "2024-05-01T10:00:00Z".to_string());
        let items = (0..self.line_items)
            .map(|i| {
                let item_id = id.wrapping_mul(100).wrapping_add(i as u64);
                json!({
                    "id": item_id,
                    "name": format!("Product {i}"),
                    "price": self.item_price,
                    "quantity": 1 + i,
                    "sku": format!("SKU-{i:03}"),
                    "title": format!("Product {i}"),
                    "variant_id": 5_000 + i,
                    "product_id": 9_000 + i,
                    "total_discount": "0.00",
                    "tax_lines": [{"title": "VAT", "price": "1.00", "rate": 0.1}]
                })
            })
            .collect::<Vec<_>>();
        let mut order = json!({
            "id": id,
            "name": format!("#{}", 1000 + id % 9000),
            "email": email,
            "created_at": created_at,
            "updated_at": "2024-05-01T10:05:00Z",
            "processed_at": "2024-05-01T10:01:00Z",
            "total_price": self.total_price.unwrap_or_else(|| "110.00".to_string()),
            "subtotal_price": "100.00",
            "total_tax": "10.00",
            "total_discounts": "0.00",
            "currency": "USD",
            "financial_status": "paid",
            "fulfillment_status": null,
            "line_items": items,
            "shipping_lines": [],
            "tax_lines": [],
            "discount_codes": [],
            "note": null,
            "tags": "wholesale, repeat"
        });
        if self.with_customer {
            order["customer"] = json!({
                "id": id + 1,
                "email": email,
                "first_name": "Ada",
                "last_name": "Lovelace",
                "phone": null,
                "created_at": "2023-01-01T00:00:00Z",
                "updated_at": "2024-04-30T00:00:00Z"
            });
        }
        if self.with_addresses {
            order["billing_address"] = address("Cape Town", "Western Cape", "South Africa");
            order["shipping_address"] = address("Lisbon", "Lisboa", "Portugal");
        }
        order
    }
}

fn address(city: &str, province: &str, country: &str) -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "address1": "12 Analytical Way",
        "address2": null,
        "city": city,
        "province": province,
        "country": country,
        "zip": "8001",
        "phone": "+27 21 555 0100",
        "latitude": -33.92,
        "longitude": 18.42
    })
}
