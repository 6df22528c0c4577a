//! Installation and remote-payload fixtures

use mirror_common::Installation;
use serde_json::{json, Value};

/// An active installation with both token kinds set
pub fn installation_fixture(remote_id: &str) -> Installation {
    Installation {
        remote_installation_id: remote_id.to_string(),
        shop_domain: Some("acme".to_string()),
        active: true,
        company_token: Some("cdrtkn_testcompany00".to_string()),
        integration_token: Some("dit_testintegration00".to_string()),
        webhook_token: None,
        created_at: 0,
        updated_at: 0,
    }
}

/// A product payload shaped like the remote API's responses
pub fn product_payload(id: u64) -> Value {
    json!({
        "id": id,
        "title": format!("Product {}", id),
        "price": "19.99",
        "status": "active",
        "vendor": "Acme"
    })
}

/// An order payload with split customer name fields
pub fn order_payload(id: u64) -> Value {
    json!({
        "id": id,
        "status": "paid",
        "total": 59.97,
        "customer": {"first_name": "Ada", "last_name": "Lovelace"},
        "line_items": [
            {"sku": "A-1", "quantity": 1},
            {"sku": "B-2", "quantity": 2}
        ]
    })
}
