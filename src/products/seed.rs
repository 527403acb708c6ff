use tracing::info;

use crate::products::repo::{NewProduct, ProductStore};

fn demo_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "Laptop".into(),
            description: Some("High performance laptop".into()),
            price: 80000.0,
            category: Some("Electronics".into()),
            in_stock: true,
        },
        NewProduct {
            name: "Headphones".into(),
            description: Some("Noise cancelling headphones".into()),
            price: 12000.0,
            category: Some("Electronics".into()),
            in_stock: true,
        },
        NewProduct {
            name: "Office Chair".into(),
            description: Some("Ergonomic chair".into()),
            price: 15000.0,
            category: Some("Furniture".into()),
            in_stock: false,
        },
    ]
}

/// Insert the demo catalog when the products table is empty. Returns whether
/// anything was inserted.
pub async fn seed_products(store: &dyn ProductStore) -> anyhow::Result<bool> {
    if store.count().await? > 0 {
        return Ok(false);
    }
    let inserted = store.insert_many(demo_products()).await?;
    info!(inserted, "demo products seeded");
    Ok(true)
}
