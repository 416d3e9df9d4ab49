//! Cart sync across a shop page, its hidden cart frame and a second tab.
//!
//! Run with: cargo run -p cart-sync-demo
//!
//! Set `RUST_LOG=debug` to see the sync traffic.

use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use futures::StreamExt;
use micro_local_store::{
    State, Store, StoreConfig,
    storage::{MemoryStorage, StorageArea},
};
use micro_local_store_transport::loopback::{LoopbackHost, Window};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

const SHOP: &str = "https://shop.example/";
const CART: &str = "https://cart.example/sync";

/// Mount a store in `window` and run its event loop.
fn mount(
    storage: &Arc<MemoryStorage>,
    window: Window,
) -> anyhow::Result<Arc<Store<StorageArea>>> {
    let area = storage.attach_window(&window)?;
    let (context, events) = window.into_parts();
    let config = StoreConfig::new("cart").with_allowed_urls([SHOP, CART]);
    let store = Arc::new(Store::new(config, context, area)?);
    Arc::clone(&store).spawn_event_loop(events.into_stream());
    Ok(store)
}

/// Wait until `store` holds `key`.
async fn settled(store: &Store<StorageArea>, key: &str) -> anyhow::Result<State> {
    let mut watch = store.watch();
    tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(state) = watch.next().await {
            if state.contains_key(key) {
                return Some(state);
            }
        }
        None
    })
    .await?
    .with_context(|| format!("store closed before {key} arrived"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let host = LoopbackHost::new();
    let storage = MemoryStorage::new();

    let shop = mount(&storage, host.open_window(Url::parse(SHOP)?))?;
    shop.on_change(Arc::new(|state: &State| {
        tracing::info!("shop page sees {}", serde_json::Value::Object(state.clone()));
    }));

    let mut frames = host.take_frames().into_iter();
    let hidden = frames.next().context("shop page provisioned no frame")?;
    let _hidden = mount(&storage, hidden)?;

    // The cart origin in its own tab; its hidden shop frame stays unmounted.
    let cart_tab = mount(&storage, host.open_window(Url::parse(CART)?))?;
    host.take_frames();

    tracing::info!("adding an item in the cart tab");
    cart_tab.set_state(json!({"items": [1]}).as_object().context("not an object")?)?;

    let state = settled(&shop, "items").await?;
    tracing::info!("shop page synced: {}", serde_json::Value::Object(state));

    let later = mount(&storage, host.open_window(Url::parse(SHOP)?))?;
    tracing::info!(
        "new shop tab loads {}",
        serde_json::Value::Object(later.get_state())
    );

    Ok(())
}
