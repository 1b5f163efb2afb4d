//! Basic usage of redis-cacher
//!
//! Stores a few values, subscribes to a channel and keeps running until
//! Ctrl-C, then shuts the pool down. Needs a Redis server on REDIS_URL
//! (default 127.0.0.1:6379).

use redis_cacher::{Client, GeoOptions, GeoUnit, Message, Options};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize, Deserialize)]
struct User {
    name: String,
    age: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let address = std::env::var("REDIS_URL").unwrap_or_else(|_| "127.0.0.1:6379".to_string());
    let client = Client::configure(
        Options::new(address)
            .with_prefix("demo_")
            .with_max_active(8)
            .with_idle_timeout(Duration::from_secs(240)),
    )?;

    // Scalars are stored verbatim, records as JSON.
    client.set("visits", 1, 0).await?;
    client.incr("visits").await?;
    info!("visits = {}", client.get_int64("visits").await?);

    let user = User {
        name: "ann".to_string(),
        age: 23,
    };
    client.set_object("user:1", &user, 3600).await?;
    client.hmset("user:1:fields", &user, 3600).await?;
    let from_hash: User = client.hgetall("user:1:fields").await?;
    info!("user = {:?}, from hash = {:?}", client.get_object::<User>("user:1").await?, from_hash);

    client.geo_add("places", 13.361389, 38.115556, "Palermo").await?;
    let nearby = client
        .geo_radius(
            "places",
            15.0,
            37.0,
            200.0,
            &GeoOptions::new().with_dist().unit(GeoUnit::Kilometers),
        )
        .await?;
    info!("nearby = {:?}", nearby);

    let subscription = client.subscribe(&["demo_events"], |message: Message| async move {
        info!("{} -> {:?}", message.channel, message.payload_str());
    })?;
    subscription.wait_active().await?;
    client.publish("demo_events", "hello").await?;

    info!("Running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    client.shutdown();
    info!("Pool stats after shutdown: {:?}", client.pool_stats());
    Ok(())
}
