//! Integration tests for redis-cacher
//!
//! These tests require a running Redis instance and are ignored by default.
//! Set the REDIS_URL environment variable (default 127.0.0.1:6379) and run
//! `cargo test -- --ignored`.

use redis_cacher::{Client, GeoOptions, GeoSort, GeoUnit, Message, Options, SubscriptionState};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "127.0.0.1:6379".to_string())
}

fn client() -> Client {
    Client::configure(Options::new(redis_url()).with_prefix("test_")).expect("valid options")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    age: u32,
    active: bool,
    tags: Vec<String>,
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_set_get_expire() {
    let client = client();

    client.set("scenario", "v1", 0).await.expect("SET failed");
    assert_eq!(client.get_string("scenario").await.expect("GET failed"), "v1");

    assert!(client.expire("scenario", 1).await.expect("EXPIRE failed"));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(client
        .get_string("scenario")
        .await
        .expect_err("key should have expired")
        .is_nil());

    client.shutdown();
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_scalar_and_object_round_trip() {
    let client = client();

    client.set("int", 42, 60).await.expect("SET failed");
    assert_eq!(client.get_int("int").await.expect("GET failed"), 42);
    let ttl = client.ttl("int").await.expect("TTL failed");
    assert!(ttl > 0 && ttl <= 60);

    client.set("flag", true, 60).await.expect("SET failed");
    assert!(client.get_bool("flag").await.expect("GET failed"));

    let profile = Profile {
        name: "ann".to_string(),
        age: 23,
        active: true,
        tags: vec!["a".to_string()],
    };
    client
        .set_object("profile", &profile, 60)
        .await
        .expect("SET failed");
    assert_eq!(
        client.get_object::<Profile>("profile").await.expect("GET failed"),
        profile
    );

    assert_eq!(client.incr_by("counter", 5).await.expect("INCRBY failed"), 5);
    assert_eq!(client.decr("counter").await.expect("DECR failed"), 4);

    client
        .del(&["int", "flag", "profile", "counter"])
        .await
        .expect("DEL failed");
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_hash_record() {
    let client = client();
    let profile = Profile {
        name: "23".to_string(),
        age: 23,
        active: false,
        tags: vec!["x".to_string(), "y".to_string()],
    };

    client.hmset("hprofile", &profile, 60).await.expect("HMSET failed");
    let back: Profile = client.hgetall("hprofile").await.expect("HGETALL failed");
    assert_eq!(back, profile);
    assert_eq!(client.hget_int("hprofile", "age").await.expect("HGET failed"), 23);
    assert!(client.ttl("hprofile").await.expect("TTL failed") > 0);

    client.del(&["hprofile"]).await.expect("DEL failed");
    assert!(client
        .hgetall::<Profile>("hprofile")
        .await
        .expect_err("hash is gone")
        .is_nil());
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_sorted_set_and_list() {
    let client = client();
    client.del(&["board", "queue"]).await.expect("DEL failed");

    client.zadd("board", 10.0, "a").await.expect("ZADD failed");
    client.zadd("board", 20.0, "b").await.expect("ZADD failed");
    client.zadd("board", 30.0, "c").await.expect("ZADD failed");

    assert_eq!(client.zcard("board").await.expect("ZCARD failed"), 3);
    assert_eq!(client.zrevrank("board", "c").await.expect("ZREVRANK failed"), 0);
    let top = client
        .zrevrange_by_score("board", f64::INFINITY, 15.0, Some((0, 1)))
        .await
        .expect("ZREVRANGEBYSCORE failed");
    assert_eq!(top, vec![("c".to_string(), 30.0)]);

    client.rpush("queue", "job").await.expect("RPUSH failed");
    let popped = client.blpop(&["queue"], 1).await.expect("BLPOP failed");
    assert_eq!(popped.map(|(key, _)| key), Some("queue".to_string()));
    assert!(client.brpop(&["queue"], 1).await.expect("BRPOP failed").is_none());

    client.del(&["board"]).await.expect("DEL failed");
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_geo_radius() {
    let client = client();
    client.del(&["sicily"]).await.expect("DEL failed");

    client
        .geo_add("sicily", 13.361389, 38.115556, "Palermo")
        .await
        .expect("GEOADD failed");
    client
        .geo_add("sicily", 15.087269, 37.502669, "Catania")
        .await
        .expect("GEOADD failed");

    let options = GeoOptions::new()
        .with_dist()
        .with_coord()
        .unit(GeoUnit::Kilometers)
        .sort(GeoSort::Asc);
    let found = client
        .geo_radius("sicily", 15.0, 37.0, 200.0, &options)
        .await
        .expect("GEORADIUS failed");

    let found: Vec<_> = found
        .into_iter()
        .map(|location| location.expect("member present"))
        .collect();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].name, "Catania");
    assert!((found[0].distance - 56.4413).abs() < 0.01);
    assert!((found[1].longitude - 13.361389).abs() < 0.001);

    client.del(&["sicily"]).await.expect("DEL failed");
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_publish_subscribe() {
    let client = client();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let subscription = client
        .subscribe(&["test_news"], move |message: Message| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(message);
            }
        })
        .expect("SUBSCRIBE failed");
    timeout(Duration::from_secs(2), subscription.wait_active())
        .await
        .expect("subscription confirmed in time")
        .expect("engine running");
    assert_eq!(subscription.state(), SubscriptionState::Active);

    assert_eq!(client.publish("test_news", "hello").await.expect("PUBLISH failed"), 1);
    let message = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("message delivered in time")
        .expect("channel open");
    assert_eq!(message.channel, "test_news");
    assert_eq!(message.payload_str().expect("utf-8"), "hello");
}
