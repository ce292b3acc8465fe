//! Integration tests against a real Redis
//!
//! Tests use testcontainers to spin up a Redis instance, so they need a
//! Docker daemon and are ignored by default:
//! `cargo test --test redis_backend -- --ignored`

use std::time::Duration;

use serde_json::{json, Value};
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

use ronin_cache::cache::{BackendMode, CacheConfig, CacheFacade};

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

async fn remote_facade() -> CacheFacade {
    CacheFacade::new(CacheConfig {
        redis_url: Some(get_redis_url().await),
        ..CacheConfig::default()
    })
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_reachable_redis_selects_remote_mode() {
    let cache = remote_facade().await;

    assert_eq!(cache.mode(), BackendMode::Uninitialized);
    assert_eq!(cache.ensure_initialized().await, BackendMode::Remote);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_set_get_delete_roundtrip() {
    let cache = remote_facade().await;
    let payload = json!({"city": "Lisbon", "temps": [21.5, 19.0]});

    assert!(cache.set("it:roundtrip", &payload, Duration::from_secs(60)).await);
    assert_eq!(cache.get::<Value>("it:roundtrip").await, Some(payload));

    assert!(cache.delete("it:roundtrip").await);
    assert_eq!(cache.get::<Value>("it:roundtrip").await, None);
    assert_eq!(cache.mode(), BackendMode::Remote);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_empty_list_is_a_hit() {
    let cache = remote_facade().await;
    let empty: Vec<String> = Vec::new();

    assert!(cache.set("it:empty", &empty, Duration::from_secs(60)).await);

    assert_eq!(cache.get::<Vec<String>>("it:empty").await, Some(Vec::new()));
    assert_eq!(cache.get::<Vec<String>>("it:never-set").await, None);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_remote_entries_expire() {
    let cache = remote_facade().await;

    assert!(cache.set("it:short", &"soon gone", Duration::from_secs(1)).await);
    assert_eq!(cache.get::<String>("it:short").await.as_deref(), Some("soon gone"));

    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(cache.get::<String>("it:short").await, None);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_two_facades_share_remote_entries() {
    let writer = remote_facade().await;
    let reader = remote_facade().await;

    assert!(writer.set("it:shared", &42_u32, Duration::from_secs(60)).await);
    assert_eq!(reader.get::<u32>("it:shared").await, Some(42));
}
