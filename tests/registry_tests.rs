//! Link registry integration tests
//!
//! Issue/resolve round trips, rejection of malformed destinations,
//! concurrent issuance and persistence across reopen.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use tracelink::config::RegistryConfig;
use tracelink::errors::TracelinkError;
use tracelink::registry::{LinkRegistry, create_store};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// =============================================================================
// Round trip
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_issue_then_resolve_returns_destination(
        host in "[a-z]{1,12}",
        tld in prop::sample::select(vec!["com", "org", "net", "io"]),
        path in "(/[a-zA-Z0-9_-]{0,8}){0,3}",
        secure in any::<bool>(),
    ) {
        let scheme = if secure { "https" } else { "http" };
        let destination = format!("{}://{}.{}{}", scheme, host, tld, path);

        let rt = runtime();
        let resolved = rt.block_on(async {
            let registry = LinkRegistry::in_memory("https://t.example");
            let link = registry.issue(&destination).await.unwrap();
            registry.resolve(&link.id).await.unwrap()
        });
        prop_assert_eq!(resolved, destination);
    }

    #[test]
    fn prop_non_http_destinations_create_nothing(
        input in prop_oneof![
            Just(String::new()),
            "[a-z ]{1,16}",
            "javascript:[a-z()]{1,10}",
            "/[a-z/]{0,10}",
            "ftp://[a-z]{1,8}\\.com",
        ],
    ) {
        let rt = runtime();
        let (err, count) = rt.block_on(async {
            let registry = LinkRegistry::in_memory("https://t.example");
            let err = registry.issue(&input).await.unwrap_err();
            (err, registry.count().await.unwrap())
        });
        prop_assert!(matches!(err, TracelinkError::InvalidDestination(_)));
        prop_assert_eq!(count, 0);
    }
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issue_yields_distinct_ids() {
    let registry = Arc::new(LinkRegistry::in_memory("https://t.example"));

    let handles: Vec<_> = (0..200)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let destination = format!("https://example.com/{}", i);
                let link = registry.issue(&destination).await.unwrap();
                (link.id, destination)
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let (id, destination) = handle.await.unwrap();
        assert_eq!(registry.resolve(&id).await.unwrap(), destination);
        assert!(ids.insert(id));
    }
    assert_eq!(registry.count().await.unwrap(), 200);
}

#[tokio::test]
async fn test_resolve_never_issued() {
    let registry = LinkRegistry::in_memory("https://t.example");
    registry.issue("https://example.com").await.unwrap();

    for id in ["neverissued", "", "a/b", "x".repeat(65).as_str()] {
        assert!(
            matches!(
                registry.resolve(id).await,
                Err(TracelinkError::UnknownLink(_))
            ),
            "{id:?}"
        );
    }
}

// =============================================================================
// Store selection
// =============================================================================

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = RegistryConfig {
        store: "file".to_string(),
        path: dir.path().join("links.jsonl").display().to_string(),
        link_prefix: "https://t.example/".to_string(),
    };

    let id = {
        let registry = LinkRegistry::new(create_store(&config).await.unwrap(), "https://t.example/");
        registry.issue("https://example.com/kept").await.unwrap().id
    };

    let reopened = LinkRegistry::new(create_store(&config).await.unwrap(), "https://t.example/");
    assert_eq!(reopened.backend_name(), "file");
    assert_eq!(
        reopened.resolve(&id).await.unwrap(),
        "https://example.com/kept"
    );
    assert_eq!(
        reopened.link_url(&id),
        format!("https://t.example/track/{}", id)
    );
}

#[tokio::test]
async fn test_unknown_store_type_is_config_error() {
    let config = RegistryConfig {
        store: "redis".to_string(),
        ..RegistryConfig::default()
    };
    assert!(matches!(
        create_store(&config).await,
        Err(TracelinkError::Config(_))
    ));
}
