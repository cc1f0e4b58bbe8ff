use super::*;
use crate::request::Destination;
use crate::test_support::{ORIGIN, StubNetwork, url};
use swcache_core::ResponseType;

fn manifest(paths: &[&str]) -> PrecacheManifest {
    PrecacheManifest::new(paths.iter().copied()).unwrap()
}

fn worker_with(
    storage: CacheStorage, network: Arc<StubNetwork>, paths: &[&str], cache_name: &str,
) -> CacheWorker {
    let router = Router::new(Url::parse(ORIGIN).unwrap(), vec!["/assets/".into()]);
    CacheWorker::new(storage, network, router, manifest(paths), cache_name)
}

async fn active_worker(network: Arc<StubNetwork>) -> CacheWorker {
    let storage = CacheStorage::open_in_memory().await.unwrap();
    let worker = worker_with(storage, network, &[], "site-cache-v1");
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    worker
}

fn respond(outcome: FetchOutcome) -> Response {
    match outcome {
        FetchOutcome::Respond(response) => response,
        FetchOutcome::Passthrough => panic!("expected a response, got passthrough"),
    }
}

#[tokio::test]
async fn test_install_skips_missing_precache_entry() {
    let network = Arc::new(StubNetwork::new());
    network.respond_ok("/", "<html>root</html>");
    network.respond_ok("/a.png", "png");
    network.respond("/missing.png", Response::basic(url("/missing.png").as_str(), 404, "not found"));

    let storage = CacheStorage::open_in_memory().await.unwrap();
    let worker = worker_with(storage, network, &["/", "/a.png", "/missing.png"], "site-cache-v1");

    let report = worker.install().await.unwrap();
    assert_eq!(report.cached, vec!["/".to_string(), "/a.png".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, "/missing.png");
    assert_eq!(worker.state().await, WorkerState::Installed);

    let generation = worker.generation();
    assert!(generation.match_request("GET", url("/").as_str()).await.unwrap().is_some());
    assert!(generation.match_request("GET", url("/a.png").as_str()).await.unwrap().is_some());
    assert!(generation.match_request("GET", url("/missing.png").as_str()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_install_survives_network_rejection() {
    let network = Arc::new(StubNetwork::new());
    network.respond_ok("/", "root");

    let storage = CacheStorage::open_in_memory().await.unwrap();
    let worker = worker_with(storage, network, &["/", "/offline.mp3"], "site-cache-v1");

    let report = worker.install().await.unwrap();
    assert_eq!(report.cached, vec!["/".to_string()]);
    assert!(report.failed[0].error.contains("NETWORK_ERROR"));
}

#[tokio::test]
async fn test_install_twice_is_rejected() {
    let network = Arc::new(StubNetwork::new());
    let storage = CacheStorage::open_in_memory().await.unwrap();
    let worker = worker_with(storage, network, &[], "site-cache-v1");

    worker.install().await.unwrap();
    assert!(matches!(worker.install().await, Err(Error::WorkerState(_))));
}

#[tokio::test]
async fn test_activate_requires_install() {
    let network = Arc::new(StubNetwork::new());
    let storage = CacheStorage::open_in_memory().await.unwrap();
    let worker = worker_with(storage, network, &[], "site-cache-v1");

    assert!(matches!(worker.activate().await, Err(Error::WorkerState(_))));
    assert_eq!(worker.state().await, WorkerState::Parsed);
}

#[tokio::test]
async fn test_activate_keeps_only_current_generation() {
    let network = Arc::new(StubNetwork::new());
    let storage = CacheStorage::open_in_memory().await.unwrap();
    storage.open_generation("site-cache-v1").await.unwrap();
    storage.open_generation("site-cache-v2").await.unwrap();

    let worker = worker_with(storage.clone(), network, &[], "site-cache-v3");
    worker.install().await.unwrap();
    let report = worker.activate().await.unwrap();

    let mut deleted = report.deleted.clone();
    deleted.sort();
    assert_eq!(deleted, vec!["site-cache-v1".to_string(), "site-cache-v2".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(storage.generation_names().await.unwrap(), vec!["site-cache-v3".to_string()]);
    assert_eq!(worker.state().await, WorkerState::Activated);
}

#[tokio::test]
async fn test_activate_continues_past_failed_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite");
    let storage = CacheStorage::open(&path).await.unwrap();
    for name in ["site-cache-v1", "site-cache-locked", "site-cache-v2"] {
        storage.open_generation(name).await.unwrap();
    }

    let admin = tokio_rusqlite::Connection::open(&path).await.unwrap();
    admin
        .call(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER keep_locked_generation BEFORE DELETE ON generations
                 WHEN OLD.name = 'site-cache-locked'
                 BEGIN SELECT RAISE(ABORT, 'generation is locked'); END;",
            )
        })
        .await
        .unwrap();

    let worker = worker_with(storage.clone(), Arc::new(StubNetwork::new()), &[], "site-cache-v3");
    worker.install().await.unwrap();
    let report = worker.activate().await.unwrap();

    let mut deleted = report.deleted.clone();
    deleted.sort();
    assert_eq!(deleted, vec!["site-cache-v1".to_string(), "site-cache-v2".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "site-cache-locked");
    assert!(report.failed[0].error.starts_with("CACHE_ERROR"));
    assert_eq!(
        storage.generation_names().await.unwrap(),
        vec!["site-cache-locked".to_string(), "site-cache-v3".to_string()]
    );
    assert_eq!(worker.state().await, WorkerState::Activated);
}

#[tokio::test]
async fn test_activate_claims_open_clients() {
    let network = Arc::new(StubNetwork::new());
    let storage = CacheStorage::open_in_memory().await.unwrap();
    let worker = worker_with(storage, network, &[], "site-cache-v2");
    worker.register_client("tab-1").await;
    worker.register_client("tab-2").await;

    worker.install().await.unwrap();
    assert_eq!(worker.controller_of("tab-1").await, None);

    let report = worker.activate().await.unwrap();
    assert_eq!(report.claimed, 2);
    assert_eq!(worker.controller_of("tab-1").await.as_deref(), Some("site-cache-v2"));

    worker.register_client("tab-3").await;
    assert_eq!(worker.controller_of("tab-3").await.as_deref(), Some("site-cache-v2"));
}

#[tokio::test]
async fn test_fetch_before_activation_passes_through() {
    let network = Arc::new(StubNetwork::new());
    network.respond_ok("/app.js", "js");
    let storage = CacheStorage::open_in_memory().await.unwrap();
    let worker = worker_with(storage, network.clone(), &[], "site-cache-v1");

    let outcome = worker.handle_fetch(&Request::get(url("/app.js"))).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Passthrough);
    assert_eq!(network.total_calls(), 0);
}

#[tokio::test]
async fn test_cross_origin_never_touches_cache() {
    let network = Arc::new(StubNetwork::new());
    let worker = active_worker(network.clone()).await;

    let requests = [
        Request::navigate(Url::parse("https://other.test/").unwrap()),
        Request::get(Url::parse("https://cdn.test/assets/pic.png").unwrap()).with_destination(Destination::Image),
        Request::get(Url::parse("https://api.other.test/data").unwrap()),
    ];
    for request in &requests {
        assert_eq!(worker.handle_fetch(request).await.unwrap(), FetchOutcome::Passthrough);
    }

    assert_eq!(worker.settle().await, 0);
    assert_eq!(network.total_calls(), 0);
    assert!(worker.generation().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_cache_first_idempotent_after_first_fetch() {
    let network = Arc::new(StubNetwork::new());
    network.respond_ok("/assets/cake.png", "cake");
    let worker = active_worker(network.clone()).await;
    let request = Request::get(url("/assets/cake.png")).with_destination(Destination::Image);

    respond(worker.handle_fetch(&request).await.unwrap());
    worker.settle().await;

    for _ in 0..3 {
        let response = respond(worker.handle_fetch(&request).await.unwrap());
        assert_eq!(&response.body[..], b"cake");
    }
    assert_eq!(network.calls_for("/assets/cake.png"), 1);
}

#[tokio::test]
async fn test_stored_response_read_back_without_network() {
    let network = Arc::new(StubNetwork::new());
    let worker = active_worker(network.clone()).await;
    let request = Request::get(url("/assets/a.png")).with_destination(Destination::Image);
    let stored = Response::basic(url("/assets/a.png").as_str(), 200, vec![0x89u8, 0x50, 0x4e, 0x47])
        .with_header("content-type", "image/png");

    worker.generation().put(&stored.to_stored(&request)).await.unwrap();

    let response = respond(worker.handle_fetch(&request).await.unwrap());
    assert_eq!(response.status, 200);
    assert_eq!(response.body, stored.body);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(network.total_calls(), 0);
}

#[tokio::test]
async fn test_offline_navigation_serves_root() {
    let network = Arc::new(StubNetwork::new());
    network.respond_ok("/", "<html>root</html>");

    let storage = CacheStorage::open_in_memory().await.unwrap();
    let worker = worker_with(storage, network.clone(), &["/"], "site-cache-v1");
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    network.go_offline("/");

    let response = respond(worker.handle_fetch(&Request::navigate(url("/page"))).await.unwrap());
    assert_eq!(&response.body[..], b"<html>root</html>");
}

#[tokio::test]
async fn test_offline_fragment_navigation_serves_root() {
    let network = Arc::new(StubNetwork::new());
    network.respond_ok("/", "<html>root</html>");

    let storage = CacheStorage::open_in_memory().await.unwrap();
    let worker = worker_with(storage, network.clone(), &["/"], "site-cache-v1");
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    network.go_offline("/");

    for target in ["/page#wish", "/#top"] {
        let response = respond(worker.handle_fetch(&Request::navigate(url(target))).await.unwrap());
        assert_eq!(&response.body[..], b"<html>root</html>", "navigating to {target}");
    }
}

#[tokio::test]
async fn test_offline_navigation_double_miss_is_contained() {
    let network = Arc::new(StubNetwork::new());
    network.respond_ok("/assets/cake.png", "cake");
    let worker = active_worker(network).await;

    let result = worker.handle_fetch(&Request::navigate(url("/page"))).await;
    assert!(matches!(result, Err(Error::OfflineNavigation(_))));

    let image = Request::get(url("/assets/cake.png")).with_destination(Destination::Image);
    let response = respond(worker.handle_fetch(&image).await.unwrap());
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_stale_while_revalidate_refreshes_store() {
    let network = Arc::new(StubNetwork::new());
    network.respond_ok("/api/data", "N");
    let worker = active_worker(network).await;
    let request = Request::get(url("/api/data"));
    let stale = Response::basic(url("/api/data").as_str(), 200, "S");
    worker.generation().put(&stale.to_stored(&request)).await.unwrap();

    let response = respond(worker.handle_fetch(&request).await.unwrap());
    assert_eq!(&response.body[..], b"S");

    worker.settle().await;
    let stored = worker
        .generation()
        .match_request("GET", url("/api/data").as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.body, b"N");
}

#[tokio::test]
async fn test_cache_first_opaque_not_stored() {
    let network = Arc::new(StubNetwork::new());
    network.respond("/asset.png", Response::opaque("https://cdn.test/asset.png"));
    let worker = active_worker(network).await;
    let request = Request::get(url("/asset.png")).with_destination(Destination::Image);

    let response = respond(worker.handle_fetch(&request).await.unwrap());
    assert_eq!(response.response_type, ResponseType::Opaque);

    worker.settle().await;
    assert!(worker.generation().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let network = Arc::new(StubNetwork::new());
    network.respond_ok("/assets/cake.png", "cake");
    network.respond_ok("/app.js", "js");
    let worker = active_worker(network).await;

    let image = Request::get(url("/assets/cake.png")).with_destination(Destination::Image);
    let script = Request::get(url("/app.js")).with_destination(Destination::Script);
    let page = Request::navigate(url("/nowhere"));

    let (image, script, page) =
        tokio::join!(worker.handle_fetch(&image), worker.handle_fetch(&script), worker.handle_fetch(&page));

    assert_eq!(&respond(image.unwrap()).body[..], b"cake");
    assert_eq!(&respond(script.unwrap()).body[..], b"js");
    assert!(page.is_err());

    worker.settle().await;
    assert_eq!(worker.generation().len().await.unwrap(), 2);
}

#[tokio::test]
async fn test_from_config_uses_cache_name_and_origin() {
    let network: Arc<dyn Network> = Arc::new(StubNetwork::new());
    let storage = CacheStorage::open_in_memory().await.unwrap();
    let config = AppConfig {
        site_name: "birthday".into(),
        cache_version: 2,
        origin: ORIGIN.into(),
        ..Default::default()
    };

    let worker = CacheWorker::from_config(&config, PrecacheManifest::default(), storage, network).unwrap();
    assert_eq!(worker.cache_name(), "birthday-cache-v2");
    assert_eq!(worker.origin().as_str(), "https://site.test/");
}
