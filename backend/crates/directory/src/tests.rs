//! Scenario tests for the directory crate

#[cfg(test)]
mod remote_store_tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::Router;
    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::header::{AUTHORIZATION, ETAG, IF_MATCH, IF_NONE_MATCH};
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;

    use crate::error::StoreError;
    use crate::infra::fallback::{FALLBACK_REVISION_BIT, FallbackStore};
    use crate::infra::memory::InMemoryStore;
    use crate::infra::remote::{RemoteKvConfig, RemoteKvStore};
    use crate::infra::store::RecordStore;

    /// Minimal KV service speaking the ETag protocol
    #[derive(Clone, Default)]
    struct StubKv {
        records: Arc<Mutex<HashMap<String, (u64, Vec<u8>)>>>,
        token: Option<String>,
        delay: Option<Duration>,
    }

    impl StubKv {
        fn authorized(&self, headers: &HeaderMap) -> bool {
            match &self.token {
                None => true,
                Some(token) => {
                    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
                        == Some(format!("Bearer {token}").as_str())
                }
            }
        }
    }

    fn etag(revision: u64) -> HeaderValue {
        HeaderValue::from_str(&format!("\"{revision}\"")).unwrap()
    }

    async fn stub_get(
        State(kv): State<StubKv>,
        Path(key): Path<String>,
        headers: HeaderMap,
    ) -> Response {
        if let Some(delay) = kv.delay {
            tokio::time::sleep(delay).await;
        }
        if !kv.authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        let records = kv.records.lock().unwrap();
        match records.get(&key) {
            Some((revision, payload)) => {
                let mut response = payload.clone().into_response();
                response.headers_mut().insert(ETAG, etag(*revision));
                response
            }
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn stub_put(
        State(kv): State<StubKv>,
        Path(key): Path<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        if !kv.authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        let mut records = kv.records.lock().unwrap();
        let current = records.get(&key).map(|(revision, _)| *revision);

        let precondition_holds = if headers.contains_key(IF_NONE_MATCH) {
            current.is_none()
        } else if let Some(expected) = headers.get(IF_MATCH) {
            current.map(etag).as_ref() == Some(expected)
        } else {
            true
        };

        if !precondition_holds {
            let mut response = StatusCode::PRECONDITION_FAILED.into_response();
            if let Some(revision) = current {
                response.headers_mut().insert(ETAG, etag(revision));
            }
            return response;
        }

        let next = current.unwrap_or(0) + 1;
        records.insert(key, (next, body.to_vec()));
        let mut response = StatusCode::NO_CONTENT.into_response();
        response.headers_mut().insert(ETAG, etag(next));
        response
    }

    async fn spawn_stub(kv: StubKv) -> String {
        let app = Router::new()
            .route("/values/{key}", get(stub_get).put(stub_put))
            .with_state(kv);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn remote(base_url: String, token: Option<&str>, timeout_ms: u64) -> RemoteKvStore {
        RemoteKvStore::new(RemoteKvConfig {
            base_url,
            token: token.map(str::to_string),
            timeout: Duration::from_millis(timeout_ms),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_remote_round_trip() {
        let base = spawn_stub(StubKv::default()).await;
        let store = remote(base, None, 2000);

        assert_eq!(store.get("users").await.unwrap(), None);
        assert_eq!(store.put("users", b"[]".to_vec(), None).await.unwrap(), 1);
        assert_eq!(store.put("users", b"[1]".to_vec(), Some(1)).await.unwrap(), 2);

        let blob = store.get("users").await.unwrap().unwrap();
        assert_eq!(blob.revision, 2);
        assert_eq!(blob.payload, b"[1]");
    }

    #[tokio::test]
    async fn test_remote_conflict_reports_current_revision() {
        let base = spawn_stub(StubKv::default()).await;
        let store = remote(base, None, 2000);
        store.put("users", b"[]".to_vec(), None).await.unwrap();
        store.put("users", b"[1]".to_vec(), Some(1)).await.unwrap();

        let err = store.put("users", b"[2]".to_vec(), Some(1)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::RevisionConflict {
                expected: Some(1),
                actual: 2
            }
        ));

        let err = store.put("users", b"[]".to_vec(), None).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_remote_sends_bearer_token() {
        let kv = StubKv {
            token: Some("kv-secret".to_string()),
            ..Default::default()
        };
        let base = spawn_stub(kv).await;

        let authorized = remote(base.clone(), Some("kv-secret"), 2000);
        assert_eq!(authorized.put("users", b"[]".to_vec(), None).await.unwrap(), 1);

        let anonymous = remote(base, None, 2000);
        assert!(matches!(
            anonymous.get("users").await,
            Err(StoreError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_timeout() {
        let kv = StubKv {
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        };
        let base = spawn_stub(kv).await;
        let store = remote(base, None, 50);

        assert!(matches!(store.get("users").await, Err(StoreError::Timeout)));
    }

    #[tokio::test]
    async fn test_unreachable_remote_falls_back() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let primary = remote(format!("http://{addr}"), None, 500);
        let store = FallbackStore::new(Some(primary), Some(InMemoryStore::new()), true);

        let revision = store.put("locations", b"[]".to_vec(), None).await.unwrap();
        assert_eq!(revision, 1 | FALLBACK_REVISION_BIT);
        assert_eq!(store.get("locations").await.unwrap().unwrap().payload, b"[]");
    }
}

#[cfg(test)]
mod concurrency_tests {
    use std::sync::Arc;

    use kernel::id::UserId;

    use crate::application::config::DirectoryConfig;
    use crate::domain::location::{Coordinates, Intent, Location, Presence};
    use crate::domain::repository::{LocationDirectory, UserDirectory};
    use crate::domain::user::User;
    use crate::error::{DirectoryError, StoreError, StoreResult};
    use crate::infra::kv_directory::KvDirectory;
    use crate::infra::memory::InMemoryStore;
    use crate::infra::store::{RecordStore, VersionedBlob};

    fn directory(max_write_attempts: u32) -> KvDirectory<InMemoryStore> {
        KvDirectory::new(
            Arc::new(InMemoryStore::new()),
            DirectoryConfig { max_write_attempts },
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_same_email_persists_once() {
        let dir = directory(8);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let dir = dir.clone();
                tokio::spawn(async move {
                    dir.create_user(User::new("race@b.com", "h".into(), format!("User {i}")))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(DirectoryError::EmailTaken) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(dir.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_lose_no_updates() {
        let dir = directory(32);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let dir = dir.clone();
                tokio::spawn(async move {
                    dir.create_user(User::new(&format!("user{i}@b.com"), "h".into(), "Name".into()))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(dir.list_users().await.unwrap().len(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_check_ins_all_recorded() {
        let dir = directory(32);
        dir.add_location(Location::new("1", "Cafe", Coordinates(1.0, 2.0)))
            .await
            .unwrap();

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let dir = dir.clone();
                tokio::spawn(async move {
                    let intent = if i % 3 == 0 { Intent::BodyDouble } else { Intent::Focus };
                    let presence = Presence {
                        user_id: UserId::new(),
                        name: format!("User {i}"),
                        intent,
                    };
                    dir.check_in("1", presence).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let location = dir.find_location("1").await.unwrap().unwrap();
        assert_eq!(location.occupants.len(), 12);
        assert_eq!(location.has_active_double, Some(true));
    }

    /// Store whose writes always lose the race
    struct AlwaysConflicting(InMemoryStore);

    impl RecordStore for AlwaysConflicting {
        async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
            self.0.get(key).await
        }

        async fn put(
            &self,
            _key: &str,
            _payload: Vec<u8>,
            expected_revision: Option<u64>,
        ) -> StoreResult<u64> {
            Err(StoreError::RevisionConflict {
                expected: expected_revision,
                actual: expected_revision.unwrap_or(0) + 1,
            })
        }
    }

    #[tokio::test]
    async fn test_retries_exhausted_reports_contention() {
        let dir = KvDirectory::new(
            Arc::new(AlwaysConflicting(InMemoryStore::new())),
            DirectoryConfig {
                max_write_attempts: 3,
            },
        );

        let err = dir
            .create_user(User::new("a@b.com", "h".into(), "Ann".into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DirectoryError::Contention {
                collection: "users",
                attempts: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = directory(8);
        let mut location = Location::new("7", "Library", Coordinates(51.5, -0.12));
        location.amenities = Some(vec!["wifi".into(), "quiet".into()]);
        dir.add_location(location.clone()).await.unwrap();

        assert_eq!(dir.list_locations().await.unwrap(), vec![location]);
    }
}

#[cfg(test)]
mod http_tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use kernel::id::UserId;
    use kernel::session::SessionIdentity;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::application::config::DirectoryConfig;
    use crate::infra::kv_directory::KvDirectory;
    use crate::infra::memory::InMemoryStore;
    use crate::presentation::router::{location_router_generic, presence_router_generic};

    fn app() -> Router {
        let directory = Arc::new(KvDirectory::new(
            Arc::new(InMemoryStore::new()),
            DirectoryConfig::default(),
        ));
        location_router_generic(directory.clone()).merge(presence_router_generic(directory))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn session() -> SessionIdentity {
        SessionIdentity {
            user_id: UserId::new(),
            email: "ann@b.com".to_string(),
            name: "Ann".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let app = app();
        let (status, created) = send(
            &app,
            json_request(
                "POST",
                "/",
                json!({"id": "1", "name": "Blue Bottle", "coords": [40.7, -74.0]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["coworkers"], json!([]));

        let (status, list) = send(
            &app,
            Request::builder().uri("/").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().map(Vec::len), Some(1));
        assert_eq!(list[0]["name"], "Blue Bottle");
    }

    #[tokio::test]
    async fn test_invalid_body_is_bad_request() {
        let app = app();
        let (status, body) = send(&app, json_request("POST", "/", json!({"name": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid request body"}));
    }

    #[tokio::test]
    async fn test_patch_missing_location_is_not_found() {
        let app = app();
        let (status, body) =
            send(&app, json_request("PATCH", "/404", json!({"name": "x"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Location not found"}));
    }

    #[tokio::test]
    async fn test_patch_merges_fields() {
        let app = app();
        send(
            &app,
            json_request(
                "POST",
                "/",
                json!({"id": "1", "name": "Cafe", "coords": [1.0, 2.0], "amenities": ["wifi"]}),
            ),
        )
        .await;

        let (status, body) =
            send(&app, json_request("PATCH", "/1", json!({"name": "Renamed"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Renamed");
        assert_eq!(body["amenities"], json!(["wifi"]));
    }

    #[tokio::test]
    async fn test_check_in_and_out_with_session() {
        let app = app();
        send(
            &app,
            json_request("POST", "/", json!({"id": "1", "name": "Cafe", "coords": [1.0, 2.0]})),
        )
        .await;
        let identity = session();

        let mut request = json_request("POST", "/1/checkin", json!({"intent": "body-double"}));
        request.extensions_mut().insert(identity.clone());
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hasDouble"], true);
        assert_eq!(body["coworkers"][0]["name"], "Ann");
        assert_eq!(body["coworkers"][0]["userId"], identity.user_id.to_string());

        let mut request = Request::builder()
            .method("POST")
            .uri("/checkout")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(identity);
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"locationsLeft": 1}));
    }

    #[tokio::test]
    async fn test_occupancy_not_writable_through_location_routes() {
        let app = app();
        let (_, created) = send(
            &app,
            json_request(
                "POST",
                "/",
                json!({
                    "id": "1",
                    "name": "Cafe",
                    "coords": [1.0, 2.0],
                    "coworkers": [{"name": "Ghost", "intent": "body-double"}],
                    "hasDouble": true
                }),
            ),
        )
        .await;
        assert_eq!(created["coworkers"], json!([]));
        assert!(created.get("hasDouble").is_none());

        let identity = session();
        let mut request = json_request("POST", "/1/checkin", json!({"intent": "focus"}));
        request.extensions_mut().insert(identity.clone());
        send(&app, request).await;

        let (status, body) = send(
            &app,
            json_request(
                "PATCH",
                "/1",
                json!({
                    "coworkers": [{
                        "name": "Mallory",
                        "intent": "body-double",
                        "userId": identity.user_id.to_string()
                    }],
                    "hasDouble": true
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["coworkers"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["coworkers"][0]["name"], "Ann");
        assert_eq!(body["hasDouble"], false);
    }

    #[tokio::test]
    async fn test_check_in_rejects_unknown_intent() {
        let app = app();
        send(
            &app,
            json_request("POST", "/", json!({"id": "1", "name": "Cafe", "coords": [1.0, 2.0]})),
        )
        .await;

        let mut request = json_request("POST", "/1/checkin", json!({"intent": "napping"}));
        request.extensions_mut().insert(session());
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
