//! Request lifecycle against a scripted transport.
//!
//! Covers middleware ordering, descriptor construction by the verb methods,
//! decoding of successful responses and the success-only response chain.

mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{Reply, ScriptedTransport};
use courier_core::{
    BearerTokenMiddleware, Client, ClientOptions, Credentials, HttpClient, HttpMethod, HttpRequest, HttpResponse,
    Outcome, PropagateErrors, QueryParamsMiddleware, RequestConfig, ResponseBody, ResponseType, TimeoutMiddleware,
};
use serde::Deserialize;
use serde_json::{json, Value};

const BASE_URL: &str = "http://api.test/";

fn client(transport: &ScriptedTransport) -> Client<ScriptedTransport, ()> {
    Client::new(transport.clone(), ClientOptions::with_base_url(BASE_URL), PropagateErrors).unwrap()
}

fn response<T>(outcome: Outcome<T, ()>) -> HttpResponse<T> {
    outcome.response().expect("expected a response, got a recovered value")
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
}

#[tokio::test]
async fn get_decodes_json_envelope() {
    let transport = ScriptedTransport::new().reply(Reply::json(200, json!({"id": 1})));
    let c = client(&transport);

    let resp = response(c.get::<User>("/users/1", None, None).await.unwrap());

    assert_eq!(resp.data, User { id: 1 });
    assert_eq!(resp.status, 200);
    assert_eq!(resp.headers["content-type"], "application/json");
    let sent = transport.last();
    assert_eq!(sent.method, http::Method::GET);
    assert_eq!(sent.uri, "http://api.test/users/1");
}

#[tokio::test]
async fn request_middleware_folds_in_registration_order() {
    let transport = ScriptedTransport::new();
    let mut c = client(&transport);
    c.add_request_middleware(|req: HttpRequest| req.with_header("X-Trail", "a"));
    c.add_request_middleware(|req: HttpRequest| {
        let trail = format!("{},b", req.header("X-Trail").unwrap_or_default());
        req.with_header("X-Trail", trail)
    });
    c.add_request_middleware(|req: HttpRequest| {
        let trail = format!("{},c", req.header("X-Trail").unwrap_or_default());
        req.with_header("X-Trail", trail)
    });

    c.get::<Value>("/anything", None, None).await.unwrap();

    assert_eq!(transport.last().header("x-trail"), Some("a,b,c"));
}

#[tokio::test]
async fn dispatched_request_equals_folded_descriptor() {
    let transport = ScriptedTransport::new();
    let mut c = client(&transport);
    c.add_request_middleware(QueryParamsMiddleware::new([("api-version".to_string(), "2".to_string())]));
    c.add_request_middleware(TimeoutMiddleware::new(Duration::from_millis(750)));
    c.add_request_middleware(|req: HttpRequest| HttpRequest {
        url: format!("{}/v2", req.url),
        ..req
    });

    c.get::<Value>("/reports", None, None).await.unwrap();

    let sent = transport.last();
    assert_eq!(sent.uri, "http://api.test/reports/v2?api-version=2");
    assert_eq!(sent.timeout, Some(Duration::from_millis(750)));
}

#[tokio::test]
async fn bearer_token_survives_caller_headers() {
    let transport = ScriptedTransport::new();
    let mut c = client(&transport);
    c.add_request_middleware(BearerTokenMiddleware::new("s3cret"));

    let config = RequestConfig {
        headers: Some(BTreeMap::from([
            ("X-Tenant".to_string(), "acme".to_string()),
            ("authorization".to_string(), "Basic Zm9vOmJhcg==".to_string()),
        ])),
        ..RequestConfig::default()
    };
    c.get::<Value>("/a", Some(config), None).await.unwrap();
    c.post::<Value>("/b", Some(json!({"x": 1})), None, None).await.unwrap();

    for sent in transport.sent() {
        assert_eq!(sent.header("authorization"), Some("Bearer s3cret"));
    }
    assert_eq!(transport.sent()[0].header("x-tenant"), Some("acme"));
}

#[tokio::test]
async fn post_builds_descriptor_from_verb_and_config() {
    let transport = ScriptedTransport::new();
    let seen = Arc::new(std::sync::Mutex::new(None));
    let mut c = client(&transport);
    let capture = Arc::clone(&seen);
    c.add_request_middleware(move |req: HttpRequest| {
        *capture.lock().unwrap() = Some(req.clone());
        req
    });

    let config = RequestConfig {
        headers: Some(BTreeMap::from([("X-Id".to_string(), "7".to_string())])),
        params: Some(BTreeMap::from([("dry_run".to_string(), "true".to_string())])),
        response_type: Some(ResponseType::Text),
        timeout: Some(Duration::from_secs(2)),
        with_credentials: Some(true),
    };
    c.post::<String>("/users", Some(json!({"name": "ada"})), Some(config.clone()), None)
        .await
        .unwrap();

    let descriptor = seen.lock().unwrap().clone().unwrap();
    assert_eq!(descriptor.method, HttpMethod::Post);
    assert_eq!(descriptor.url, "/users");
    assert_eq!(descriptor.data, Some(json!({"name": "ada"})));
    assert_eq!(Some(descriptor.headers), config.headers);
    assert_eq!(Some(descriptor.params), config.params);
    assert_eq!(Some(descriptor.response_type), config.response_type);
    assert_eq!(descriptor.timeout, config.timeout);
    assert_eq!(descriptor.with_credentials, config.with_credentials);

    let sent = transport.last();
    assert_eq!(sent.method, http::Method::POST);
    assert_eq!(sent.json(), json!({"name": "ada"}));
    assert_eq!(sent.header("content-type"), Some("application/json"));
    assert_eq!(sent.credentials, Some(Credentials::Include));
}

#[tokio::test]
async fn each_verb_uses_its_method() {
    let transport = ScriptedTransport::new();
    let c = client(&transport);

    c.get::<Value>("/r", None, None).await.unwrap();
    c.post::<Value>("/r", None, None, None).await.unwrap();
    c.put::<Value>("/r", Some(json!(1)), None, None).await.unwrap();
    c.patch::<Value>("/r", Some(json!(2)), None, None).await.unwrap();
    c.delete::<Value>("/r", None, None).await.unwrap();

    let methods: Vec<_> = transport.sent().into_iter().map(|s| s.method).collect();
    assert_eq!(
        methods,
        vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE
        ]
    );
}

#[tokio::test]
async fn response_middleware_folds_in_order_on_success() {
    let transport = ScriptedTransport::new().reply(Reply::json(200, json!({"count": 1})));
    let mut c = client(&transport);
    c.add_response_middleware(|resp: HttpResponse<ResponseBody>| {
        resp.map(|body| match body {
            ResponseBody::Json(v) => ResponseBody::Json(json!({"count": v["count"].as_i64().unwrap() + 10})),
            other => other,
        })
    });
    c.add_response_middleware(|resp: HttpResponse<ResponseBody>| {
        resp.map(|body| match body {
            ResponseBody::Json(v) => ResponseBody::Json(json!({"count": v["count"].as_i64().unwrap() * 2})),
            other => other,
        })
    });

    let resp = response(c.get::<Value>("/count", None, None).await.unwrap());

    assert_eq!(resp.data, json!({"count": 22}));
}

#[tokio::test]
async fn response_middleware_is_skipped_on_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let transport = ScriptedTransport::new()
        .reply(Reply::json(500, json!({"error": "boom"})))
        .reply(Reply::Network)
        .reply(Reply::json(200, json!({})));
    let mut c = client(&transport);
    let counter = Arc::clone(&calls);
    c.add_response_middleware(move |resp: HttpResponse<ResponseBody>| {
        counter.fetch_add(1, Ordering::SeqCst);
        resp
    });

    assert!(c.get::<Value>("/x", None, None).await.is_err());
    assert!(c.get::<Value>("/x", None, None).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    c.get::<Value>("/x", None, None).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pass_through_chains_leave_values_unchanged() {
    let transport = ScriptedTransport::new()
        .reply(Reply::json(200, json!({"id": 9})))
        .reply(Reply::json(200, json!({"id": 9})));
    let plain = client(&transport);
    let mut wrapped = client(&transport);
    wrapped.add_request_middleware(|req: HttpRequest| req);
    wrapped.add_request_middleware(|req: HttpRequest| req);
    wrapped.add_response_middleware(|resp: HttpResponse<ResponseBody>| resp);

    let a = response(plain.get::<Value>("/u", None, None).await.unwrap());
    let b = response(wrapped.get::<Value>("/u", None, None).await.unwrap());

    assert_eq!(a, b);
    let sent = transport.sent();
    assert_eq!(sent[0].uri, sent[1].uri);
    assert_eq!(sent[0].headers, sent[1].headers);
}

#[tokio::test]
async fn text_and_binary_response_types() {
    let transport = ScriptedTransport::new()
        .reply(Reply::raw(200, b"hello"))
        .reply(Reply::raw(200, &[0xde, 0xad, 0xbe, 0xef]));
    let c = client(&transport);

    let text_config = RequestConfig {
        response_type: Some(ResponseType::Text),
        ..RequestConfig::default()
    };
    let text = response(c.get::<String>("/text", Some(text_config), None).await.unwrap());
    assert_eq!(text.data, "hello");

    let blob_config = RequestConfig {
        response_type: Some(ResponseType::ArrayBuffer),
        ..RequestConfig::default()
    };
    let blob = response(c.get::<bytes::Bytes>("/bytes", Some(blob_config), None).await.unwrap());
    assert_eq!(blob.data.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
}

#[tokio::test]
async fn no_content_decodes_as_null() {
    let transport = ScriptedTransport::new().reply(Reply::raw(204, b""));
    let c = client(&transport);

    let resp = response(c.delete::<Option<User>>("/users/1", None, None).await.unwrap());

    assert_eq!(resp.status, 204);
    assert_eq!(resp.data, None);
}

#[tokio::test]
async fn base_headers_are_sent_and_overridable() {
    let transport = ScriptedTransport::new();
    let options = ClientOptions::with_base_url(BASE_URL)
        .header("Accept", "application/json")
        .header("User-Agent", "courier-tests");
    let c: Client<_, ()> = Client::new(transport.clone(), options, PropagateErrors).unwrap();

    let config = RequestConfig {
        headers: Some(BTreeMap::from([("accept".to_string(), "text/csv".to_string())])),
        ..RequestConfig::default()
    };
    c.get::<Value>("/export", Some(config), None).await.unwrap();

    let sent = transport.last();
    assert_eq!(sent.header("accept"), Some("text/csv"));
    assert_eq!(sent.header("user-agent"), Some("courier-tests"));
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let transport = ScriptedTransport::new();
    let mut c = client(&transport);
    c.add_request_middleware(BearerTokenMiddleware::new("shared"));
    let c = Arc::new(c);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let c = Arc::clone(&c);
            tokio::spawn(async move { c.get::<Value>(&format!("/items/{i}"), None, None).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let mut uris: Vec<_> = transport.sent().into_iter().map(|s| s.uri).collect();
    uris.sort();
    let mut expected: Vec<_> = (0..8).map(|i| format!("http://api.test/items/{i}")).collect();
    expected.sort();
    assert_eq!(uris, expected);
    assert!(transport.sent().iter().all(|s| s.header("authorization") == Some("Bearer shared")));
}
