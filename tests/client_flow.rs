use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use http::header::{CACHE_CONTROL, COOKIE, ETAG, IF_NONE_MATCH};
use http::{HeaderMap, HeaderValue, Method};
use tokio_util::sync::CancellationToken;
use url::Url;

use gosub_net::cache::{cache_key, CacheConfig, CacheEntry, CacheStore, InMemoryCacheStore};
use gosub_net::cookies::read_jar;
use gosub_net::net::{StreamingResponse, TransportFuture};
use gosub_net::retry::RetryConfig;
use gosub_net::sse::{ReconnectConfig, SseMessage};
use gosub_net::{ClientConfig, HttpClient, NetError, Request, Response, Transport, TransportError};

type Reply = Result<Response, TransportError>;

/// Transport answering `issue` from a queue and recording every request.
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    streams: Mutex<VecDeque<&'static str>>,
    seen: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    fn with_replies(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    fn requests(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn issue(&self, request: Request) -> TransportFuture<'_, Response> {
        self.seen.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::connect("no scripted reply")));
        Box::pin(async move { reply })
    }

    fn open_stream(&self, request: Request) -> TransportFuture<'_, StreamingResponse> {
        let url = request.url.clone();
        self.seen.lock().unwrap().push(request);
        let body = self.streams.lock().unwrap().pop_front();
        Box::pin(async move {
            match body {
                Some(text) => Ok(StreamingResponse {
                    url,
                    status: 200,
                    headers: HeaderMap::new(),
                    body: futures::stream::iter(vec![Ok(Bytes::from_static(text.as_bytes()))]).boxed(),
                }),
                None => futures::future::pending().await,
            }
        })
    }
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn reply(target: &str, status: u16, headers: &[(&'static str, &'static str)], body: &str) -> Reply {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.append(*name, HeaderValue::from_static(value));
    }
    Ok(Response::new(url(target), status, map, body.as_bytes().to_vec()))
}

fn config() -> ClientConfig {
    ClientConfig::builder()
        .retry(
            RetryConfig::default()
                .with_max_retries(3)
                .with_base_delay(Duration::from_millis(100))
                .with_jitter(false),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn cookies_set_by_one_response_go_out_with_the_next_request() {
    let transport = ScriptedTransport::with_replies(vec![
        reply("https://shop.example.com/login", 200, &[("set-cookie", "sid=abc; Path=/; Secure")], "ok"),
        reply("https://shop.example.com/cart", 200, &[], "cart"),
    ]);
    let client = HttpClient::new(transport.clone(), config());

    client.get("https://shop.example.com/login").await.unwrap();
    client.get("https://shop.example.com/cart").await.unwrap();

    let requests = transport.requests();
    assert!(requests[0].headers.get(COOKIE).is_none());
    assert_eq!(requests[1].headers.get(COOKIE).unwrap(), "sid=abc");
    assert_eq!(read_jar(&client.cookie_jar()).all_cookies().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let transport = ScriptedTransport::with_replies(vec![
        Err(TransportError::connect("Connection refused")),
        Err(TransportError::timeout("operation timed out")),
        reply("https://api.example.com/", 200, &[], "finally"),
    ]);
    let client = HttpClient::new(transport.clone(), config());

    let response = client.get("https://api.example.com/").await.unwrap();
    assert_eq!(response.text(), "finally");
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_last_error() {
    let transport = ScriptedTransport::with_replies(vec![
        Err(TransportError::connect("Connection refused (1)")),
        Err(TransportError::connect("Connection refused (2)")),
        Err(TransportError::connect("Connection refused (3)")),
    ]);
    let client = HttpClient::new(transport, config());

    let err = client.get("https://api.example.com/").await.unwrap_err();
    assert_eq!(err.to_string(), "Connection refused (3)");
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_retry_loop() {
    let transport = ScriptedTransport::with_replies(vec![Err(TransportError::connect("Connection refused"))]);
    let slow = ClientConfig::builder()
        .retry(
            RetryConfig::default()
                .with_base_delay(Duration::from_secs(60))
                .with_max_delay(Duration::from_secs(120))
                .with_jitter(false),
        )
        .build()
        .unwrap();
    let client = HttpClient::new(transport.clone(), slow);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let result = client
        .send_with_cancel(Request::get(url("https://api.example.com/")), &token)
        .await;
    assert!(matches!(result, Err(NetError::Cancelled)));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn fresh_cache_hits_skip_the_transport() {
    let transport = ScriptedTransport::with_replies(vec![reply(
        "https://example.com/doc",
        200,
        &[("cache-control", "max-age=600")],
        "cached body",
    )]);
    let cfg = ClientConfig::builder().cache(CacheConfig::default()).build().unwrap();
    let client = HttpClient::new(transport.clone(), cfg);

    let first = client.get("https://example.com/doc").await.unwrap();
    let second = client.get("https://example.com/doc#section").await.unwrap();

    assert_eq!(first.body, second.body);
    assert_eq!(second.headers.get(CACHE_CONTROL).unwrap(), "max-age=600");
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn stale_entry_is_revalidated_with_a_conditional_request() {
    let target = url("https://example.com/feed");
    let store = Arc::new(InMemoryCacheStore::new());

    let mut headers = HeaderMap::new();
    headers.insert(ETAG, HeaderValue::from_static("\"v1\""));
    let original = Response::new(target.clone(), 200, headers, b"X".to_vec());
    let now = chrono::Utc::now().timestamp();
    let stale = CacheEntry::from_response(&original, now - 30);
    store
        .set(&cache_key(&target), stale.to_value().unwrap(), Duration::from_secs(600))
        .unwrap();

    let transport = ScriptedTransport::with_replies(vec![reply("https://example.com/feed", 304, &[], "")]);
    let cfg = ClientConfig::builder().cache(CacheConfig::default()).build().unwrap();
    let client = HttpClient::new(transport.clone(), cfg).with_cache_store(store);

    let response = client.get("https://example.com/feed").await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "X");
    assert_eq!(transport.requests()[0].headers.get(IF_NONE_MATCH).unwrap(), "\"v1\"");

    // Refreshed: served from cache without another request.
    client.get("https://example.com/feed").await.unwrap();
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn errors_and_non_get_requests_are_not_cached() {
    let transport = ScriptedTransport::with_replies(vec![
        reply("https://example.com/missing", 404, &[], "nope"),
        reply("https://example.com/missing", 200, &[], "here now"),
        reply("https://example.com/submit", 200, &[], "posted"),
        reply("https://example.com/submit", 200, &[], "posted again"),
    ]);
    let cfg = ClientConfig::builder().cache(CacheConfig::default()).build().unwrap();
    let client = HttpClient::new(transport.clone(), cfg);

    assert_eq!(client.get("https://example.com/missing").await.unwrap().status, 404);
    assert_eq!(client.get("https://example.com/missing").await.unwrap().text(), "here now");

    let post = Request::new(Method::POST, url("https://example.com/submit")).with_body("a=1");
    client.send(post.clone()).await.unwrap();
    assert_eq!(client.send(post).await.unwrap().text(), "posted again");

    assert_eq!(transport.requests().len(), 4);
}

#[tokio::test]
async fn requests_get_the_configured_timeout() {
    let transport = ScriptedTransport::with_replies(vec![reply("https://example.com/", 200, &[], "")]);
    let client = HttpClient::new(transport.clone(), config());

    client.get("https://example.com/").await.unwrap();
    assert_eq!(transport.requests()[0].timeout, Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn invalid_url_is_rejected_before_sending() {
    let transport = ScriptedTransport::with_replies(vec![]);
    let client = HttpClient::new(transport.clone(), config());

    assert!(matches!(client.get("not a url").await, Err(NetError::InvalidUrl(_))));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn event_source_shares_the_cookie_jar() {
    let transport = ScriptedTransport::with_replies(vec![reply(
        "https://live.example.com/",
        200,
        &[("set-cookie", "token=t1")],
        "",
    )]);
    transport.streams.lock().unwrap().push_back("id: 1\ndata: hello\n\n");

    let cfg = ClientConfig::builder()
        .reconnect(ReconnectConfig::default().with_jitter(false))
        .build()
        .unwrap();
    let client = HttpClient::new(transport.clone(), cfg);
    client.get("https://live.example.com/").await.unwrap();

    let mut source = client.event_source(url("https://live.example.com/events"));
    assert!(matches!(source.recv().await, Some(SseMessage::Open)));
    match source.recv().await {
        Some(SseMessage::Event(event)) => assert_eq!(event.data.as_deref(), Some("hello")),
        other => panic!("unexpected message: {other:?}"),
    }
    source.close();

    let requests = transport.requests();
    assert_eq!(requests[1].headers.get(COOKIE).unwrap(), "token=t1");
    assert_eq!(requests[1].headers.get("accept").unwrap(), "text/event-stream");
}
