//! REST engine behavior against a scripted loopback server.

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Instant,
};

use hyper::{
    service::{make_service_fn, service_fn},
    Body, Response, Server,
};
use ripcord_http::{Request, Rest, RestError};
use ripcord_model::User;

#[derive(Clone)]
struct Scripted {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: &'static str,
}

impl Scripted {
    fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));

        self
    }
}

type Script = Arc<Mutex<Vec<Scripted>>>;

/// Serves the scripted responses in order; anything past the script gets an
/// empty 200.
async fn serve(responses: Vec<Scripted>) -> (SocketAddr, Script) {
    let script: Script = Arc::new(Mutex::new(responses));
    let handler_script = Arc::clone(&script);

    let make = make_service_fn(move |_| {
        let script = Arc::clone(&handler_script);

        async move {
            Ok::<_, Infallible>(service_fn(move |_req| {
                let script = Arc::clone(&script);

                async move {
                    let next = {
                        let mut script = script.lock().unwrap();

                        if script.is_empty() {
                            Scripted::new(200, "{}")
                        } else {
                            script.remove(0)
                        }
                    };

                    let mut builder = Response::builder().status(next.status);

                    for (name, value) in &next.headers {
                        builder = builder.header(*name, value);
                    }

                    Ok::<_, Infallible>(builder.body(Body::from(next.body)).unwrap())
                }
            }))
        }
    });

    let server = Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(make);
    let addr = server.local_addr();
    tokio::spawn(server);

    (addr, script)
}

fn rest_for(addr: SocketAddr) -> Rest {
    Rest::with_endpoint("test-token", &format!("http://{addr}/api/v6"))
}

const USER_BODY: &str = r#"{"id":"1","username":"someone","discriminator":"0001"}"#;

#[tokio::test]
async fn success_decodes_the_entity() {
    let (addr, _) = serve(vec![Scripted::new(200, USER_BODY)]).await;

    let user: User = rest_for(addr)
        .request(Request::get("/users/1"))
        .await
        .unwrap();

    assert_eq!(user.id.get(), 1);
    assert_eq!(user.username, "someone");
}

#[tokio::test]
async fn global_rate_limit_delays_and_retries() {
    let (addr, script) = serve(vec![
        Scripted::new(429, "{}")
            .header("X-RateLimit-Global", "true")
            .header("Retry-After", "200"),
        Scripted::new(200, USER_BODY),
    ])
    .await;

    let started = Instant::now();

    let user: User = rest_for(addr)
        .request(Request::get("/users/1"))
        .await
        .unwrap();

    assert_eq!(user.id.get(), 1);
    assert!(started.elapsed().as_millis() >= 200, "must wait Retry-After out");
    assert!(script.lock().unwrap().is_empty(), "both responses consumed");
}

#[tokio::test]
async fn attempts_are_capped() {
    let responses = vec![
        Scripted::new(429, "{}")
            .header("X-RateLimit-Global", "true")
            .header("Retry-After", "10");
        5
    ];

    let (addr, script) = serve(responses).await;

    let result = rest_for(addr)
        .request::<User>(Request::get("/users/1"))
        .await;

    assert!(matches!(result, Err(RestError::RetryExhausted(5))));
    assert!(script.lock().unwrap().is_empty(), "exactly five attempts");
}

#[tokio::test]
async fn relative_redirect_inside_base_is_followed() {
    let (addr, script) = serve(vec![
        Scripted::new(302, "").header("Location", "/api/v6/users/2"),
        Scripted::new(200, USER_BODY),
    ])
    .await;

    let user: User = rest_for(addr)
        .request(Request::get("/users/1"))
        .await
        .unwrap();

    assert_eq!(user.username, "someone");
    assert!(script.lock().unwrap().is_empty());
}

#[tokio::test]
async fn foreign_redirect_is_rejected() {
    let (addr, _) = serve(vec![
        Scripted::new(302, "").header("Location", "https://elsewhere.example/api/v6/users/2"),
    ])
    .await;

    let result = rest_for(addr)
        .request::<User>(Request::get("/users/1"))
        .await;

    assert!(matches!(result, Err(RestError::BadRedirect)));
}

#[tokio::test]
async fn client_errors_surface_status_and_body() {
    let (addr, _) = serve(vec![Scripted::new(404, r#"{"message":"Unknown User"}"#)]).await;

    let result = rest_for(addr)
        .request::<User>(Request::get("/users/1"))
        .await;

    match result {
        Err(RestError::Status { status, body }) => {
            assert_eq!(status, 404);
            assert!(body.contains("Unknown User"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn no_content_maps_to_unit() {
    let (addr, _) = serve(vec![Scripted::new(204, "")]).await;

    rest_for(addr)
        .request_unit(Request::delete("/channels/1/messages/2"))
        .await
        .unwrap();
}

#[tokio::test]
async fn bucket_headers_feed_the_limiter() {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let (addr, script) = serve(vec![
        Scripted::new(200, USER_BODY)
            .header("X-RateLimit-Limit", "5")
            .header("X-RateLimit-Remaining", "4")
            .header("X-RateLimit-Reset", (now + 60).to_string()),
        Scripted::new(200, USER_BODY),
    ])
    .await;

    let rest = rest_for(addr);

    let _: User = rest.request(Request::get("/users/1")).await.unwrap();

    // remaining is positive, so the second call must not block
    let started = Instant::now();
    let _: User = rest.request(Request::get("/users/1")).await.unwrap();

    assert!(started.elapsed().as_millis() < 1_000);
    assert!(script.lock().unwrap().is_empty());
}
