use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use contact_relay::{
    AppState, Config,
    error::DispatchError,
    handlers::router,
    mailer::EmailSender,
    models::OutboundEmail,
};

const SITE: &str = "https://solarastudios.com.br";

#[derive(Default)]
struct FakeSender {
    sent: Mutex<Vec<OutboundEmail>>,
    fail: bool,
}

#[async_trait]
impl EmailSender for FakeSender {
    async fn send(&self, _api_key: &str, email: &OutboundEmail) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail {
            return Err(DispatchError::Rejected {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

fn config() -> Config {
    Config {
        api_key: Some("re_test".into()),
        receiver: Some("contato@solarastudios.com.br".into()),
        sender: "Contato Solara Studios <contato-site@solarastudios.com.br>".into(),
        allowed_origins: vec!["http://localhost:3000".into(), SITE.into()],
        rate_limit: 5,
        rate_window: Duration::from_secs(60),
        max_tracked_clients: 1000,
        cleanup_interval: Duration::from_secs(60),
        trusted_proxy_hops: 0,
        resend_url: "http://127.0.0.1:9/emails".into(),
        email_timeout: Duration::from_secs(1),
        max_body_bytes: 8 * 1024 * 1024,
    }
}

fn app(config: Config, sender: Arc<FakeSender>) -> Router {
    router(Arc::new(AppState::new(config, sender)))
}

fn post(body: impl Into<Body>, peer: &str) -> Request<Body> {
    let mut req = Request::builder()
        .method(Method::POST)
        .uri("/contact")
        .header(header::ORIGIN, SITE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    req
}

fn post_json(body: &Value, peer: &str) -> Request<Body> {
    post(body.to_string(), peer)
}

fn ana() -> Value {
    json!({ "name": "Ana", "email": "ana@x.com", "message": "Olá" })
}

async fn body_bytes(res: Response) -> Vec<u8> {
    to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(res: Response) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

fn assert_cors(res: &Response, origin: Option<&str>) {
    let h = res.headers();
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    match origin {
        Some(o) => assert_eq!(h[header::ACCESS_CONTROL_ALLOW_ORIGIN], o),
        None => assert!(h.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none()),
    }
}

#[tokio::test]
async fn valid_submission_is_sent() {
    let sender = Arc::new(FakeSender::default());
    let res = app(config(), sender.clone())
        .oneshot(post_json(&ana(), "192.0.2.1:4000"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_cors(&res, Some(SITE));
    assert_eq!(body_json(res).await, json!({ "message": "E-mail enviado com sucesso!" }));

    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reply_to, "ana@x.com");
    assert_eq!(sent[0].to, "contato@solarastudios.com.br");
    assert_eq!(sent[0].text, "Nome: Ana\nE-mail: ana@x.com\nMensagem:\nOlá");
}

#[tokio::test]
async fn provider_failure_returns_generic_error() {
    let sender = Arc::new(FakeSender {
        fail: true,
        ..Default::default()
    });
    let res = app(config(), sender.clone())
        .oneshot(post_json(&ana(), "192.0.2.1:4000"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&res, Some(SITE));
    assert_eq!(body_json(res).await, json!({ "error": "Erro ao enviar o e-mail." }));
    assert_eq!(sender.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn sixth_request_in_window_is_rate_limited() {
    let sender = Arc::new(FakeSender::default());
    let app = app(config(), sender.clone());

    for _ in 0..5 {
        let res = app
            .clone()
            .oneshot(post_json(&ana(), "192.0.2.7:4000"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .clone()
        .oneshot(post_json(&ana(), "192.0.2.7:4001"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_cors(&res, Some(SITE));
    assert!(res.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(
        body_json(res).await,
        json!({ "error": "Muitas requisições. Tente novamente em breve." })
    );
    assert_eq!(sender.sent.lock().unwrap().len(), 5);

    // another client is unaffected
    let res = app
        .oneshot(post_json(&ana(), "192.0.2.8:4000"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn forged_forwarded_hops_share_the_proxied_client_window() {
    let mut config = config();
    config.trusted_proxy_hops = 1;
    let sender = Arc::new(FakeSender::default());
    let app = app(config, sender.clone());

    // every request comes through the same proxy, for the same real client,
    // with a different made-up address in front
    let mut statuses = Vec::new();
    for i in 0..20 {
        let mut req = post_json(&ana(), "10.0.0.2:443");
        let forwarded = format!("10.9.9.{i}, 198.51.100.7");
        req.headers_mut()
            .insert("x-forwarded-for", forwarded.parse().unwrap());
        statuses.push(app.clone().oneshot(req).await.unwrap().status());
    }

    let admitted = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(admitted, 5);
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(sender.sent.lock().unwrap().len(), 5);

    // a different real client behind the same proxy still gets through
    let mut req = post_json(&ana(), "10.0.0.2:443");
    req.headers_mut()
        .insert("x-forwarded-for", "198.51.100.8".parse().unwrap());
    assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_runs_before_parsing() {
    let app = app(config(), Arc::new(FakeSender::default()));

    for _ in 0..5 {
        app.clone().oneshot(post("not json", "192.0.2.9:1")).await.unwrap();
    }
    let res = app.oneshot(post("not json", "192.0.2.9:1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn missing_api_key_is_reported_as_plain_text() {
    let mut config = config();
    config.api_key = None;
    let sender = Arc::new(FakeSender::default());
    let res = app(config, sender.clone())
        .oneshot(post_json(&ana(), "192.0.2.1:4000"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&res, Some(SITE));
    assert_eq!(body_bytes(res).await, "RESEND_API_KEY não definida!".as_bytes());
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_receiver_is_reported_as_plain_text() {
    let mut config = config();
    config.receiver = None;
    let res = app(config, Arc::new(FakeSender::default()))
        .oneshot(post_json(&ana(), "192.0.2.1:4000"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_bytes(res).await,
        "CONTACT_RECEIVER_EMAIL não definida!".as_bytes()
    );
}

#[tokio::test]
async fn malformed_body_is_a_send_failure() {
    let sender = Arc::new(FakeSender::default());
    let res = app(config(), sender.clone())
        .oneshot(post("{\"name\": ", "192.0.2.1:4000"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(res).await, json!({ "error": "Erro ao enviar o e-mail." }));
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_attachment_is_rejected_before_dispatch() {
    let sender = Arc::new(FakeSender::default());
    let body = json!({
        "name": "Ana", "email": "ana@x.com", "message": "Olá",
        "attachments": [{ "name": "a.txt", "content": "QQ==" }]
    });
    let res = app(config(), sender.clone())
        .oneshot(post_json(&body, "192.0.2.1:4000"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_field_wins_over_too_many_attachments() {
    let file = json!({ "name": "a.txt", "content": "QQ==", "type": "text/plain", "size": 1 });
    let body = json!({
        "email": "ana@x.com", "message": "Olá",
        "attachments": vec![file; 6]
    });
    let res = app(config(), Arc::new(FakeSender::default()))
        .oneshot(post_json(&body, "192.0.2.1:4000"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_cors(&res, Some(SITE));
    assert_eq!(body_json(res).await, json!({ "error": "Campos obrigatórios ausentes." }));
}

#[tokio::test]
async fn attachment_limits() {
    let app = app(config(), Arc::new(FakeSender::default()));
    let file = |size: u64| {
        json!({
            "name": "a.bin",
            "content": "AA==",
            "type": "application/octet-stream",
            "size": size
        })
    };
    let with = |files: Vec<Value>| {
        let mut body = ana();
        body["attachments"] = Value::Array(files);
        body
    };

    let res = app
        .clone()
        .oneshot(post_json(&with(vec![file(1_048_576); 5]), "192.0.2.20:1"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(post_json(&with(vec![file(1); 6]), "192.0.2.21:1"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await, json!({ "error": "Máximo de 5 arquivos permitidos." }));

    let res = app
        .oneshot(post_json(&with(vec![file(1_048_577)]), "192.0.2.22:1"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await, json!({ "error": "Cada arquivo deve ter no máximo 1MB." }));
}

#[tokio::test]
async fn foreign_origin_gets_no_allow_origin() {
    let mut req = post_json(&ana(), "192.0.2.1:4000");
    req.headers_mut()
        .insert(header::ORIGIN, "https://evil.example".parse().unwrap());

    let res = app(config(), Arc::new(FakeSender::default()))
        .oneshot(req)
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_cors(&res, None);
}

#[tokio::test]
async fn preflight_answers_without_body() {
    let app = app(config(), Arc::new(FakeSender::default()));

    for (origin, echoed) in [
        (Some("http://localhost:3000"), Some("http://localhost:3000")),
        (Some("https://evil.example"), None),
        (None, None),
    ] {
        let mut builder = Request::builder().method(Method::OPTIONS).uri("/contact");
        if let Some(o) = origin {
            builder = builder.header(header::ORIGIN, o);
        }
        let res = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_cors(&res, echoed);
        assert!(body_bytes(res).await.is_empty());
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let res = app(config(), Arc::new(FakeSender::default()))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "healthy");
}
