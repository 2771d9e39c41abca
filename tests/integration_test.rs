//! 集成测试：通过 Axum 路由验证请求ID的生成、复用和传播

#![cfg(feature = "axum")]

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::Request,
    http::{Method, StatusCode},
    routing::get,
    Router,
};
use reqid::{
    context, get_host_details, handle_error, ContextStore, IdPrefix, RequestContext,
    RequestContextLayer, RequestId, RequestIdExt, ReqidConfig, ReqidLayer,
};
use tower::{ServiceBuilder, ServiceExt};

const INBOUND_ID: &str = "request:123456789";

/// 返回请求上 `reqid` 属性的处理器
async fn reqid_handler(req: Request) -> String {
    tracing::info!("Test handler called");
    req.request_id("reqid")
        .map(RequestId::to_string)
        .unwrap_or_default()
}

fn app(config: ReqidConfig) -> Router {
    Router::new().route("/test", get(reqid_handler)).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(ReqidLayer::new(config).unwrap()),
    )
}

fn request(inbound: Option<(&str, &str)>) -> Request {
    let mut builder = Request::builder().method(Method::GET).uri("/test");
    if let Some((name, value)) = inbound {
        builder = builder.header(name, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn header<'a>(response: &'a axum::response::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).map(|v| v.to_str().unwrap())
}

/// 测试请求对象上带有使用固定前缀生成的ID
#[tokio::test]
async fn test_request_attribute_with_literal_prefix() {
    let response = app(ReqidConfig::new("test")).oneshot(request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let attached = body_string(response).await;
    let token = attached.strip_prefix("test:").expect("应使用默认分隔符 ':'");
    assert!(!token.is_empty());
}

/// 测试自定义分隔符
#[tokio::test]
async fn test_custom_prefix_separator() {
    let config = ReqidConfig::new("test").with_prefix_separator("|");
    let response = app(config).oneshot(request(None)).await.unwrap();

    let attached = body_string(response).await;
    assert!(attached.starts_with("test|"), "ID应匹配 ^test\\|.+$: {attached}");
    assert!(attached.len() > "test|".len());
}

/// 默认配置下响应头带有 request-id，且与请求上的值一致
#[tokio::test]
async fn test_default_response_header() {
    let response = app(ReqidConfig::new("test")).oneshot(request(None)).await.unwrap();

    let header_id = header(&response, "request-id").expect("响应应包含 request-id").to_owned();
    assert_eq!(body_string(response).await, header_id);
}

/// setHeader 关闭时响应中没有请求ID头部
#[tokio::test]
async fn test_header_suppressed() {
    let config = ReqidConfig::new("test").with_set_header(false);
    let response = app(config).oneshot(request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("request-id").is_none());
    // 请求属性始终设置
    assert!(body_string(response).await.starts_with("test:"));
}

/// 自定义头部名称
#[tokio::test]
async fn test_custom_header_name() {
    let config = ReqidConfig::new("test").with_header_name("custom-header");
    let response = app(config).oneshot(request(None)).await.unwrap();

    assert!(header(&response, "custom-header").is_some());
    assert!(header(&response, "request-id").is_none());
}

/// 未开启复用时，不会原样回传入站ID
#[tokio::test]
async fn test_inbound_id_not_reused_by_default() {
    let response = app(ReqidConfig::new("test"))
        .oneshot(request(Some(("request-id", INBOUND_ID))))
        .await
        .unwrap();

    let header_id = header(&response, "request-id").unwrap();
    assert_ne!(header_id, INBOUND_ID);
    assert!(header_id.starts_with("test:"));
}

/// 开启复用时原样回传入站ID
#[tokio::test]
async fn test_inbound_id_reused() {
    let config = ReqidConfig::new("test").with_use_id_from_request(true);
    let response = app(config)
        .oneshot(request(Some(("request-id", INBOUND_ID))))
        .await
        .unwrap();

    assert_eq!(header(&response, "request-id"), Some(INBOUND_ID));
    assert_eq!(body_string(response).await, INBOUND_ID);
}

/// 非ASCII的UTF-8入站ID同样原样复用并回传
#[tokio::test]
async fn test_utf8_inbound_id_reused() {
    let config = ReqidConfig::new("test").with_use_id_from_request(true);
    let response = app(config)
        .oneshot(request(Some(("request-id", "req-é-1"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let echoed = response.headers().get("request-id").unwrap();
    assert_eq!(echoed.as_bytes(), "req-é-1".as_bytes());
    assert_eq!(body_string(response).await, "req-é-1");
}

/// 处理器自己设置的同名响应头不会被覆盖
#[tokio::test]
async fn test_handler_header_wins() {
    async fn handler() -> ([(&'static str, &'static str); 1], &'static str) {
        ([("request-id", "handler-set")], "OK")
    }

    let app = Router::new().route("/test", get(handler)).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(ReqidLayer::new(ReqidConfig::new("test")).unwrap()),
    );

    let response = app.oneshot(request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "request-id"), Some("handler-set"));
    assert_eq!(response.headers().get_all("request-id").iter().count(), 1);
}

/// 入站头部名称大小写不敏感
#[tokio::test]
async fn test_inbound_header_case_insensitive() {
    let config = ReqidConfig::new("test")
        .with_header_name("Request-ID")
        .with_use_id_from_request(true);
    let response = app(config)
        .oneshot(request(Some(("REQUEST-ID", INBOUND_ID))))
        .await
        .unwrap();

    assert_eq!(header(&response, "request-id"), Some(INBOUND_ID));
}

/// 开启复用但请求中没有ID时生成新ID
#[tokio::test]
async fn test_inbound_reuse_falls_back_to_generation() {
    let config = ReqidConfig::new(IdPrefix::generator(|| "generated-id".to_string()))
        .with_use_id_from_request(true);
    let response = app(config).oneshot(request(None)).await.unwrap();

    assert!(header(&response, "request-id").unwrap().starts_with("generated-id:"));
}

/// 使用函数生成前缀
#[tokio::test]
async fn test_callable_prefix() {
    let config = ReqidConfig::new(IdPrefix::generator(|| "dyn-prefix".to_string()));
    let response = app(config).oneshot(request(None)).await.unwrap();

    assert!(body_string(response).await.starts_with("dyn-prefix:"));
}

/// 默认不写入上下文存储
#[tokio::test]
async fn test_context_not_written_by_default() {
    async fn handler(ctx: RequestContext) -> &'static str {
        assert!(ctx.is_empty(), "默认不应写入上下文");
        assert_eq!(context::get("reqid"), None);
        "OK"
    }

    let app = Router::new().route("/test", get(handler)).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(RequestContextLayer::new())
            .layer(ReqidLayer::new(ReqidConfig::new("test")).unwrap()),
    );

    let response = app.oneshot(request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// 开启 setInContext 后上下文中的值等于请求上的ID
#[tokio::test]
async fn test_context_written_when_enabled() {
    async fn handler(req: Request) -> String {
        let attached = req.request_id("reqid").unwrap().to_string();
        // 处理函数调用链之外也能读到
        assert_eq!(lookup_from_anywhere("reqid"), Some(attached.clone()));
        attached
    }

    let app = Router::new().route("/test", get(handler)).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(RequestContextLayer::new())
            .layer(ReqidLayer::new(ReqidConfig::new("test").with_set_in_context(true)).unwrap()),
    );

    let response = app.oneshot(request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let header_id = header(&response, "request-id").unwrap().to_owned();
    assert_eq!(body_string(response).await, header_id);
}

fn lookup_from_anywhere(key: &str) -> Option<String> {
    context::get(key)
}

/// 自定义属性名同时作用于请求对象和上下文存储
#[tokio::test]
async fn test_custom_attribute() {
    async fn handler(ctx: RequestContext, req: Request) -> String {
        assert!(req.request_id("reqid").is_none());
        let attached = req.request_id("requestId").unwrap().to_string();
        assert_eq!(ctx.get("requestId"), Some(attached.clone()));
        assert_eq!(ctx.get("reqid"), None);
        attached
    }

    let config = ReqidConfig::new("test")
        .with_attribute("requestId")
        .with_set_in_context(true);
    let app = Router::new().route("/test", get(handler)).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(RequestContextLayer::new())
            .layer(ReqidLayer::new(config).unwrap()),
    );

    let response = app.oneshot(request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.starts_with("test:"));
}

/// 注入自定义上下文存储
#[tokio::test]
async fn test_injected_context_store() {
    let store = RequestContext::new();
    let config = ReqidConfig::new("test")
        .with_set_in_context(true)
        .with_context_store(store.clone());

    // 不需要 RequestContextLayer
    let response = app(config).oneshot(request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let header_id = header(&response, "request-id").unwrap().to_owned();
    assert_eq!(store.get("reqid"), Some(header_id));
}

/// 主机信息与运行环境一致
#[test]
fn test_host_details() {
    let details = get_host_details();
    assert_eq!(details.pid, std::process::id().to_string());
    assert!(!details.hostname.is_empty());
}
