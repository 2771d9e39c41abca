//! Axum框架的请求ID中间件

use crate::{
    config::ReqidConfig,
    context::{self, RequestContext},
    error::{BoxError, Error},
    middleware::Reqid,
    request_id::RequestId,
};
use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::Instrument;

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// 请求ID中间件层
///
/// 每个请求解析（复用或生成）一个请求ID，挂到请求扩展上，按配置写入上下文存储和响应头。
/// 处理失败时以 [`BoxError`] 向上传播，由外层的 `HandleErrorLayer` 处理，例如：
///
/// ```no_run
/// use axum::{error_handling::HandleErrorLayer, routing::get, Router};
/// use reqid::{handle_error, ReqidConfig, ReqidLayer};
/// use tower::ServiceBuilder;
///
/// # fn main() -> Result<(), reqid::Error> {
/// let app: Router = Router::new()
///     .route("/", get(|| async { "ok" }))
///     .layer(
///         ServiceBuilder::new()
///             .layer(HandleErrorLayer::new(handle_error))
///             .layer(ReqidLayer::new(ReqidConfig::new("api"))?),
///     );
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ReqidLayer {
    reqid: Reqid,
}

impl ReqidLayer {
    /// 校验配置并创建中间件层
    ///
    /// # 错误
    /// 未提供 `id_prefix` 或头部名称非法时返回错误，此时不应注册该中间件。
    pub fn new(config: ReqidConfig) -> Result<Self, Error> {
        Reqid::new(config).map(Self::from_reqid)
    }

    /// 使用已构造的处理单元创建中间件层
    pub fn from_reqid(reqid: Reqid) -> Self {
        Self { reqid }
    }
}

impl<S> Layer<S> for ReqidLayer {
    type Service = ReqidService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ReqidService {
            inner,
            reqid: self.reqid.clone(),
        }
    }
}

/// 请求ID服务
#[derive(Clone, Debug)]
pub struct ReqidService<S> {
    inner: S,
    reqid: Reqid,
}

impl<S> Service<Request> for ReqidService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = BoxError;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        // 在调用下游之前完成全部处理，失败时不再继续处理链
        let resolved = match self.reqid.handle(&mut req) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::debug!(error = %err, "Failed to assign request id");
                let err: BoxError = err.into();
                return Box::pin(std::future::ready(Err::<Response, _>(err)));
            }
        };

        let span = self.reqid.enable_span().then(|| {
            tracing::info_span!(
                "request",
                request_id = %resolved.id,
                method = %req.method(),
                uri = %req.uri()
            )
        });

        let future = self.inner.call(req);

        let future = async move {
            let mut response = future.await.map_err(Into::<BoxError>::into)?;
            resolved.apply(response.headers_mut());
            Ok::<_, BoxError>(response)
        };

        match span {
            Some(span) => Box::pin(future.instrument(span)),
            None => Box::pin(future),
        }
    }
}

/// 请求上下文中间件层
///
/// 为每个请求建立一个新的 [`RequestContext`] 作用域，内层服务的同步 `call`
/// 和返回的 future 都在该作用域内执行。使用默认存储并开启 `set_in_context`
/// 时，必须放在 [`ReqidLayer`] 外层。
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestContextLayer;

impl RequestContextLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContextService { inner }
    }
}

/// 请求上下文服务
#[derive(Clone, Debug)]
pub struct RequestContextService<S> {
    inner: S,
}

impl<S> Service<Request> for RequestContextService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let ctx = RequestContext::new();
        req.extensions_mut().insert(ctx.clone());

        let inner = &mut self.inner;
        let future = context::sync_with_request_context(ctx.clone(), move || inner.call(req));

        Box::pin(context::with_request_context(ctx, future))
    }
}

/// 把中间件错误转换为 `500` 响应，配合 `axum::error_handling::HandleErrorLayer` 使用
pub async fn handle_error(err: BoxError) -> Response {
    tracing::error!(error = %err, "Request id middleware failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

// -- RequestId Extractor --

/// 请求扩展中缺少请求ID，通常是因为没有安装 [`ReqidLayer`]
#[derive(Debug, Clone, Copy)]
pub struct MissingRequestId;

impl IntoResponse for MissingRequestId {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Missing request id. Is ReqidLayer installed?",
        )
            .into_response()
    }
}

/// Axum 提取器，用于在 handler 函数签名中直接获取 RequestId
///
/// # 示例
/// ```no_run
/// use reqid::RequestId;
///
/// async fn my_handler(request_id: RequestId) -> String {
///     tracing::info!(request_id = %request_id, "Handler started");
///     format!("Hello! Your request ID is: {}", request_id)
/// }
/// ```
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = MissingRequestId;

    /// 读取最近一个 [`ReqidLayer`] 写入的请求ID
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .ok_or(MissingRequestId)
    }
}

/// Axum 提取器，获取当前请求的上下文句柄（需要 [`RequestContextLayer`]）
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
