//! 请求ID中间件
//!
//! 为每个入站HTTP请求分配一个关联ID（或复用入站头部中的ID），挂到请求对象上，
//! 可选地写入响应头和请求级上下文存储，用于分布式追踪和日志关联。
//! 核心功能与Web框架无关，并为Axum提供了开箱即用的中间件支持。
//!
//! ## Usage
//!
//! ### 基础用法：生成 RequestId
//! ```
//! use reqid::{IdPrefix, RequestIdGenerator};
//!
//! let generator = RequestIdGenerator::new("api", ":");
//! let request_id = generator.generate().unwrap();
//! assert!(request_id.as_str().starts_with("api:"));
//!
//! // 前缀也可以是每次调用都会重新执行的函数
//! let generator = RequestIdGenerator::new(IdPrefix::generator(|| "dyn-prefix".to_string()), ":");
//! assert!(generator.generate().unwrap().as_str().starts_with("dyn-prefix:"));
//! ```
//!
//! ### 配置校验
//! ```
//! use reqid::{Error, Reqid, ReqidConfig};
//!
//! // 缺少 id_prefix 会在构造时失败
//! assert!(matches!(Reqid::new(ReqidConfig::default()), Err(Error::MissingIdPrefix)));
//! assert!(Reqid::new(ReqidConfig::new("api")).is_ok());
//! ```
//!
//! ### Axum 集成（需要启用 axum feature）
//! ```ignore
//! use axum::{error_handling::HandleErrorLayer, routing::get, Router};
//! use reqid::{handle_error, RequestContextLayer, RequestId, ReqidConfig, ReqidLayer};
//! use tower::ServiceBuilder;
//!
//! async fn handler(request_id: RequestId) -> String {
//!     // 直接在函数签名中获取 RequestId
//!     format!("Hello! Your request ID is: {}", request_id)
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ReqidConfig::new("api").with_set_in_context(true);
//!
//!     let app = Router::new().route("/", get(handler)).layer(
//!         ServiceBuilder::new()
//!             .layer(HandleErrorLayer::new(handle_error))
//!             .layer(RequestContextLayer::new())
//!             .layer(ReqidLayer::new(config).unwrap()),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

mod config;
pub mod context;
mod error;
mod host;
mod middleware;
mod request_id;

pub use config::{IdPrefix, ReqidConfig};
pub use context::{ContextStore, RequestContext, TaskLocalContextStore};
pub use error::{BoxError, Error};
pub use host::{get_host_details, HostDetails};
pub use middleware::{RequestAttributes, RequestIdExt, Reqid, Resolved};
pub use request_id::{RequestId, RequestIdGenerator};

/// 默认的请求ID头部名称
pub const DEFAULT_HEADER_NAME: &str = "request-id";

/// 默认的请求属性名称
pub const DEFAULT_ATTRIBUTE: &str = "reqid";

/// 默认的前缀分隔符
pub const DEFAULT_PREFIX_SEPARATOR: &str = ":";

// -- axum feature --
#[cfg(feature = "axum")]
mod integrations;
#[cfg(feature = "axum")]
pub use integrations::axum::{
    handle_error, MissingRequestId, RequestContextLayer, RequestContextService, ReqidLayer,
    ReqidService,
};
