//! 请求ID中间件的错误类型

/// tower 边界上使用的通用错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 请求ID中间件的错误
///
/// 分为两类：
/// - 构造期错误（[`Error::MissingIdPrefix`]、[`Error::InvalidHeaderName`]），在注册中间件之前返回；
/// - 请求期错误（其余变体），从处理单元中原样向上传播，不做任何回退。
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 未配置 `id_prefix`
    #[error("reqid: idPrefix config value is required")]
    MissingIdPrefix,

    /// 头部名称无法解析为合法的HTTP头部名称
    #[error("reqid: invalid header name {name:?}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },

    /// 请求ID无法编码为HTTP头部值
    #[error("reqid: request id {id:?} is not a valid header value")]
    InvalidHeaderValue {
        id: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },

    /// 前缀生成函数执行失败
    #[error("reqid: id prefix generator failed")]
    PrefixGenerator(#[source] BoxError),

    /// 当前不在请求上下文作用域内
    #[error("reqid: no request context in scope (is RequestContextLayer installed?)")]
    ContextUnavailable,

    /// 外部上下文存储写入失败
    #[error("reqid: context store rejected key {key:?}")]
    ContextStore {
        key: String,
        #[source]
        source: BoxError,
    },
}
