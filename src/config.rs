//! 请求ID中间件配置

use crate::context::{ContextStore, TaskLocalContextStore};
use crate::error::{BoxError, Error};
use crate::{DEFAULT_ATTRIBUTE, DEFAULT_HEADER_NAME, DEFAULT_PREFIX_SEPARATOR};
use std::fmt;
use std::sync::Arc;

/// 用于生成前缀的函数签名
type PrefixFn = Arc<dyn Fn() -> Result<String, BoxError> + Send + Sync>;

/// 请求ID前缀
///
/// 既可以是固定字符串，也可以是每次生成ID时都会重新调用的函数（例如按日期轮换的前缀）。
#[derive(Clone)]
pub enum IdPrefix {
    /// 固定前缀
    Literal(String),
    /// 每个请求调用一次的前缀生成函数
    Generator(PrefixFn),
}

impl IdPrefix {
    /// 固定前缀
    pub fn literal(prefix: impl Into<String>) -> Self {
        Self::Literal(prefix.into())
    }

    /// 使用不会失败的函数生成前缀
    ///
    /// # 示例
    /// ```
    /// use reqid::IdPrefix;
    ///
    /// let prefix = IdPrefix::generator(|| "dyn-prefix".to_string());
    /// ```
    pub fn generator<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Generator(Arc::new(move || Ok(f())))
    }

    /// 使用可能失败的函数生成前缀，失败会作为请求期错误向上传播
    pub fn try_generator<F>(f: F) -> Self
    where
        F: Fn() -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self::Generator(Arc::new(f))
    }

    /// 解析出本次请求使用的根前缀
    pub(crate) fn resolve(&self) -> Result<String, Error> {
        match self {
            Self::Literal(prefix) => Ok(prefix.clone()),
            Self::Generator(f) => f().map_err(Error::PrefixGenerator),
        }
    }
}

impl fmt::Debug for IdPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(prefix) => f.debug_tuple("Literal").field(prefix).finish(),
            Self::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

impl From<&str> for IdPrefix {
    fn from(prefix: &str) -> Self {
        Self::literal(prefix)
    }
}

impl From<String> for IdPrefix {
    fn from(prefix: String) -> Self {
        Self::Literal(prefix)
    }
}

/// 请求ID中间件配置选项
///
/// 每个中间件实例构造一次，之后只读。除 `id_prefix` 外所有字段都有默认值：
///
/// | 字段 | 默认值 |
/// |------|--------|
/// | `set_header` | `true` |
/// | `header_name` | `"request-id"` |
/// | `use_id_from_request` | `false` |
/// | `attribute` | `"reqid"` |
/// | `set_in_context` | `false` |
/// | `id_prefix` | 无（必填） |
/// | `prefix_separator` | `":"` |
/// | `enable_span` | `true` |
///
/// `use_id_from_request` 与 `prefix_separator` 的默认值在不同部署之间并不统一，
/// 依赖旧行为（复用入站ID、`/` 分隔符）的调用方应显式设置。
#[derive(Clone)]
pub struct ReqidConfig {
    /// 是否在响应中写入请求ID头部
    pub set_header: bool,
    /// 读取入站ID和写入出站ID所用的头部名称（大小写不敏感）
    pub header_name: String,
    /// 是否原样复用入站请求头中的ID
    pub use_id_from_request: bool,
    /// 请求ID在请求对象和上下文存储中暴露的名称
    pub attribute: String,
    /// 是否同时写入上下文存储
    pub set_in_context: bool,
    /// 请求ID前缀（必填）
    pub id_prefix: Option<IdPrefix>,
    /// 前缀与随机部分之间的分隔符
    pub prefix_separator: String,
    /// 是否为每个请求创建 tracing span
    pub enable_span: bool,
    /// `set_in_context` 开启时写入的存储
    pub context_store: Arc<dyn ContextStore>,
}

impl Default for ReqidConfig {
    fn default() -> Self {
        Self {
            set_header: true,
            header_name: DEFAULT_HEADER_NAME.to_string(),
            use_id_from_request: false,
            attribute: DEFAULT_ATTRIBUTE.to_string(),
            set_in_context: false,
            id_prefix: None,
            prefix_separator: DEFAULT_PREFIX_SEPARATOR.to_string(),
            enable_span: true,
            context_store: Arc::new(TaskLocalContextStore),
        }
    }
}

impl ReqidConfig {
    /// 使用给定前缀和其余默认值创建配置
    pub fn new(id_prefix: impl Into<IdPrefix>) -> Self {
        Self::default().with_id_prefix(id_prefix)
    }

    pub fn with_id_prefix(mut self, id_prefix: impl Into<IdPrefix>) -> Self {
        self.id_prefix = Some(id_prefix.into());
        self
    }

    pub fn with_set_header(mut self, set_header: bool) -> Self {
        self.set_header = set_header;
        self
    }

    pub fn with_header_name(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = header_name.into();
        self
    }

    pub fn with_use_id_from_request(mut self, use_id_from_request: bool) -> Self {
        self.use_id_from_request = use_id_from_request;
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    pub fn with_set_in_context(mut self, set_in_context: bool) -> Self {
        self.set_in_context = set_in_context;
        self
    }

    pub fn with_prefix_separator(mut self, separator: impl Into<String>) -> Self {
        self.prefix_separator = separator.into();
        self
    }

    pub fn with_span(mut self, enable_span: bool) -> Self {
        self.enable_span = enable_span;
        self
    }

    /// 注入自定义的上下文存储，替换默认的 task-local 存储
    pub fn with_context_store<C>(mut self, store: C) -> Self
    where
        C: ContextStore + 'static,
    {
        self.context_store = Arc::new(store);
        self
    }
}

impl fmt::Debug for ReqidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqidConfig")
            .field("set_header", &self.set_header)
            .field("header_name", &self.header_name)
            .field("use_id_from_request", &self.use_id_from_request)
            .field("attribute", &self.attribute)
            .field("set_in_context", &self.set_in_context)
            .field("id_prefix", &self.id_prefix)
            .field("prefix_separator", &self.prefix_separator)
            .field("enable_span", &self.enable_span)
            .finish_non_exhaustive()
    }
}
