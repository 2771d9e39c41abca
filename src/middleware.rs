//! 与Web框架无关的请求ID处理单元
//!
//! [`Reqid`] 由 [`ReqidConfig`] 构造一次，之后对每个请求执行：
//! 解析ID（复用或生成）→ 挂到请求上 → 可选写入上下文存储 → 准备响应头。

use crate::config::ReqidConfig;
use crate::context::ContextStore;
use crate::error::Error;
use crate::request_id::{RequestId, RequestIdGenerator};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Extensions, Request};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 已配置的请求ID处理单元
///
/// 构造后只读，可以廉价克隆并在多个请求之间共享。
#[derive(Clone)]
pub struct Reqid {
    generator: RequestIdGenerator,
    header_name: HeaderName,
    set_header: bool,
    use_id_from_request: bool,
    attribute: Arc<str>,
    set_in_context: bool,
    enable_span: bool,
    context_store: Arc<dyn ContextStore>,
}

impl Reqid {
    /// 校验配置并创建处理单元
    ///
    /// # 错误
    /// - 未提供 `id_prefix` 时返回 [`Error::MissingIdPrefix`]
    /// - `header_name` 不是合法的头部名称时返回 [`Error::InvalidHeaderName`]
    pub fn new(config: ReqidConfig) -> Result<Self, Error> {
        let prefix = config.id_prefix.ok_or(Error::MissingIdPrefix)?;

        // HTTP头部名称大小写不敏感，统一按小写存储
        let header_name = HeaderName::try_from(config.header_name.to_ascii_lowercase())
            .map_err(|source| Error::InvalidHeaderName {
                name: config.header_name.clone(),
                source,
            })?;

        Ok(Self {
            generator: RequestIdGenerator::new(prefix, config.prefix_separator),
            header_name,
            set_header: config.set_header,
            use_id_from_request: config.use_id_from_request,
            attribute: Arc::from(config.attribute),
            set_in_context: config.set_in_context,
            enable_span: config.enable_span,
            context_store: config.context_store,
        })
    }

    /// 为请求解析出请求ID
    ///
    /// 开启 `use_id_from_request` 且入站头部存在、非空并且是合法UTF-8时原样复用，
    /// 否则调用生成器。同名头部出现多次时按出现顺序以 `", "` 拼接。
    pub fn resolve(&self, headers: &HeaderMap) -> Result<RequestId, Error> {
        if self.use_id_from_request {
            match self.inbound_id(headers) {
                Some(id) => return Ok(RequestId::from(id)),
                None if headers.contains_key(&self.header_name) => {
                    tracing::debug!(
                        header = %self.header_name,
                        "Inbound request id is empty or not UTF-8, generating a new one"
                    );
                }
                None => {}
            }
        }

        self.generator.generate()
    }

    /// 读取入站请求ID，任一值不是UTF-8时返回 `None`
    fn inbound_id(&self, headers: &HeaderMap) -> Option<String> {
        let mut values = headers.get_all(&self.header_name).iter();
        let mut id = header_str(values.next()?)?.to_owned();
        for value in values {
            id.push_str(", ");
            id.push_str(header_str(value)?);
        }
        (!id.is_empty()).then_some(id)
    }

    /// 对一个请求执行完整的处理流程
    ///
    /// 成功时请求扩展中已经带上了请求ID，返回值中包含需要写入响应的头部。
    /// 任何一步失败都会直接返回错误，调用方不应继续执行后续处理链。
    pub fn handle<B>(&self, req: &mut Request<B>) -> Result<Resolved, Error> {
        let id = self.resolve(req.headers())?;

        // 先准备好响应头，保证编码失败时请求还没有被修改
        let header = if self.set_header {
            let value = HeaderValue::from_str(id.as_str()).map_err(|source| {
                Error::InvalidHeaderValue {
                    id: id.to_string(),
                    source,
                }
            })?;
            Some((self.header_name.clone(), value))
        } else {
            None
        };

        self.attach(req.extensions_mut(), &id);

        if self.set_in_context {
            self.context_store.set(&self.attribute, id.as_str())?;
        }

        Ok(Resolved { id, header })
    }

    /// 把请求ID挂到请求扩展上，下游处理函数可通过 [`RequestIdExt`] 按名称读取
    fn attach(&self, extensions: &mut Extensions, id: &RequestId) {
        match extensions.get_mut::<RequestAttributes>() {
            Some(attributes) => attributes.insert(Arc::clone(&self.attribute), id.clone()),
            None => {
                let mut attributes = RequestAttributes::default();
                attributes.insert(Arc::clone(&self.attribute), id.clone());
                extensions.insert(attributes);
            }
        }
        extensions.insert(id.clone());
    }

    /// 请求ID使用的头部名称（小写）
    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    pub fn enable_span(&self) -> bool {
        self.enable_span
    }
}

/// `HeaderValue::to_str` 只接受可见ASCII，这里按UTF-8解码以保留非ASCII的ID
fn header_str(value: &HeaderValue) -> Option<&str> {
    std::str::from_utf8(value.as_bytes()).ok()
}

impl fmt::Debug for Reqid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reqid")
            .field("generator", &self.generator)
            .field("header_name", &self.header_name)
            .field("set_header", &self.set_header)
            .field("use_id_from_request", &self.use_id_from_request)
            .field("attribute", &self.attribute)
            .field("set_in_context", &self.set_in_context)
            .field("enable_span", &self.enable_span)
            .finish_non_exhaustive()
    }
}

/// 单个请求的处理结果
#[derive(Debug, Clone)]
pub struct Resolved {
    /// 本次请求的ID
    pub id: RequestId,
    /// 需要写入响应的头部（`set_header` 关闭时为 `None`）
    pub header: Option<(HeaderName, HeaderValue)>,
}

impl Resolved {
    /// 把请求ID头部写入响应头
    ///
    /// 下游处理链已经设置了同名头部时保留下游的值。
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Some((name, value)) = &self.header {
            headers.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }
}

/// 请求扩展中按名称保存的请求ID
#[derive(Clone, Debug, Default)]
pub struct RequestAttributes(HashMap<Arc<str>, RequestId>);

impl RequestAttributes {
    fn insert(&mut self, name: Arc<str>, id: RequestId) {
        self.0.insert(name, id);
    }

    pub fn get(&self, name: &str) -> Option<&RequestId> {
        self.0.get(name)
    }
}

/// 从请求上按属性名读取请求ID
pub trait RequestIdExt {
    /// 读取名为 `attribute` 的请求ID
    fn request_id(&self, attribute: &str) -> Option<&RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self, attribute: &str) -> Option<&RequestId> {
        self.extensions().request_id(attribute)
    }
}

impl RequestIdExt for http::request::Parts {
    fn request_id(&self, attribute: &str) -> Option<&RequestId> {
        self.extensions.request_id(attribute)
    }
}

impl RequestIdExt for Extensions {
    fn request_id(&self, attribute: &str) -> Option<&RequestId> {
        self.get::<RequestAttributes>()?.get(attribute)
    }
}
