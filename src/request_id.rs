//! RequestId 核心结构体与生成器定义

use crate::config::IdPrefix;
use crate::error::Error;
use std::fmt;
use uuid::Uuid;

/// 请求ID结构体
///
/// 生成格式为 `<前缀><分隔符><UUID v4>`，或者是入站请求头中原样复用的值。
/// 一旦计算出来就不可变，生命周期为一次请求。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// 获取请求ID字符串
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 取出内部字符串
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 请求ID生成器
///
/// 每次调用 [`generate`](Self::generate) 都会重新解析前缀（前缀为函数时不做缓存），
/// 随机部分使用 UUID v4（来自操作系统的安全随机源，122位随机数）。
#[derive(Clone, Debug)]
pub struct RequestIdGenerator {
    prefix: IdPrefix,
    separator: String,
}

impl RequestIdGenerator {
    /// 使用前缀和分隔符创建生成器
    pub fn new(prefix: impl Into<IdPrefix>, separator: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
        }
    }

    /// 生成新的请求ID
    ///
    /// # 错误
    /// 前缀生成函数失败时返回 [`Error::PrefixGenerator`]，不会回退到任何默认值。
    pub fn generate(&self) -> Result<RequestId, Error> {
        let root_prefix = self.prefix.resolve()?;
        let token = Uuid::new_v4();

        let mut id = String::with_capacity(root_prefix.len() + self.separator.len() + 36);
        id.push_str(&root_prefix);
        id.push_str(&self.separator);
        id.push_str(token.hyphenated().encode_lower(&mut Uuid::encode_buffer()));
        Ok(RequestId(id))
    }

    /// 分隔符
    #[inline]
    pub fn separator(&self) -> &str {
        &self.separator
    }
}
