//! 请求上下文存储
//!
//! 使用 `tokio::task_local` 提供与Web框架无关的请求级键值存储，
//! 让处理函数调用链之外的代码（日志、下游客户端等）也能拿到请求ID。

use crate::error::Error;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task_local;

/// 上下文存储接口
///
/// 中间件只在 `set_in_context` 开启时调用一次 [`set`](Self::set)，
/// 存储的生命周期和并发请求之间的隔离由实现方负责。
pub trait ContextStore: Send + Sync {
    /// 在当前请求作用域内写入一个值
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// 读取当前请求作用域内的值
    fn get(&self, key: &str) -> Option<String>;
}

/// 单个请求的键值上下文
///
/// 克隆后共享同一份数据。
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl ContextStore for RequestContext {
    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

// 使用tokio的task_local来存储当前请求的上下文
task_local! {
    static CURRENT_CONTEXT: RequestContext;
}

/// 读取当前请求上下文中的值
///
/// 如果当前不在请求上下文中，则记录一个警告并返回 `None`。
pub fn get(key: &str) -> Option<String> {
    CURRENT_CONTEXT
        .try_with(|ctx| ctx.get(key))
        .unwrap_or_else(|_| {
            tracing::warn!(key, "RequestContext not found in task-local scope. This might indicate a logic error where a function is called outside of a request scope.");
            None
        })
}

/// 向当前请求上下文写入值
///
/// # 错误
/// 不在请求上下文作用域内时返回 [`Error::ContextUnavailable`]。
pub fn set(key: &str, value: &str) -> Result<(), Error> {
    CURRENT_CONTEXT
        .try_with(|ctx| ctx.set(key, value))
        .map_err(|_| Error::ContextUnavailable)?
}

/// 在指定的请求上下文中执行异步操作
pub async fn with_request_context<F, T>(ctx: RequestContext, future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    CURRENT_CONTEXT.scope(ctx, future).await
}

/// 在指定的请求上下文中执行同步闭包
pub fn sync_with_request_context<F, T>(ctx: RequestContext, f: F) -> T
where
    F: FnOnce() -> T,
{
    CURRENT_CONTEXT.sync_scope(ctx, f)
}

/// 基于 task-local 作用域的上下文存储，[`ReqidConfig`](crate::ReqidConfig) 的默认存储
///
/// 需要在外层建立作用域：使用 `RequestContextLayer`，或手动调用
/// [`with_request_context`] / [`sync_with_request_context`]。
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskLocalContextStore;

impl ContextStore for TaskLocalContextStore {
    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        set(key, value)
    }

    fn get(&self, key: &str) -> Option<String> {
        get(key)
    }
}
