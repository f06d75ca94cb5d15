//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"在页面内执行 JS"的能力。
//! 跨进程边界的请求桥接全部走这一条通道。

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::Page;
use serde_json::Value as JsonValue;

/// 页面执行能力
///
/// RequestBridge 只依赖这个 trait，不直接认识 Page，
/// 测试时可以用返回预置响应的假执行器替换。
#[async_trait]
pub trait PageExecutor: Send + Sync {
    /// 在页面上下文中执行 JS 代码并返回 JSON 结果
    async fn eval(&self, js_code: String) -> Result<JsonValue>;
}

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识 Course / TaskRecord
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }
}

#[async_trait]
impl PageExecutor for JsExecutor {
    async fn eval(&self, js_code: String) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }
}
