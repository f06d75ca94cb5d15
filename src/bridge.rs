//! 请求桥接 - 业务能力层
//!
//! 在受控页面的执行上下文里发起 HTTP GET，让请求天然携带页面的
//! Cookie、同源身份和反爬信任信号。进程外直连拿不到这些。
//!
//! 两条通道：
//! - `bridged_fetch`：现代 fetch 原语，课程列表一类的接口走这里
//! - `bridged_xhr`：XMLHttpRequest 通道，门户的遗留端点只认这条路径

use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::PageExecutor;
use crate::models::SessionToken;

/// 一次桥接请求的全部输入
///
/// 令牌由登录阶段一次性提取后显式传入，桥接层不再回头翻浏览器状态。
#[derive(Debug, Clone)]
pub struct BridgeRequest {
    pub url: String,
    pub extra_headers: Vec<(String, String)>,
    pub include_session: bool,
    pub token: Option<SessionToken>,
}

impl BridgeRequest {
    /// 不携带会话的请求
    pub fn plain(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra_headers: Vec::new(),
            include_session: false,
            token: None,
        }
    }

    /// 携带会话的请求
    ///
    /// 令牌缺失时请求仍会发出（不带 Authorization 头），
    /// 由上游的拒绝来暴露会话失效，而不是在本地提前拦截。
    pub fn with_session(url: impl Into<String>, token: Option<&SessionToken>) -> Self {
        Self {
            url: url.into(),
            extra_headers: Vec::new(),
            include_session: true,
            token: token.cloned(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// 组装最终的请求头 JSON 对象
    fn headers_json(&self) -> JsonValue {
        let mut headers = serde_json::Map::new();
        headers.insert(
            "Accept".to_string(),
            json!("application/json, text/plain, */*"),
        );
        for (name, value) in &self.extra_headers {
            headers.insert(name.clone(), json!(value));
        }
        if self.include_session {
            if let Some(token) = &self.token {
                headers.insert("Authorization".to_string(), json!(token.bearer_header()));
            }
        }
        JsonValue::Object(headers)
    }
}

/// 请求桥接器
///
/// 只依赖 PageExecutor 能力，不直接持有 Page。
pub struct RequestBridge<'a> {
    executor: &'a dyn PageExecutor,
}

impl<'a> RequestBridge<'a> {
    pub fn new(executor: &'a dyn PageExecutor) -> Self {
        Self { executor }
    }

    /// 通过页面内 fetch 发起 GET，返回响应体文本
    pub async fn bridged_fetch(&self, request: &BridgeRequest) -> AppResult<String> {
        let script = build_fetch_script(request);
        debug!("bridged fetch: {}", request.url);
        let outcome = self
            .executor
            .eval(script)
            .await
            .map_err(|e| AppError::transport(&request.url, e.to_string()))?;
        classify_outcome(request, outcome)
    }

    /// 通过页面内 XMLHttpRequest 发起 GET，返回响应体文本
    pub async fn bridged_xhr(&self, request: &BridgeRequest) -> AppResult<String> {
        let script = build_xhr_script(request);
        debug!("bridged xhr: {}", request.url);
        let outcome = self
            .executor
            .eval(script)
            .await
            .map_err(|e| AppError::transport(&request.url, e.to_string()))?;
        classify_outcome(request, outcome)
    }
}

/// 构建页面内 fetch 脚本
///
/// credentials: "include" 保证同源 Cookie 随请求发送，这一行不能省。
pub(crate) fn build_fetch_script(request: &BridgeRequest) -> String {
    format!(
        r#"
        (async () => {{
            try {{
                const res = await fetch({url}, {{
                    method: "GET",
                    headers: {headers},
                    credentials: "include"
                }});
                const body = await res.text();
                return {{ ok: res.ok, status: res.status, body: body }};
            }} catch (err) {{
                return {{ error: err.message }};
            }}
        }})()
        "#,
        url = json!(request.url),
        headers = request.headers_json(),
    )
}

/// 构建页面内 XHR 脚本
///
/// 部分遗留端点校验 XHR 特有的请求头顺序，fetch 过不去，只能走这条。
pub(crate) fn build_xhr_script(request: &BridgeRequest) -> String {
    let mut set_headers = String::new();
    for (name, value) in header_pairs(request) {
        set_headers.push_str(&format!(
            "xhr.setRequestHeader({}, {});\n                ",
            json!(name),
            json!(value)
        ));
    }

    format!(
        r#"
        (() => new Promise(resolve => {{
            try {{
                const xhr = new XMLHttpRequest();
                xhr.open("GET", {url}, true);
                xhr.withCredentials = true;
                {set_headers}xhr.onload = () => {{
                    resolve({{ ok: xhr.status >= 200 && xhr.status < 300, status: xhr.status, body: xhr.responseText }});
                }};
                xhr.onerror = () => resolve({{ error: "XHR network error" }});
                xhr.send();
            }} catch (err) {{
                resolve({{ error: err.message }});
            }}
        }}))()
        "#,
        url = json!(request.url),
        set_headers = set_headers,
    )
}

/// 请求头的有序键值对（XHR 需要逐个 setRequestHeader）
fn header_pairs(request: &BridgeRequest) -> Vec<(String, String)> {
    let mut pairs = vec![(
        "Accept".to_string(),
        "application/json, text/plain, */*".to_string(),
    )];
    for (name, value) in &request.extra_headers {
        pairs.push((name.clone(), value.clone()));
    }
    if request.include_session {
        if let Some(token) = &request.token {
            pairs.push(("Authorization".to_string(), token.bearer_header()));
        }
    }
    pairs
}

/// 把页面内返回的结果对象归类为响应文本或错误
fn classify_outcome(request: &BridgeRequest, outcome: JsonValue) -> AppResult<String> {
    if let Some(message) = outcome.get("error").and_then(|v| v.as_str()) {
        return Err(AppError::transport(&request.url, message));
    }

    let status = outcome.get("status").and_then(|v| v.as_i64()).unwrap_or(0);

    // 401/403 说明会话已经不被上游承认
    if request.include_session && (status == 401 || status == 403) {
        return Err(AppError::AuthExpired {
            url: request.url.clone(),
            status,
        });
    }

    if status < 200 || status >= 300 {
        return Err(AppError::transport(
            &request.url,
            format!("HTTP {}", status),
        ));
    }

    match outcome.get("body").and_then(|v| v.as_str()) {
        Some(body) => Ok(body.to_string()),
        None => Err(AppError::transport(&request.url, "响应体缺失")),
    }
}
