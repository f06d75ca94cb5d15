//! 应用程序错误类型
//!
//! 错误分类原则：
//! - `Config` / `Auth`：致命错误，立即终止本次运行，不重试
//! - `AuthExpired`：会话失效，由上游响应状态推断，向调用方透出
//! - `Schema`：单条记录规范化失败，按配置决定是否继续下一门课程
//! - `Timeout` / `Transport`：带课程上下文上报，由调用方决定是否重跑

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（在任何网络活动之前被检出）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 登录错误
    #[error("登录错误: {0}")]
    Auth(#[from] AuthError),

    /// 会话已失效：携带会话的请求被上游拒绝
    #[error("会话已失效 (url: {url}, status: {status})")]
    AuthExpired { url: String, status: i64 },

    /// 记录规范化错误
    #[error("数据格式错误: {0}")]
    Schema(#[from] SchemaError),

    /// 等待条件超时
    #[error("等待超时: {what} (已等待 {waited_ms} ms)")]
    Timeout { what: String, waited_ms: u64 },

    /// 页面内请求的网络层失败
    #[error("网络请求失败 (url: {url}): {message}")]
    Transport { url: String, message: String },

    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),

    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填配置项为空
    #[error("配置项 {name} 不能为空")]
    MissingValue { name: String },

    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

/// 登录错误
#[derive(Debug, Error)]
pub enum AuthError {
    /// 登录表单未出现（站点布局可能已变更）
    #[error("登录表单未出现 (selector: {selector}, 已等待 {waited_ms} ms)")]
    LoginFormMissing { selector: String, waited_ms: u64 },

    /// 提交后未能在限定时间内完成跳转（密码错误或出现 MFA 页面）
    #[error("登录后跳转未完成 (已等待 {waited_ms} ms)，请检查账号密码")]
    LoginNotConfirmed { waited_ms: u64 },
}

/// 记录规范化错误
#[derive(Debug, Error)]
pub enum SchemaError {
    /// 必填字段缺失
    #[error("记录缺少必填字段 {field}")]
    MissingField { field: &'static str },

    /// 响应体不是合法 JSON
    #[error("响应体不是合法 JSON: {source}")]
    InvalidJson {
        #[from]
        source: serde_json::Error,
    },

    /// 响应体形状不符合预期
    #[error("响应体形状不符合预期: {expected}")]
    UnexpectedShape { expected: &'static str },
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 浏览器配置失败
    #[error("浏览器配置失败: {message}")]
    ConfigurationFailed { message: String },

    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        #[source]
        source: chromiumoxide::error::CdpError,
    },

    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed {
        #[source]
        source: chromiumoxide::error::CdpError,
    },

    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: chromiumoxide::error::CdpError,
    },

    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[from]
        source: chromiumoxide::error::CdpError,
    },

    /// 页面上找不到预期元素
    #[error("页面上找不到元素: {selector}")]
    ElementMissing { selector: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 创建目录失败
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// 创建等待超时错误
    pub fn timeout(what: impl Into<String>, waited_ms: u64) -> Self {
        AppError::Timeout {
            what: what.into(),
            waited_ms,
        }
    }

    /// 创建网络传输错误
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// 该错误是否应终止整次运行（不再继续后续课程）
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::Auth(_))
    }
}
