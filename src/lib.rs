//! # LMS Task Crawler
//!
//! 从没有公开 API 的学习管理门户抓取个人学习数据
//! （课程列表、课程任务、在线课程完成状态）的自动化工具。
//!
//! 所有数据都藏在需要登录的会话后面，只能通过真实浏览器上下文访问，
//! 因此请求一律在受控页面内部发起（桥接请求），继承页面的 Cookie、
//! 同源授权和反爬信任信号。
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - BrowserSession：浏览器与页面的生命周期、导航、等待、Cookie
//! - `infrastructure/` - JsExecutor：唯一的 page owner，提供 eval() 能力
//!
//! ### ② 业务能力层（Services）
//! - `auth` - Authenticator：登录状态机，产出 SessionToken
//! - `bridge` - RequestBridge：页面内 fetch / XHR 两条请求通道
//! - `extract` - 剥 XSSI 前缀、解析课程列表、规范化任务记录
//!
//! ### ③ 编排层（Orchestration）
//! - `crawler` - CrawlOrchestrator：按课程顺序串行遍历，引导页 → 等待 → 任务接口
//! - `app` - App：整次运行的装配与资源回收
//!
//! ## 数据流
//!
//! ```text
//! Authenticator → BrowserSession (登录)
//!     ↓
//! RequestBridge (课程列表) → Extractor (Course)
//!     ↓
//! CrawlOrchestrator (逐门课程)
//!     ↓
//! RequestBridge (任务列表) → Extractor (TaskRecord)
//!     ↓
//! storage (JSON 产物)
//! ```

pub mod app;
pub mod auth;
pub mod bridge;
pub mod browser;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod storage;

// 重新导出常用类型
pub use app::App;
pub use auth::{Authenticator, LoginSurface};
pub use bridge::{BridgeRequest, RequestBridge};
pub use browser::{BrowserSession, DialogPolicy};
pub use config::Config;
pub use crawler::{CrawlOrchestrator, Navigator};
pub use error::{AppError, AppResult};
pub use infrastructure::{JsExecutor, PageExecutor};
pub use models::{Course, CrawlReport, CrawlResult, Credentials, SessionToken, TaskRecord};
