//! 浏览器会话 - 基础设施层
//!
//! 持有一个浏览器进程和一个页面的完整生命周期，
//! 暴露导航、等待元素、填表、读 Cookie 等原语。

use std::path::Path;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, BrowserError};

/// 原生对话框处理策略
///
/// 无人值守运行时 alert/confirm 弹窗会卡死整个流程，
/// 默认全部接受；测试或调试时可以改为全部拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPolicy {
    AcceptAll,
    DismissAll,
}

impl DialogPolicy {
    fn accept(self) -> bool {
        matches!(self, DialogPolicy::AcceptAll)
    }
}

/// 把字符串编码为 JS 字符串字面量，避免选择器/凭据里的引号破坏脚本
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// 浏览器会话
///
/// 职责：
/// - 启动浏览器并持有唯一的 Page
/// - 提供导航 / 等待元素 / 填表提交 / 读 Cookie 原语
/// - 注册会话级对话框处理策略
/// - close() 保证在所有退出路径上回收浏览器进程
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    wait_poll_ms: u64,
}

impl BrowserSession {
    /// 启动浏览器并创建空白页面
    pub async fn launch(config: &Config, dialog_policy: DialogPolicy) -> AppResult<Self> {
        info!("🚀 启动浏览器... (headless: {})", config.headless);

        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .args(vec![
                "--disable-gpu",           // Windows 无头模式必须禁用 GPU
                "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
                "--disable-dev-shm-usage", // 防止共享内存不足
            ]);
        if config.headless {
            builder = builder.new_headless_mode();
        } else {
            builder = builder.with_head();
        }
        if !config.chrome_executable.is_empty() {
            builder = builder.chrome_executable(Path::new(&config.chrome_executable));
        }
        let browser_config = builder
            .build()
            .map_err(|message| BrowserError::ConfigurationFailed { message })?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|source| BrowserError::LaunchFailed { source })?;
        debug!("浏览器启动成功");

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        // 添加短暂延迟以等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|source| BrowserError::PageCreationFailed { source })?;

        let session = Self {
            browser,
            page,
            handler_task,
            wait_poll_ms: 250,
        };
        session.install_dialog_handler(dialog_policy).await?;

        Ok(session)
    }

    /// 注册会话级对话框处理器，生效至会话结束
    async fn install_dialog_handler(&self, policy: DialogPolicy) -> AppResult<()> {
        let mut dialogs = self
            .page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(BrowserError::from)?;

        let page = self.page.clone();
        let accept = policy.accept();
        tokio::spawn(async move {
            while let Some(dialog) = dialogs.next().await {
                debug!("检测到对话框: {:?}", dialog.message);
                match HandleJavaScriptDialogParams::builder().accept(accept).build() {
                    Ok(params) => {
                        if let Err(e) = page.execute(params).await {
                            warn!("处理对话框失败: {}", e);
                        }
                    }
                    Err(e) => warn!("构造对话框参数失败: {}", e),
                }
            }
        });

        Ok(())
    }

    /// 页面引用（供 JsExecutor 接管执行能力）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 导航到指定 URL 并等待加载完成
    pub async fn navigate(&self, url: &str) -> AppResult<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|source| BrowserError::NavigationFailed {
                url: url.to_string(),
                source,
            })?;
        Ok(())
    }

    /// 轮询等待选择器命中的元素出现
    ///
    /// 超时未出现时返回 `AppError::Timeout`。
    pub async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> AppResult<()> {
        let probe = format!("document.querySelector({}) !== null", js_string(selector));

        let mut waited: u64 = 0;
        loop {
            let found: bool = self
                .page
                .evaluate(probe.clone())
                .await
                .map_err(BrowserError::from)?
                .into_value()
                .unwrap_or(false);
            if found {
                debug!("元素已出现: {}", selector);
                return Ok(());
            }
            if waited >= timeout_ms {
                return Err(AppError::timeout(format!("元素 {}", selector), waited));
            }
            sleep(Duration::from_millis(self.wait_poll_ms)).await;
            waited += self.wait_poll_ms;
        }
    }

    /// 填写登录表单并点击提交按钮
    ///
    /// 字段值通过页面内 DOM 赋值写入，提交走真实点击。
    pub async fn fill_and_submit_login(
        &self,
        config: &Config,
        user_id: &str,
        user_pw: &str,
    ) -> AppResult<()> {
        let fill_script = format!(
            r#"
            (() => {{
                const id = document.querySelector({id_sel});
                const pw = document.querySelector({pw_sel});
                if (!id || !pw) {{
                    return false;
                }}
                id.value = {id_val};
                pw.value = {pw_val};
                return true;
            }})()
            "#,
            id_sel = js_string(&config.login_id_selector),
            pw_sel = js_string(&config.login_pw_selector),
            id_val = js_string(user_id),
            pw_val = js_string(user_pw),
        );

        let filled: bool = self
            .page
            .evaluate(fill_script)
            .await
            .map_err(BrowserError::from)?
            .into_value()
            .unwrap_or(false);
        if !filled {
            // 等待阶段元素还在，填表时却没了，多半是页面被重绘
            return Err(BrowserError::ElementMissing {
                selector: config.login_id_selector.clone(),
            }
            .into());
        }

        let submit = self
            .page
            .find_element(config.login_submit_selector.as_str())
            .await
            .map_err(BrowserError::from)?;
        submit.click().await.map_err(BrowserError::from)?;
        debug!("已点击登录按钮");

        Ok(())
    }

    /// 等待当前页面完成一次导航
    pub async fn wait_for_navigation(&self, timeout_ms: u64) -> AppResult<()> {
        tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.page.wait_for_navigation(),
        )
        .await
        .map_err(|_| AppError::timeout("页面跳转", timeout_ms))?
        .map_err(BrowserError::from)?;
        Ok(())
    }

    /// 读取指定名称的 Cookie 值，不存在时返回 None
    pub async fn read_cookie(&self, name: &str) -> AppResult<Option<String>> {
        let cookies = self.page.get_cookies().await.map_err(BrowserError::from)?;
        Ok(cookies
            .into_iter()
            .find(|cookie| cookie.name == name)
            .map(|cookie| cookie.value))
    }

    /// 关闭浏览器并回收后台事件任务
    ///
    /// 必须在所有退出路径上调用，避免泄漏浏览器进程。
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("关闭浏览器失败: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("等待浏览器退出: {}", e);
        }
        self.handler_task.abort();
        info!("🧹 浏览器已关闭");
    }
}
