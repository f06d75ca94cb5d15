//! 登录认证 - 业务能力层
//!
//! 驱动浏览器会话走完登录表单流程，确认到达已登录状态，
//! 并把会话令牌从 Cookie 里显式提取出来。

use async_trait::async_trait;
use tracing::{info, warn};

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::error::{AppError, AppResult, AuthError};
use crate::models::{Credentials, SessionToken};

/// 登录所需的会话原语
///
/// Authenticator 只依赖这组能力，测试时可以替换为脚本化的假会话。
#[async_trait]
pub trait LoginSurface: Send + Sync {
    async fn navigate(&self, url: &str) -> AppResult<()>;
    async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> AppResult<()>;
    async fn fill_and_submit_login(
        &self,
        config: &Config,
        user_id: &str,
        user_pw: &str,
    ) -> AppResult<()>;
    async fn wait_for_navigation(&self, timeout_ms: u64) -> AppResult<()>;
    async fn read_cookie(&self, name: &str) -> AppResult<Option<String>>;
}

#[async_trait]
impl LoginSurface for BrowserSession {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        BrowserSession::navigate(self, url).await
    }

    async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> AppResult<()> {
        BrowserSession::wait_for_element(self, selector, timeout_ms).await
    }

    async fn fill_and_submit_login(
        &self,
        config: &Config,
        user_id: &str,
        user_pw: &str,
    ) -> AppResult<()> {
        BrowserSession::fill_and_submit_login(self, config, user_id, user_pw).await
    }

    async fn wait_for_navigation(&self, timeout_ms: u64) -> AppResult<()> {
        BrowserSession::wait_for_navigation(self, timeout_ms).await
    }

    async fn read_cookie(&self, name: &str) -> AppResult<Option<String>> {
        BrowserSession::read_cookie(self, name).await
    }
}

/// 登录认证器
///
/// 职责：
/// - 导航到门户首页并等待登录表单
/// - 填写凭据并提交
/// - 确认登录后的跳转完成
/// - 读取会话 Cookie，产出 SessionToken
///
/// 登录失败对整次运行是致命的，这里不做任何重试。
pub struct Authenticator<'a> {
    config: &'a Config,
}

impl<'a> Authenticator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// 执行登录流程
    ///
    /// # 返回
    /// 登录成功后返回会话令牌；Cookie 缺失时返回 None，
    /// 后续携带会话的请求会以无 Authorization 头的形式发出并由上游拒绝。
    pub async fn login(
        &self,
        surface: &dyn LoginSurface,
        credentials: Credentials,
    ) -> AppResult<Option<SessionToken>> {
        let config = self.config;
        info!("🔐 开始登录: {}", config.portal_root());

        surface.navigate(config.portal_root()).await?;

        // 登录表单未出现说明站点布局已变更，直接判定为登录失败
        surface
            .wait_for_element(&config.login_id_selector, config.wait_timeout_ms)
            .await
            .map_err(|e| match e {
                AppError::Timeout { waited_ms, .. } => AppError::Auth(AuthError::LoginFormMissing {
                    selector: config.login_id_selector.clone(),
                    waited_ms,
                }),
                other => other,
            })?;

        surface
            .fill_and_submit_login(config, &credentials.user_id, &credentials.user_pw)
            .await?;

        // 提交后必须在限定时间内完成跳转，否则多半是密码错误或 MFA 拦截
        surface
            .wait_for_navigation(config.wait_timeout_ms)
            .await
            .map_err(|e| match e {
                AppError::Timeout { waited_ms, .. } => {
                    AppError::Auth(AuthError::LoginNotConfirmed { waited_ms })
                }
                other => other,
            })?;

        info!("✅ 登录完成");

        let token = surface.read_cookie(&config.session_cookie_name).await?;
        match token {
            Some(value) => Ok(Some(SessionToken::new(value))),
            None => {
                warn!(
                    "⚠️ 未找到会话 Cookie: {}，携带会话的请求将被上游拒绝",
                    config.session_cookie_name
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 脚本化的假登录会话
    struct FakeSurface {
        form_appears: bool,
        navigation_completes: bool,
        cookie: Option<String>,
        steps: Mutex<Vec<&'static str>>,
    }

    impl FakeSurface {
        fn happy(cookie: Option<&str>) -> Self {
            Self {
                form_appears: true,
                navigation_completes: true,
                cookie: cookie.map(|c| c.to_string()),
                steps: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LoginSurface for FakeSurface {
        async fn navigate(&self, _url: &str) -> AppResult<()> {
            self.steps.lock().unwrap().push("navigate");
            Ok(())
        }

        async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> AppResult<()> {
            self.steps.lock().unwrap().push("wait_form");
            if self.form_appears {
                Ok(())
            } else {
                Err(AppError::timeout(format!("元素 {}", selector), timeout_ms))
            }
        }

        async fn fill_and_submit_login(
            &self,
            _config: &Config,
            _user_id: &str,
            _user_pw: &str,
        ) -> AppResult<()> {
            self.steps.lock().unwrap().push("submit");
            Ok(())
        }

        async fn wait_for_navigation(&self, timeout_ms: u64) -> AppResult<()> {
            self.steps.lock().unwrap().push("wait_navigation");
            if self.navigation_completes {
                Ok(())
            } else {
                Err(AppError::timeout("页面跳转", timeout_ms))
            }
        }

        async fn read_cookie(&self, _name: &str) -> AppResult<Option<String>> {
            self.steps.lock().unwrap().push("read_cookie");
            Ok(self.cookie.clone())
        }
    }

    fn test_config() -> Config {
        Config {
            user_id: "dksu40".to_string(),
            user_pw: "pw".to_string(),
            lms_user_id: "123456".to_string(),
            lms_user_sid: "2020000000".to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn login_follows_expected_sequence_and_yields_token() {
        let config = test_config();
        let surface = FakeSurface::happy(Some("tok123"));
        let token = Authenticator::new(&config)
            .login(&surface, Credentials::new("dksu40", "pw"))
            .await
            .unwrap();

        assert_eq!(token.unwrap().as_str(), "tok123");
        assert_eq!(
            surface.steps.lock().unwrap().as_slice(),
            ["navigate", "wait_form", "submit", "wait_navigation", "read_cookie"]
        );
    }

    #[tokio::test]
    async fn missing_login_form_is_an_auth_error() {
        let config = test_config();
        let mut surface = FakeSurface::happy(Some("tok123"));
        surface.form_appears = false;

        let err = Authenticator::new(&config)
            .login(&surface, Credentials::new("dksu40", "pw"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Auth(AuthError::LoginFormMissing { .. })
        ));
        // 表单缺失后不应继续提交凭据
        assert!(!surface.steps.lock().unwrap().contains(&"submit"));
    }

    #[tokio::test]
    async fn stalled_post_submit_navigation_is_an_auth_error() {
        let config = test_config();
        let mut surface = FakeSurface::happy(Some("tok123"));
        surface.navigation_completes = false;

        let err = Authenticator::new(&config)
            .login(&surface, Credentials::new("dksu40", "pw"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Auth(AuthError::LoginNotConfirmed { .. })
        ));
    }

    #[tokio::test]
    async fn absent_cookie_yields_none_instead_of_error() {
        let config = test_config();
        let surface = FakeSurface::happy(None);
        let token = Authenticator::new(&config)
            .login(&surface, Credentials::new("dksu40", "pw"))
            .await
            .unwrap();
        assert!(token.is_none());
    }
}
