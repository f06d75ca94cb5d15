use crate::error::ConfigError;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// LMS 门户根地址
    pub portal_url: String,
    /// 登录账号（学号）
    pub user_id: String,
    /// 登录密码
    pub user_pw: String,
    /// 任务接口所需的用户内部 ID（嵌入 URL 的 user_id 参数）
    pub lms_user_id: String,
    /// 任务接口所需的登录名（嵌入 URL 的 user_login 参数）
    pub lms_user_sid: String,
    /// 承载会话令牌的 Cookie 名称
    pub session_cookie_name: String,
    /// 登录表单元素选择器
    pub login_id_selector: String,
    pub login_pw_selector: String,
    pub login_submit_selector: String,
    /// 等待元素出现的超时时间（毫秒）
    pub wait_timeout_ms: u64,
    /// 外部工具引导页加载后的固定等待时间（毫秒）
    pub settle_ms: u64,
    /// 单门课程抓取失败时是否继续处理后续课程
    pub continue_on_error: bool,
    /// 是否无头模式运行
    pub headless: bool,
    /// 浏览器可执行文件路径（为空则使用系统默认）
    pub chrome_executable: String,
    /// 输出文件存放目录
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_url: "https://learning.hanyang.ac.kr".to_string(),
            user_id: String::new(),
            user_pw: String::new(),
            lms_user_id: String::new(),
            lms_user_sid: String::new(),
            session_cookie_name: "xn_api_token".to_string(),
            login_id_selector: "#uid".to_string(),
            login_pw_selector: "#upw".to_string(),
            login_submit_selector: "#login_btn".to_string(),
            wait_timeout_ms: 30_000,
            settle_ms: 2_000,
            continue_on_error: true,
            headless: true,
            chrome_executable: String::new(),
            output_dir: "output".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            portal_url: std::env::var("LMS_PORTAL_URL").unwrap_or(default.portal_url),
            user_id: std::env::var("LMS_ID").unwrap_or(default.user_id),
            user_pw: std::env::var("LMS_PW").unwrap_or(default.user_pw),
            lms_user_id: std::env::var("LMS_USER_ID").unwrap_or(default.lms_user_id),
            lms_user_sid: std::env::var("LMS_USER_SID").unwrap_or(default.lms_user_sid),
            session_cookie_name: std::env::var("LMS_SESSION_COOKIE")
                .unwrap_or(default.session_cookie_name),
            login_id_selector: default.login_id_selector,
            login_pw_selector: default.login_pw_selector,
            login_submit_selector: default.login_submit_selector,
            wait_timeout_ms: std::env::var("LMS_WAIT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.wait_timeout_ms),
            settle_ms: std::env::var("LMS_SETTLE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.settle_ms),
            continue_on_error: std::env::var("LMS_CONTINUE_ON_ERROR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.continue_on_error),
            headless: std::env::var("LMS_HEADLESS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.headless),
            chrome_executable: std::env::var("LMS_CHROME_PATH").unwrap_or(default.chrome_executable),
            output_dir: std::env::var("LMS_OUTPUT_DIR").unwrap_or(default.output_dir),
        }
    }

    /// 在任何网络活动之前校验配置完整性
    ///
    /// 账号、密码与接口身份参数缺一不可，缺失时立即报错而不是等到登录阶段才失败。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("LMS_ID", &self.user_id),
            ("LMS_PW", &self.user_pw),
            ("LMS_USER_ID", &self.lms_user_id),
            ("LMS_USER_SID", &self.lms_user_sid),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingValue {
                    name: name.to_string(),
                });
            }
        }
        if self.portal_url.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                name: "LMS_PORTAL_URL".to_string(),
            });
        }
        Ok(())
    }

    /// 门户根地址（去掉末尾斜杠，便于拼接路径）
    pub fn portal_root(&self) -> &str {
        self.portal_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_config() -> Config {
        Config {
            user_id: "dksu40".to_string(),
            user_pw: "secret".to_string(),
            lms_user_id: "123456".to_string(),
            lms_user_sid: "2020000000".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(filled_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_credentials() {
        let mut config = filled_config();
        config.user_pw = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("LMS_PW"));
    }

    #[test]
    fn validate_rejects_blank_identity_params() {
        let mut config = filled_config();
        config.lms_user_sid = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn portal_root_strips_trailing_slash() {
        let mut config = filled_config();
        config.portal_url = "https://learning.hanyang.ac.kr/".to_string();
        assert_eq!(config.portal_root(), "https://learning.hanyang.ac.kr");
    }
}
