use std::fmt;

/// 登录凭据
///
/// 由调用方一次性传入，核心不做任何持久化。
#[derive(Clone)]
pub struct Credentials {
    pub user_id: String,
    pub user_pw: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, user_pw: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_pw: user_pw.into(),
        }
    }
}

// 密码不允许进入日志
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("user_pw", &"***")
            .finish()
    }
}

/// 会话令牌
///
/// 登录成功后从指定 Cookie 中读取一次，之后显式地传给 RequestBridge，
/// 而不是每次请求时再去翻浏览器的 Cookie。
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 组装成 Authorization 头的值
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(***)")
    }
}
