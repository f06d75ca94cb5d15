//! 抓取编排 - 编排层
//!
//! 按课程列表顺序逐门抓取任务：先访问外部工具引导页触发服务端的
//! 会话握手，等一段固定时间，再桥接请求任务接口。
//!
//! 遍历严格串行。引导页会改写会话级状态，下一次请求依赖它，
//! 并发访问会互相踩掉对方的会话记录。

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::bridge::{BridgeRequest, RequestBridge};
use crate::browser::BrowserSession;
use crate::config::Config;
use crate::error::{AppError, AppResult, SchemaError};
use crate::extract;
use crate::infrastructure::PageExecutor;
use crate::models::{Course, CourseFailure, CrawlReport, CrawlResult, SessionToken, TaskRecord};

/// 页面导航能力
///
/// 编排层通过它驱动引导页访问，测试时可以替换为记录调用的假导航器。
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, url: &str) -> AppResult<()>;
}

#[async_trait]
impl Navigator for BrowserSession {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        BrowserSession::navigate(self, url).await
    }
}

/// 抓取编排器
///
/// 前置条件：登录必须已经成功，令牌（若存在）由登录阶段显式传入。
pub struct CrawlOrchestrator<'a> {
    config: &'a Config,
    navigator: &'a dyn Navigator,
    executor: &'a dyn PageExecutor,
    token: Option<SessionToken>,
}

impl<'a> CrawlOrchestrator<'a> {
    pub fn new(
        config: &'a Config,
        navigator: &'a dyn Navigator,
        executor: &'a dyn PageExecutor,
        token: Option<SessionToken>,
    ) -> Self {
        Self {
            config,
            navigator,
            executor,
            token,
        }
    }

    /// 拉取收藏课程列表
    ///
    /// 这个端点不校验 Authorization 头，凭页面 Cookie 即可访问。
    pub async fn fetch_course_list(&self) -> AppResult<Vec<Course>> {
        let url = self.course_list_url();
        info!("📋 拉取课程列表...");

        let bridge = RequestBridge::new(self.executor);
        let raw = bridge.bridged_fetch(&BridgeRequest::plain(&url)).await?;
        let courses = extract::parse_course_list(&raw)?;

        info!("✓ 共 {} 门课程", courses.len());
        Ok(courses)
    }

    /// 按输入顺序逐门课程抓取任务列表
    ///
    /// 单门课程失败时记入 failures；continue_on_error 为 false 则停止
    /// 后续遍历。已经拿到的结果无论如何都保留在返回值里。
    pub async fn crawl(&self, courses: &[Course]) -> CrawlReport {
        let mut report = CrawlReport::default();
        let total = courses.len();

        for (index, course) in courses.iter().enumerate() {
            info!(
                "📚 [{}/{}] 抓取课程: {} (id: {})",
                index + 1,
                total,
                course.name,
                course.id
            );

            match self.crawl_course(course).await {
                Ok(task_list) => {
                    info!("✓ {} 个任务", task_list.len());
                    report.results.push(CrawlResult {
                        course_name: course.name.clone(),
                        task_list,
                    });
                }
                Err(e) => {
                    error!("❌ 课程 {} (id: {}) 抓取失败: {}", course.name, course.id, e);
                    report.failures.push(CourseFailure {
                        course_id: course.id,
                        course_name: course.name.clone(),
                        error: e.to_string(),
                    });
                    if !self.config.continue_on_error {
                        break;
                    }
                }
            }
        }

        report
    }

    /// 抓取单门课程的任务列表
    async fn crawl_course(&self, course: &Course) -> AppResult<Vec<TaskRecord>> {
        // 引导页必须先访问并稳定下来，任务接口才会开始放行
        self.navigator
            .navigate(&self.bootstrap_url(course.id))
            .await?;
        self.settle().await;

        let bridge = RequestBridge::new(self.executor);
        let request = BridgeRequest::with_session(self.task_list_url(course.id), self.token.as_ref());
        let raw = bridge.bridged_xhr(&request).await?;

        match extract::parse_task_list(&raw) {
            Ok(tasks) => Ok(tasks),
            // 会话过期时门户经常不给 401，而是 200 + HTML 登录页。
            // 携带会话的请求拿回非 JSON 响应体，按会话失效处理。
            Err(SchemaError::InvalidJson { .. }) => Err(AppError::AuthExpired {
                url: request.url.clone(),
                status: 200,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 引导页加载后的固定等待
    ///
    /// 引导页在后台做异步会话握手，没有可观测的就绪信号，
    /// 这里的固定延迟是就绪轮询的占位做法。
    async fn settle(&self) {
        if self.config.settle_ms > 0 {
            debug!("等待 {} ms 让会话握手完成", self.config.settle_ms);
            sleep(Duration::from_millis(self.config.settle_ms)).await;
        }
    }

    fn course_list_url(&self) -> String {
        format!(
            "{}/api/v1/users/self/favorites/courses?include[]=term&exclude[]=enrollments&sort=nickname",
            self.config.portal_root()
        )
    }

    fn bootstrap_url(&self, course_id: i64) -> String {
        format!("{}/courses/{}/external_tools/1", self.config.portal_root(), course_id)
    }

    fn task_list_url(&self, course_id: i64) -> String {
        format!(
            "{}/learningx/api/v1/courses/{}/allcomponents_db?user_id={}&user_login={}&role=1",
            self.config.portal_root(),
            course_id,
            self.config.lms_user_id,
            self.config.lms_user_sid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::{json, Value as JsonValue};
    use std::sync::Mutex;

    struct FakeNavigator {
        visited: Mutex<Vec<String>>,
    }

    impl FakeNavigator {
        fn new() -> Self {
            Self {
                visited: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Navigator for FakeNavigator {
        async fn navigate(&self, url: &str) -> AppResult<()> {
            self.visited.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    struct FakeExecutor {
        responses: Mutex<Vec<JsonValue>>,
    }

    impl FakeExecutor {
        fn new(responses: Vec<JsonValue>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl PageExecutor for FakeExecutor {
        async fn eval(&self, _js_code: String) -> Result<JsonValue> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                anyhow::bail!("没有预置响应了");
            }
            Ok(responses.remove(0))
        }
    }

    fn test_config() -> Config {
        Config {
            portal_url: "https://lms.test".to_string(),
            user_id: "dksu40".to_string(),
            user_pw: "pw".to_string(),
            lms_user_id: "123456".to_string(),
            lms_user_sid: "2020000000".to_string(),
            settle_ms: 0,
            ..Config::default()
        }
    }

    fn body_outcome(body: String) -> JsonValue {
        json!({ "ok": true, "status": 200, "body": body })
    }

    fn task_body() -> String {
        format!(
            "while(1);{}",
            json!([{
                "assignment_id": 5,
                "component_id": 9,
                "title": "HW1",
                "view_info": { "view_url": "/x" },
                "unlock_at": "2024-01-01",
                "created_at": "2024-01-01",
                "due_at": "2024-02-01"
            }])
        )
    }

    #[tokio::test]
    async fn crawl_produces_one_result_per_course_in_input_order() {
        let config = test_config();
        let navigator = FakeNavigator::new();
        let courses = vec![
            Course { id: 1001, name: "Algorithms".to_string() },
            Course { id: 1002, name: "Operating Systems".to_string() },
            Course { id: 1003, name: "Databases".to_string() },
        ];
        let executor = FakeExecutor::new(vec![
            body_outcome(task_body()),
            body_outcome(task_body()),
            body_outcome(task_body()),
        ]);
        let orchestrator = CrawlOrchestrator::new(&config, &navigator, &executor, None);

        let report = orchestrator.crawl(&courses).await;

        assert_eq!(report.results.len(), 3);
        assert!(report.failures.is_empty());
        let names: Vec<&str> = report
            .results
            .iter()
            .map(|r| r.course_name.as_str())
            .collect();
        assert_eq!(names, ["Algorithms", "Operating Systems", "Databases"]);
    }

    #[tokio::test]
    async fn crawl_visits_bootstrap_page_before_each_task_fetch() {
        let config = test_config();
        let navigator = FakeNavigator::new();
        let courses = vec![Course { id: 1001, name: "Algorithms".to_string() }];
        let executor = FakeExecutor::new(vec![body_outcome(task_body())]);
        let orchestrator = CrawlOrchestrator::new(&config, &navigator, &executor, None);

        orchestrator.crawl(&courses).await;

        let visited = navigator.visited.lock().unwrap();
        assert_eq!(
            visited.as_slice(),
            ["https://lms.test/courses/1001/external_tools/1"]
        );
    }

    #[tokio::test]
    async fn end_to_end_single_course_matches_expected_result() {
        let config = test_config();
        let navigator = FakeNavigator::new();
        let courses = vec![Course { id: 1001, name: "Algorithms".to_string() }];
        let executor = FakeExecutor::new(vec![body_outcome(task_body())]);
        let orchestrator = CrawlOrchestrator::new(&config, &navigator, &executor, None);

        let report = orchestrator.crawl(&courses).await;

        assert_eq!(report.results.len(), 1);
        let result = &report.results[0];
        assert_eq!(result.course_name, "Algorithms");
        assert_eq!(result.task_list.len(), 1);
        let task = &result.task_list[0];
        assert_eq!(task.assignment_id, 5);
        assert_eq!(task.component_id, 9);
        assert_eq!(task.title, "HW1");
        assert_eq!(task.view_url, "/x");
        assert_eq!(task.unlock_at.as_deref(), Some("2024-01-01"));
        assert_eq!(task.created_at.as_deref(), Some("2024-01-01"));
        assert_eq!(task.due_at.as_deref(), Some("2024-02-01"));
    }

    #[tokio::test]
    async fn failed_course_is_recorded_and_remaining_courses_continue() {
        let config = test_config();
        let navigator = FakeNavigator::new();
        let courses = vec![
            Course { id: 1001, name: "Algorithms".to_string() },
            Course { id: 1002, name: "Operating Systems".to_string() },
        ];
        let executor = FakeExecutor::new(vec![
            json!({ "error": "Failed to fetch" }),
            body_outcome(task_body()),
        ]);
        let orchestrator = CrawlOrchestrator::new(&config, &navigator, &executor, None);

        let report = orchestrator.crawl(&courses).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].course_id, 1001);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].course_name, "Operating Systems");
    }

    #[tokio::test]
    async fn abort_policy_stops_after_first_failure_but_keeps_partial_results() {
        let mut config = test_config();
        config.continue_on_error = false;
        let navigator = FakeNavigator::new();
        let courses = vec![
            Course { id: 1001, name: "Algorithms".to_string() },
            Course { id: 1002, name: "Operating Systems".to_string() },
            Course { id: 1003, name: "Databases".to_string() },
        ];
        let executor = FakeExecutor::new(vec![
            body_outcome(task_body()),
            json!({ "error": "Failed to fetch" }),
            body_outcome(task_body()),
        ]);
        let orchestrator = CrawlOrchestrator::new(&config, &navigator, &executor, None);

        let report = orchestrator.crawl(&courses).await;

        // 第一门的结果保留，第二门失败后不再访问第三门
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].course_name, "Operating Systems");
        assert_eq!(navigator.visited.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn html_login_page_on_task_fetch_is_session_expiry_not_schema_error() {
        // SSO 跳转后的过期会话：任务接口返回 200 + HTML 登录页
        let config = test_config();
        let navigator = FakeNavigator::new();
        let courses = vec![Course { id: 1001, name: "Algorithms".to_string() }];
        let executor = FakeExecutor::new(vec![body_outcome(
            "<!DOCTYPE html><html><body>로그인</body></html>".to_string(),
        )]);
        let orchestrator = CrawlOrchestrator::new(&config, &navigator, &executor, None);

        let report = orchestrator.crawl(&courses).await;

        assert!(report.results.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(
            report.failures[0].error.contains("会话已失效"),
            "应归类为会话失效而不是数据格式错误: {}",
            report.failures[0].error
        );
    }

    #[tokio::test]
    async fn missing_field_in_task_response_stays_a_schema_error() {
        // 响应体是合法 JSON 但缺必填字段，仍然按数据格式错误上报
        let config = test_config();
        let navigator = FakeNavigator::new();
        let courses = vec![Course { id: 1001, name: "Algorithms".to_string() }];
        let executor = FakeExecutor::new(vec![body_outcome(
            r#"while(1);[{"assignment_id": 5, "title": "broken"}]"#.to_string(),
        )]);
        let orchestrator = CrawlOrchestrator::new(&config, &navigator, &executor, None);

        let report = orchestrator.crawl(&courses).await;

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.contains("component_id"));
        assert!(!report.failures[0].error.contains("会话已失效"));
    }

    #[test]
    fn task_list_url_embeds_caller_identity() {
        let config = test_config();
        let navigator = FakeNavigator::new();
        let executor = FakeExecutor::new(Vec::new());
        let orchestrator = CrawlOrchestrator::new(&config, &navigator, &executor, None);

        let url = orchestrator.task_list_url(1001);
        assert_eq!(
            url,
            "https://lms.test/learningx/api/v1/courses/1001/allcomponents_db?user_id=123456&user_login=2020000000&role=1"
        );
    }
}
