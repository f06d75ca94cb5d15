//! 应用入口编排
//!
//! 把一次完整运行串起来：校验配置 → 启动浏览器 → 登录 →
//! 拉课程列表 → 逐门抓取 → 持久化产物。
//! 浏览器在成功和失败路径上都保证被关闭。

use anyhow::Result;
use tracing::{info, warn};

use crate::auth::Authenticator;
use crate::browser::{BrowserSession, DialogPolicy};
use crate::config::Config;
use crate::crawler::CrawlOrchestrator;
use crate::infrastructure::JsExecutor;
use crate::models::{Credentials, CrawlReport};
use crate::storage;

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 运行一次完整抓取
    pub async fn run(&self) -> Result<()> {
        // 配置问题在任何网络活动之前暴露
        self.config.validate()?;

        log_startup(&self.config);

        let session = BrowserSession::launch(&self.config, DialogPolicy::AcceptAll).await?;

        // 无论成败都要回收浏览器进程
        let outcome = self.run_with_session(&session).await;
        session.close().await;

        outcome
    }

    async fn run_with_session(&self, session: &BrowserSession) -> Result<()> {
        let credentials = Credentials::new(&self.config.user_id, &self.config.user_pw);
        let token = Authenticator::new(&self.config)
            .login(session, credentials)
            .await?;

        let executor = JsExecutor::new(session.page().clone());
        let orchestrator = CrawlOrchestrator::new(&self.config, session, &executor, token);

        let courses = orchestrator.fetch_course_list().await?;
        storage::save_json(
            &storage::artifact_path(&self.config.output_dir, "courses.json"),
            &courses,
        )
        .await?;

        let report = orchestrator.crawl(&courses).await;

        // 已经拿到的结果先落盘，失败与否都不丢
        self.persist_report(&report).await?;
        print_final_stats(&report);

        if !report.failures.is_empty() && !self.config.continue_on_error {
            let failure = &report.failures[0];
            anyhow::bail!(
                "课程 {} (id: {}) 抓取失败: {}",
                failure.course_name,
                failure.course_id,
                failure.error
            );
        }

        Ok(())
    }

    async fn persist_report(&self, report: &CrawlReport) -> Result<()> {
        storage::save_json(
            &storage::artifact_path(&self.config.output_dir, "total_task_list.json"),
            &report.results,
        )
        .await?;
        storage::save_json(
            &storage::artifact_path(&self.config.output_dir, "lecture_status.json"),
            &report.lecture_status(),
        )
        .await?;
        if !report.failures.is_empty() {
            storage::save_json(
                &storage::artifact_path(&self.config.output_dir, "failures.json"),
                &report.failures,
            )
            .await?;
        }
        Ok(())
    }
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - LMS 任务抓取");
    info!(
        "开始时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("门户地址: {}", config.portal_root());
    info!("输出目录: {}", config.output_dir);
    info!("{}", "=".repeat(60));
}

fn print_final_stats(report: &CrawlReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 抓取完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("✅ 成功: {} 门课程", report.results.len());
    if report.failures.is_empty() {
        info!("❌ 失败: 0");
    } else {
        warn!("❌ 失败: {} 门课程", report.failures.len());
        for failure in &report.failures {
            warn!(
                "  - {} (id: {}): {}",
                failure.course_name, failure.course_id, failure.error
            );
        }
    }
    info!("{}", "=".repeat(60));
}
