use anyhow::Result;
use lms_task_crawler::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    lms_task_crawler::logger::init();

    // 加载配置
    let config = Config::from_env();

    // 运行抓取
    App::new(config).run().await
}
