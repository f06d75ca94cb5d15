use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 学习课程
///
/// 来源于"收藏课程"列表接口，抓取后只读，以 id 作为身份标识。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
}

/// 规范化后的课程任务记录
///
/// 只由 Extractor 从上游异构对象投影产生，生成后不再修改。
/// 上游并非所有形状都带 `commons_content`（在线课程组件信息），缺失不算错误。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub assignment_id: i64,
    pub component_id: i64,
    pub title: String,
    pub view_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commons_content: Option<JsonValue>,
}

/// 单门课程的抓取结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub course_name: String,
    pub task_list: Vec<TaskRecord>,
}

/// 单门课程抓取失败的记录
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseFailure {
    pub course_id: i64,
    pub course_name: String,
    pub error: String,
}

/// 整次抓取的汇总
///
/// 即使中途有课程失败，已经拿到的结果也会保留，供调用方尽力持久化。
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub results: Vec<CrawlResult>,
    pub failures: Vec<CourseFailure>,
}

impl CrawlReport {
    /// 从任务记录中投影出在线课程（出席/完成状态）快照
    ///
    /// 只保留携带 `commons_content` 的记录，按课程分组，顺序与抓取顺序一致。
    pub fn lecture_status(&self) -> Vec<LectureStatus> {
        self.results
            .iter()
            .map(|result| LectureStatus {
                course_name: result.course_name.clone(),
                lectures: result
                    .task_list
                    .iter()
                    .filter(|task| task.commons_content.is_some())
                    .cloned()
                    .collect(),
            })
            .collect()
    }
}

/// 一门课程的在线课程状态快照
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureStatus {
    pub course_name: String,
    pub lectures: Vec<TaskRecord>,
}
