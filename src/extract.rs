//! 响应解析与规范化 - 业务能力层
//!
//! 上游返回的 JSON 带有反脚本前缀，记录形状也不统一，
//! 这里统一剥前缀、解析、投影成固定的最小领域形状。

use serde_json::Value as JsonValue;

use crate::error::SchemaError;
use crate::models::{Course, TaskRecord};

/// 上游 JSON 响应的反脚本（XSSI）前缀
const XSSI_PREFIX: &str = "while(1);";

/// 剥除响应体开头的 XSSI 前缀
///
/// 幂等：没有前缀的输入原样返回，剥过一次的再剥一次也不会变。
pub fn strip_xssi_prefix(raw: &str) -> &str {
    raw.strip_prefix(XSSI_PREFIX).unwrap_or(raw)
}

/// 解析收藏课程列表
///
/// 输出顺序与上游数组顺序一致，后续抓取按这个顺序遍历。
pub fn parse_course_list(raw: &str) -> Result<Vec<Course>, SchemaError> {
    let clean = strip_xssi_prefix(raw);
    let value: JsonValue = serde_json::from_str(clean)?;
    let array = value.as_array().ok_or(SchemaError::UnexpectedShape {
        expected: "课程列表应为 JSON 数组",
    })?;

    let mut courses = Vec::with_capacity(array.len());
    for item in array {
        let id = item
            .get("id")
            .and_then(|v| v.as_i64())
            .ok_or(SchemaError::MissingField { field: "id" })?;
        let name = item
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or(SchemaError::MissingField { field: "name" })?
            .to_string();
        courses.push(Course { id, name });
    }
    Ok(courses)
}

/// 解析任务列表响应并逐条规范化
pub fn parse_task_list(raw: &str) -> Result<Vec<TaskRecord>, SchemaError> {
    let clean = strip_xssi_prefix(raw);
    let value: JsonValue = serde_json::from_str(clean)?;
    let array = value.as_array().ok_or(SchemaError::UnexpectedShape {
        expected: "任务列表应为 JSON 数组",
    })?;

    array.iter().map(normalize_task).collect()
}

/// 把一条上游异构对象投影为 TaskRecord
///
/// 四个必填字段缺任何一个都是硬错误；可选字段缺失不影响规范化。
pub fn normalize_task(raw: &JsonValue) -> Result<TaskRecord, SchemaError> {
    let assignment_id = raw
        .get("assignment_id")
        .and_then(|v| v.as_i64())
        .ok_or(SchemaError::MissingField {
            field: "assignment_id",
        })?;
    let component_id = raw
        .get("component_id")
        .and_then(|v| v.as_i64())
        .ok_or(SchemaError::MissingField {
            field: "component_id",
        })?;
    let title = raw
        .get("title")
        .and_then(|v| v.as_str())
        .ok_or(SchemaError::MissingField { field: "title" })?
        .to_string();
    let view_url = raw
        .get("view_info")
        .and_then(|v| v.get("view_url"))
        .and_then(|v| v.as_str())
        .ok_or(SchemaError::MissingField {
            field: "view_info.view_url",
        })?
        .to_string();

    Ok(TaskRecord {
        assignment_id,
        component_id,
        title,
        view_url,
        unlock_at: string_field(raw, "unlock_at"),
        created_at: string_field(raw, "created_at"),
        due_at: string_field(raw, "due_at"),
        commons_content: raw.get("commons_content").cloned(),
    })
}

fn string_field(raw: &JsonValue, key: &str) -> Option<String> {
    raw.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}
