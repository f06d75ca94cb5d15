pub mod record;
pub mod session;

pub use record::{Course, CourseFailure, CrawlReport, CrawlResult, LectureStatus, TaskRecord};
pub use session::{Credentials, SessionToken};
