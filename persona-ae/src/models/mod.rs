//! Domain models for persona-ae

mod analysis_job;
mod answer;
mod question;
mod session;

pub use analysis_job::{AnalysisJob, AnalysisOptions, AnalysisType, DetailLevel, ErrorDetail, JobStatus, StatusTransition};
pub use answer::{Answer, AnswerValue};
pub use question::{Question, QuestionConstraints, QuestionType, RankingItem, ScaleBounds};
pub use session::{QuestionnaireSession, SessionStatus, UserRecord};
