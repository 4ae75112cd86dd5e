pub mod questions;
pub mod report;
pub mod summarize;

pub use questions::{GrantQuestionBuilder, QUESTION_TYPES, QuestionBuilder};
pub use report::ProjectReport;
pub use summarize::{SentencePolicy, Summarizer};
