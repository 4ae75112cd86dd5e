use crate::utils::text::{chunk_chars, truncate_chars};

/// 问题类型数量，分组按 `(i - 1) % QUESTION_TYPES` 计算
pub const QUESTION_TYPES: usize = 8;

/// 根据项目文本与参考语料生成有序问题列表
///
/// 实现必须是确定性的，返回非空列表，且第 i 个问题的类型为 `(i - 1) % QUESTION_TYPES`。
pub trait QuestionBuilder: Send + Sync {
    fn build(&self, project_text: &str, corpus_text: &str) -> Vec<String>;
}

const TEMPLATES: [&str; QUESTION_TYPES] = [
    "Which goals of the reference material does the project directly address?",
    "Which eligibility requirements in the reference material does the project meet or miss?",
    "How well does the project's budget and resource plan match the funding rules in the reference material?",
    "Which evaluation criteria from the reference material would score the project highest and lowest?",
    "What risks or gaps would a reviewer raise when comparing the project with the reference material?",
    "How does the project's timeline and deliverables fit the schedule expected by the reference material?",
    "Which partners, beneficiaries or target groups required by the reference material does the project involve?",
    "What concrete changes would make the project align better with the reference material?",
];

/// 默认问题生成器：参考语料按块切分，每块依次套用 8 个模板
#[derive(Debug, Clone)]
pub struct GrantQuestionBuilder {
    pub project_excerpt_chars: usize,
    pub corpus_chunk_chars: usize,
    pub max_rounds: usize,
}

impl Default for GrantQuestionBuilder {
    fn default() -> Self {
        Self {
            project_excerpt_chars: 2000,
            corpus_chunk_chars: 3000,
            max_rounds: 4,
        }
    }
}

impl QuestionBuilder for GrantQuestionBuilder {
    fn build(&self, project_text: &str, corpus_text: &str) -> Vec<String> {
        let project = truncate_chars(project_text.trim(), self.project_excerpt_chars);
        let mut chunks = chunk_chars(corpus_text.trim(), self.corpus_chunk_chars);
        chunks.truncate(self.max_rounds.max(1));
        if chunks.is_empty() {
            chunks.push("");
        }

        let mut questions = Vec::with_capacity(chunks.len() * QUESTION_TYPES);
        for chunk in chunks {
            for template in TEMPLATES {
                questions.push(format!(
                    "{}\n\nProject document:\n{}\n\nReference material:\n{}\n\nAnswer in a few plain sentences.",
                    template, project, chunk
                ));
            }
        }
        questions
    }
}
