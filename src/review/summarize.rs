use serde::Deserialize;

/// 句子分隔符
pub const SENTENCE_DELIMITER: &str = ". ";

/// 默认保留句数
pub const DEFAULT_TARGET: usize = 10;

/// 超长文本保留句数的策略
///
/// `Literal` 先判断 `>50`，因此 `>100` 的分支永远走不到，超过 50 句一律保留 15 句。
/// `Tiered` 先判断 `>100`（20 句），再判断 `>50`（15 句）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentencePolicy {
    #[default]
    Literal,
    Tiered,
}

impl SentencePolicy {
    /// 根据句数决定最终保留的句数，不会低于 `target`
    pub fn limit(self, sentence_count: usize, target: usize) -> usize {
        let tier = match self {
            SentencePolicy::Literal => {
                if sentence_count > 50 {
                    15
                } else {
                    target
                }
            }
            SentencePolicy::Tiered => {
                if sentence_count > 100 {
                    20
                } else if sentence_count > 50 {
                    15
                } else {
                    target
                }
            }
        };
        tier.max(target)
    }
}

/// 截断式摘要：保留前 N 句，以 ". " 重新拼接，不加省略号
#[derive(Debug, Clone, Copy)]
pub struct Summarizer {
    pub target: usize,
    pub policy: SentencePolicy,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET,
            policy: SentencePolicy::default(),
        }
    }
}

impl Summarizer {
    pub fn new(target: usize, policy: SentencePolicy) -> Self {
        Self { target, policy }
    }

    pub fn summarize(&self, text: &str) -> String {
        let sentences: Vec<&str> = text.split(SENTENCE_DELIMITER).collect();
        if sentences.len() <= self.target {
            return text.to_string();
        }
        let limit = self.policy.limit(sentences.len(), self.target);
        sentences[..limit.min(sentences.len())].join(SENTENCE_DELIMITER)
    }
}
