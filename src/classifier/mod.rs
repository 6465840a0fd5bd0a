//! Relevance classification of feed entries.

mod delay;
mod verdict;

pub use delay::{DelayStrategy, FixedDelay, NoDelay};
pub use verdict::{parse_verdict, Verdict};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::ClassificationError;
use crate::llm::generate_llm_response;
use crate::prompt;
use crate::rss::{truncate_chars, Entry};
use crate::{LLMParams, TARGET_LLM_REQUEST};

/// Decides whether an entry is relevant to the configured topic.
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, entry: &Entry) -> Result<Verdict, ClassificationError>;
}

/// Classifier backed by a text-completion model.
pub struct LlmClassifier {
    params: LLMParams,
    topic: String,
    max_prompt_chars: usize,
}

impl LlmClassifier {
    pub fn new(params: LLMParams, topic: &str, max_prompt_chars: usize) -> Self {
        Self {
            params,
            topic: topic.to_string(),
            max_prompt_chars,
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &str {
        &self.params.model
    }

    async fn classify(&self, entry: &Entry) -> Result<Verdict, ClassificationError> {
        if entry.title.trim().is_empty() {
            return Err(ClassificationError::EmptyTitle);
        }
        let prompt = prompt::relevance_prompt(
            &entry.title,
            &entry.summary,
            &self.topic,
            self.max_prompt_chars,
        );
        let response = generate_llm_response(&prompt, &self.params).await?;
        parse_verdict(&response)
    }
}

/// An entry with the classifier's decision attached.
#[derive(Debug, Clone)]
pub struct ClassifiedEntry {
    pub entry: Entry,
    pub relevant: bool,
    pub reason: Option<String>,
    /// True when classification failed and the verdict is the fallback.
    pub fell_back: bool,
}

/// Counts gathered while classifying a run's entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationStats {
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl ClassificationStats {
    pub fn total(&self) -> usize {
        self.accepted + self.rejected
    }
}

/// Verdict used when classification fails: the item lands in the rejected feed.
pub const FALLBACK_RELEVANT: bool = false;

/// Classify every entry, one at a time, in order.
///
/// Failures never escape: they are logged and replaced by the fallback
/// verdict. The delay strategy's pause is awaited after every call.
pub async fn classify_all(
    entries: Vec<Entry>,
    classifier: &dyn Classifier,
    delay: &dyn DelayStrategy,
) -> (Vec<ClassifiedEntry>, ClassificationStats) {
    let total = entries.len();
    let mut stats = ClassificationStats::default();
    let mut classified = Vec::with_capacity(total);

    info!(target: TARGET_LLM_REQUEST, "Classifying {} entries with {}", total, classifier.name());

    for (index, entry) in entries.into_iter().enumerate() {
        info!(target: TARGET_LLM_REQUEST, "[{}/{}] Processing: {}", index + 1, total, truncate_chars(&entry.title, 60));

        let item = match classifier.classify(&entry).await {
            Ok(verdict) => {
                if verdict.relevant {
                    stats.accepted += 1;
                    info!(target: TARGET_LLM_REQUEST, "  ACCEPTED");
                } else {
                    stats.rejected += 1;
                    info!(target: TARGET_LLM_REQUEST, "  REJECTED");
                }
                if let Some(reason) = &verdict.reason {
                    debug!(target: TARGET_LLM_REQUEST, "  Reason: {}", reason);
                }
                ClassifiedEntry {
                    entry,
                    relevant: verdict.relevant,
                    reason: verdict.reason,
                    fell_back: false,
                }
            }
            Err(err) => {
                stats.failed += 1;
                stats.rejected += 1;
                warn!(target: TARGET_LLM_REQUEST, "  ERROR classifying {}: {}; defaulting to not relevant", entry.id, err);
                ClassifiedEntry {
                    entry,
                    relevant: FALLBACK_RELEVANT,
                    reason: Some(err.to_string()),
                    fell_back: true,
                }
            }
        };
        classified.push(item);

        let pause = delay.delay(index);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    (classified, stats)
}

/// Stable split into (accepted, rejected), preserving source order.
pub fn partition(classified: Vec<ClassifiedEntry>) -> (Vec<Entry>, Vec<Entry>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for item in classified {
        if item.relevant {
            accepted.push(item.entry);
        } else {
            rejected.push(item.entry);
        }
    }
    (accepted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use std::sync::Mutex;
    use std::time::Duration;

    struct KeywordClassifier;

    #[async_trait]
    impl Classifier for KeywordClassifier {
        fn name(&self) -> &str {
            "keyword"
        }

        async fn classify(&self, entry: &Entry) -> Result<Verdict, ClassificationError> {
            if entry.title.contains("timeout") {
                return Err(LlmError::Timeout(Duration::from_secs(120)).into());
            }
            Ok(if entry.summary.contains("head and neck") {
                Verdict::relevant()
            } else {
                Verdict::not_relevant()
            })
        }
    }

    fn entry(title: &str, summary: &str) -> Entry {
        Entry {
            id: title.to_string(),
            title: title.to_string(),
            link: format!("https://example.com/{}", title.replace(' ', "-")),
            summary: summary.to_string(),
            published: String::new(),
            authors: None,
        }
    }

    #[tokio::test]
    async fn test_classify_all_counts_and_falls_back() {
        let entries = vec![
            entry("one", "head and neck"),
            entry("two timeout", "head and neck"),
            entry("three", "colon"),
        ];
        let (classified, stats) = classify_all(entries, &KeywordClassifier, &NoDelay).await;

        assert_eq!(
            stats,
            ClassificationStats {
                accepted: 1,
                rejected: 2,
                failed: 1
            }
        );
        assert!(classified[1].fell_back);
        assert!(!classified[1].relevant);
        assert!(classified[1].reason.as_deref().unwrap().contains("timed out"));
        assert_eq!(stats.total(), 3);
    }

    #[tokio::test]
    async fn test_delay_is_applied_after_every_call() {
        let attempts = Mutex::new(Vec::new());
        let delay = |attempt: usize| {
            attempts.lock().unwrap().push(attempt);
            Duration::ZERO
        };
        let entries = vec![entry("a timeout", ""), entry("b", ""), entry("c", "")];
        classify_all(entries, &KeywordClassifier, &delay).await;
        assert_eq!(*attempts.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_partition_is_stable_and_total() {
        let entries = vec![
            entry("1", "head and neck"),
            entry("2", "colon"),
            entry("3", "head and neck"),
            entry("4", "colon"),
        ];
        let (classified, _) = classify_all(entries, &KeywordClassifier, &NoDelay).await;
        let (accepted, rejected) = partition(classified);

        let ids = |v: &[Entry]| v.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&accepted), vec!["1", "3"]);
        assert_eq!(ids(&rejected), vec!["2", "4"]);
    }

    #[tokio::test]
    async fn test_llm_classifier_empty_title_skips_the_model() {
        // An unreachable Ollama endpoint: reaching it would be a Request error, not EmptyTitle.
        let params = LLMParams {
            llm_client: crate::LLMClient::Ollama(ollama_rs::Ollama::new("http://127.0.0.1".to_string(), 9)),
            model: "test".to_string(),
            temperature: 0.0,
            timeout: Duration::from_millis(100),
        };
        let classifier = LlmClassifier::new(params, "topic", 100);

        let err = classifier.classify(&entry("", "summary")).await.unwrap_err();
        assert!(matches!(err, ClassificationError::EmptyTitle));
        assert_eq!(classifier.name(), "test");
    }
}
