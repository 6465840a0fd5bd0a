/// Topic used when none is configured.
pub const DEFAULT_TOPIC: &str = "head and neck cancer \
(including oral, laryngeal, tonsil, oropharynx, pharyngeal, larynx, \
hypopharynx, nasopharynx, nasal, thyroid, head and neck skin SCC, \
salivary gland cancers, rare head and neck cancer)";

/// Constrains the model to one of the two tokens the verdict parser accepts.
pub const ANSWER_YES_OR_NO: &str = r#"Answer ONLY "YES" or "NO"."#;

pub const BIOMEDICAL_EXPERT: &str = "You are a biomedical expert.";

/// How a scoring answer must be shaped.
pub const SCORE_FORMAT_INSTRUCTIONS: &str = r#"Return your response as a JSON object with:
- "score": A number from 0-100 (where 100 is highest impact/importance)
- "reasoning": A 1-2 sentence explanation of your score

Example format:
{"score": 85, "reasoning": "Large randomized trial in NEJM showing significant survival benefit with novel therapy. Clear practice-changing implications."}"#;
