use serde::{Deserialize, Serialize};

/// A single multiple-choice question produced by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub choices: Vec<String>,
    /// Index of the correct entry in `choices`.
    pub answer: i64,
    #[serde(default)]
    pub explanation: String,
}

impl QuizItem {
    #[must_use]
    pub fn new(question: &str, choices: &[&str], answer: usize, explanation: &str) -> Self {
        Self {
            question: question.to_string(),
            choices: choices.iter().map(ToString::to_string).collect(),
            answer: i64::try_from(answer).unwrap_or(-1),
            explanation: explanation.to_string(),
        }
    }

    /// The correct choice index, or `None` when `answer` is out of range.
    #[must_use]
    pub fn answer_index(&self) -> Option<usize> {
        usize::try_from(self.answer)
            .ok()
            .filter(|idx| *idx < self.choices.len())
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.answer_index().is_some()
    }

    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        self.answer_index() == Some(choice)
    }
}

/// A variable detected in the uploaded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// One ranked candidate analysis with its rationale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAnalysis {
    pub name: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flowchart_steps: Vec<String>,
}

/// Structured result returned by the analysis provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_test: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_analyses: Vec<RankedAnalysis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flowchart_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<String>,
    #[serde(default)]
    pub quiz: Vec<QuizItem>,
}

/// The payload persisted after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    pub session_id: String,
    #[serde(default)]
    pub analysis: Analysis,
}

impl AnalysisPayload {
    /// Load a payload from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a payload.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Quiz items that satisfy the answer-index invariant, in source order.
    ///
    /// Items with no choices or an out-of-range answer are dropped.
    #[must_use]
    pub fn quiz_items(&self) -> Vec<QuizItem> {
        let total = self.analysis.quiz.len();
        let valid: Vec<QuizItem> = self
            .analysis
            .quiz
            .iter()
            .filter(|item| item.is_valid())
            .cloned()
            .collect();
        if valid.len() < total {
            log::warn!(
                "session {}: dropped {} malformed quiz item(s)",
                self.session_id,
                total - valid.len()
            );
        }
        valid
    }
}

/// Summary row kept in the recent-analyses history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAnalysis {
    pub id: String,
    /// Milliseconds since the Unix epoch when the analysis was stored.
    pub at: i64,
    #[serde(default)]
    pub recommended_test: String,
    #[serde(default)]
    pub variables_count: usize,
    #[serde(default)]
    pub analysis: Analysis,
}

impl RecentAnalysis {
    #[must_use]
    pub fn from_payload(payload: &AnalysisPayload, at: i64) -> Self {
        Self {
            id: payload.session_id.clone(),
            at,
            recommended_test: payload
                .analysis
                .recommended_test
                .clone()
                .unwrap_or_default(),
            variables_count: payload.analysis.variables.len(),
            analysis: payload.analysis.clone(),
        }
    }
}
