use super::action::{Concept, LayoutMode};
use serde::{Deserialize, Serialize};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Speaker,
    pub text: String,
}

/// Presentation state mutated by the director, one action at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub layout: LayoutMode,
    pub code: String,
    pub highlight: Option<String>,
    pub concept: Option<Concept>,
    pub transcript: Vec<TranscriptEntry>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_layout(&mut self, mode: LayoutMode) {
        self.layout = mode;
        self.highlight = None;
    }

    pub fn set_code(&mut self, code: &str) {
        self.code = normalize_code(code);
        self.highlight = None;
    }

    pub fn set_concept(&mut self, concept: Concept) {
        self.concept = Some(concept);
    }

    pub fn set_highlight(&mut self, query: &str) {
        self.highlight = Some(normalize_query(query));
    }

    /// Appends assistant speech, extending the latest entry when it is also
    /// from the assistant. Returns the index of the entry that changed.
    pub fn push_assistant(&mut self, text: &str) -> usize {
        if let Some(last) = self.transcript.last_mut() {
            if last.role == Speaker::Assistant {
                last.text.push(' ');
                last.text.push_str(text);
                return self.transcript.len() - 1;
            }
        }
        self.transcript.push(TranscriptEntry {
            role: Speaker::Assistant,
            text: text.to_string(),
        });
        self.transcript.len() - 1
    }

    /// Appends a user turn. User entries never coalesce.
    pub fn push_user(&mut self, text: &str) -> usize {
        self.transcript.push(TranscriptEntry {
            role: Speaker::User,
            text: text.to_string(),
        });
        self.transcript.len() - 1
    }

    /// Zero-based indices of the code lines matching the active highlight.
    pub fn highlighted_lines(&self) -> Vec<usize> {
        match &self.highlight {
            Some(query) => highlighted_lines(&self.code, query),
            None => Vec::new(),
        }
    }
}

/// Expands tabs to two spaces and drops non-breaking spaces.
pub fn normalize_code(code: &str) -> String {
    code.replace('\t', "  ").replace('\u{00A0}', "")
}

/// Normalizes a highlight query the same way as code, then trims it.
pub fn normalize_query(query: &str) -> String {
    normalize_code(query).trim().to_string()
}

/// Lines whose normalized text contains the normalized query. Case-sensitive;
/// each line is reported at most once; an empty query matches nothing.
pub fn highlighted_lines(code: &str, query: &str) -> Vec<usize> {
    let query = normalize_query(query);
    if query.is_empty() {
        return Vec::new();
    }
    code.lines()
        .enumerate()
        .filter(|(_, line)| normalize_code(line).contains(&query))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("\tif x {\u{00A0}}"), "  if x {}");
    }

    #[test]
    fn test_highlight_matches_tab_indented_line() {
        let mut stage = Stage::new();
        stage.set_code("function f() {\n\tconst x = 1;\n\treturn x;\n}");
        stage.set_highlight("const x");

        assert_eq!(stage.code.lines().nth(1), Some("  const x = 1;"));
        assert_eq!(stage.highlighted_lines(), vec![1]);
    }

    #[test]
    fn test_highlight_is_case_sensitive_substring() {
        let code = "let total = 0;\nlet Total = 1;\ntotal += total;";
        assert_eq!(highlighted_lines(code, "total"), vec![0, 2]);
        assert_eq!(highlighted_lines(code, "  Total "), vec![1]);
        assert!(highlighted_lines(code, "   ").is_empty());
    }

    #[test]
    fn test_layout_and_code_clear_highlight() {
        let mut stage = Stage::new();
        stage.set_code("a\nb");
        stage.set_highlight("a");
        stage.set_layout(LayoutMode::Split);
        assert!(stage.highlight.is_none());

        stage.set_highlight("b");
        stage.set_concept(Concept {
            title: "T".into(),
            text: "x".into(),
        });
        assert_eq!(stage.highlight.as_deref(), Some("b"));

        stage.set_code("c");
        assert!(stage.highlight.is_none());
    }

    #[test]
    fn test_assistant_speech_coalesces() {
        let mut stage = Stage::new();
        assert_eq!(stage.push_assistant("Hello"), 0);
        assert_eq!(stage.push_assistant("world"), 0);
        assert_eq!(stage.transcript.len(), 1);
        assert_eq!(stage.transcript[0].text, "Hello world");

        stage.push_user("Why?");
        assert_eq!(stage.push_assistant("Because."), 2);
        assert_eq!(stage.transcript.len(), 3);
    }
}
