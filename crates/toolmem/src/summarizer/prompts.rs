//! Prompts for LLM-backed summarizers

/// System message sent with every summarization request
pub const SYSTEM_PROMPT: &str =
    "You condense tool output for an autonomous agent. You never invent facts.";

/// Summarization prompt
///
/// Placeholder: {text} - the content to summarize
pub const SUMMARY_PROMPT: &str = r#"Summarize the following content produced by a tool invocation.

Keep:
- Concrete facts, figures, identifiers and file names
- Errors, warnings and their causes
- Anything a follow-up step would need to act on

Drop:
- Repetition and boilerplate
- Formatting noise (progress bars, decorative separators)

Content:
{text}

Respond with the summary only, no preamble."#;

/// Render the summarization prompt for `text`
pub fn summary_prompt(text: &str) -> String {
    SUMMARY_PROMPT.replace("{text}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_inserts_text() {
        let prompt = summary_prompt("ls output: a.txt b.txt");
        assert!(prompt.contains("ls output: a.txt b.txt"));
        assert!(!prompt.contains("{text}"));
    }
}
