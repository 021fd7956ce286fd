use std::sync::OnceLock;

use regex::Regex;

use super::state::FailureKind;
use super::state::GatewayFailure;
use super::state::GenerationResult;

pub const COMMENT_MARKER: char = '#';

static FENCE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn fence_pattern() -> &'static Regex {
    FENCE_PATTERN.get_or_init(|| {
        // Fixed literal pattern; compilation cannot fail at runtime.
        Regex::new(r"```(?:powershell|bash)?").expect("fence pattern is a valid literal")
    })
}

/// Removes code-fence markers (plain, `bash`, `powershell`) and surrounding
/// whitespace, keeping the fenced content.
pub fn strip_fences(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = fence_pattern().replace_all(&current, "").trim().to_string();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// True when `text` may be explained, executed or copied.
pub fn is_runnable_command(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && !text.starts_with(COMMENT_MARKER)
}

pub fn classify(raw: &str) -> GenerationResult {
    let cleaned = strip_fences(raw);
    if cleaned.is_empty() {
        return GenerationResult::Error(GatewayFailure::new(
            FailureKind::Parse,
            "service returned an empty command",
        ));
    }
    if cleaned.starts_with(COMMENT_MARKER) {
        return GenerationResult::Refusal(cleaned);
    }
    GenerationResult::Command(cleaned)
}
