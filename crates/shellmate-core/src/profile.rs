use serde::Deserialize;
use serde::Serialize;

pub const COMMAND_GENERATION_INSTRUCTION: &str = "You are an expert on Linux, bash, and zsh shell commands. \
Your sole purpose is to receive a natural language query and return \
ONLY the single, most appropriate shell command. \
Do not provide any explanation, markdown, code blocks, or any text \
other than the command itself. \
If the request is ambiguous, dangerous, or cannot be fulfilled, \
return a comment starting with #: \n# Cannot fulfill request.";

pub const COMMAND_EXPLANATION_INSTRUCTION: &str = "You are an expert programming and shell command tutor. \
A user will provide a shell command, and your job is to explain it. \
Break down the command into its core components (the command itself, flags, arguments). \
Explain what each part does in a simple, clear, and beginner-friendly way. \
Format your response as a simple text log. \
Start with a one-line summary. Example:\n\n\
Summary: This command finds all '.py' files and counts them.\n\n\
Breakdown:\n  \
- `find .`: Searches the current directory.\n  \
- `-name '*.py'`: Looks for files ending in '.py'.\n  \
- `| wc -l`: Pipes the results to 'word count' to count the lines.";

/// System-level directive sent alongside every prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionProfile {
    #[default]
    CommandGeneration,
    CommandExplanation,
    Custom(String),
}

impl InstructionProfile {
    pub fn instruction(&self) -> &str {
        match self {
            Self::CommandGeneration => COMMAND_GENERATION_INSTRUCTION,
            Self::CommandExplanation => COMMAND_EXPLANATION_INSTRUCTION,
            Self::Custom(text) => text.as_str(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CommandGeneration => "command-generation",
            Self::CommandExplanation => "command-explanation",
            Self::Custom(_) => "custom",
        }
    }
}
