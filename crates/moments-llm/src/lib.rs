pub mod ark;
pub mod prompt;
pub mod protocol;
pub mod provider;

pub use ark::ArkProvider;
pub use prompt::{build_analysis_messages, ANALYSIS_PROMPT, SYSTEM_PROMPT};
pub use protocol::{
    AssistantMessage, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ImageUrl,
    RequestContent, RequestPart, Role,
};
pub use provider::{LLMError, Result, VisionProvider};
