pub mod analysis;
pub mod limits;
pub mod normalize;
pub mod report;

pub use analysis::{
    AnalysisEnvelope, AnalysisReport, DatingSuggestions, Emotion, Interest, Lifestyle,
    Personality, Suggestions, Values,
};
pub use normalize::{flatten_content, normalize_content, ContentPart, MessageContent, NormalizedAnalysis};
pub use report::{build_report_markdown, REPORT_TITLE};
