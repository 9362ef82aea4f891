pub mod assistant_client;
pub mod markdown;
pub mod request_error;
pub mod syntax_highlighter;

pub use assistant_client::{
    AssistantClient, AssistantRequest, DEFAULT_ENDPOINT, HistoryEntry, HttpAssistantClient,
};
pub use markdown::{
    Block, CodeBlock, CodeLine, InlineSpan, InlineStyle, ListItem, ListMarker, RenderedContent,
    render_markdown,
};
pub use request_error::RequestError;
pub use syntax_highlighter::{HighlightedSpan, PLAIN_TEXT_LANGUAGE, Rgb};
