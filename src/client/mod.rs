//! The two outbound operations: one-shot analysis and follow-up chat.
//!
//! Both clients are thin: they build a [`crate::provider::GenerateRequest`]
//! around the encoded document, make exactly one call, and turn the answer
//! (or failure) into a crate-level result. They never retry and never cache;
//! the session decides what to do with a failure.
//!
//! ```text
//! analysis: [user: <pdf> + instruction]                    ──▶ JSON AnalysisResult
//! chat:     [user: q1] [model: a1] … [user: <pdf> + qN]    ──▶ free text
//! ```

pub mod analysis;
pub mod chat;

use crate::document::Document;
use crate::provider::Part;

/// The document as an inline request part.
fn document_part(document: &Document) -> Part {
    Part::InlineData {
        mime_type: document.media_type().to_string(),
        data: document.shared_content(),
    }
}
