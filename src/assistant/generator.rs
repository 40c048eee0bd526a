//! Phrasing of final answers

use crate::error::Result;

/// Turns a prompt into the text shown to the user
///
/// Implementations wrapping a hosted model report failures as
/// `BridgeError::Generation`.
pub trait PhraseGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

const RESULTS_HEADER: &str = "Database search results:";
const RESULTS_FOOTER: &str = "Please provide a helpful, conversational response";

/// Reply used by [`PlainGenerator`] for questions outside the catalogue
pub const CATALOGUE_ONLY: &str =
    "I can only help with questions about the music catalogue: try asking about artists, albums or songs.";

/// Prompt asking a generator to phrase raw search results
pub fn results_prompt(question: &str, results: &str) -> String {
    format!(
        "The user asked: \"{question}\"\n\n\
         {RESULTS_HEADER}\n{results}\n\n\
         {RESULTS_FOOTER} based on these results.\n\
         If no results were found, suggest alternative searches."
    )
}

/// Generator without a language model
///
/// Echoes the search results embedded in a results prompt and answers
/// anything else with [`CATALOGUE_ONLY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainGenerator;

impl PhraseGenerator for PlainGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let Some(start) = prompt.find(RESULTS_HEADER) else {
            return Ok(CATALOGUE_ONLY.to_string());
        };
        let body = &prompt[start + RESULTS_HEADER.len()..];
        let body = match body.rfind(RESULTS_FOOTER) {
            Some(end) => &body[..end],
            None => body,
        };
        Ok(body.trim().to_string())
    }
}
