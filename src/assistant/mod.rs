//! Question answering on top of a worker session
//!
//! Relevant questions go to the catalogue search tool and the raw results
//! are phrased by a [`PhraseGenerator`]; everything else, and any failure
//! along the way, is answered by the generator directly.

pub mod generator;
pub mod relevance;
pub mod vocabulary;

use serde::Serialize;

pub use generator::{results_prompt, PhraseGenerator, PlainGenerator, CATALOGUE_ONLY};
pub use relevance::{FuzzyScorer, KeywordScorer, RelevanceScorer};
pub use vocabulary::{extract_vocabulary, load_vocabulary, save_vocabulary};

use crate::client::SessionHandle;
use crate::error::Result;

/// Where an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Catalogue,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

pub struct Assistant {
    session: SessionHandle,
    scorer: Box<dyn RelevanceScorer>,
    generator: Box<dyn PhraseGenerator>,
}

impl Assistant {
    pub fn new(
        session: SessionHandle,
        scorer: Box<dyn RelevanceScorer>,
        generator: Box<dyn PhraseGenerator>,
    ) -> Self {
        Self {
            session,
            scorer,
            generator,
        }
    }

    /// Answer a question; never fails
    pub async fn answer(&self, question: &str) -> Answer {
        if self.scorer.should_use_store(question) {
            tracing::debug!("Using catalogue search for '{}'", question);
            match self.answer_from_catalogue(question).await {
                Ok(text) => {
                    return Answer {
                        text,
                        source: AnswerSource::Catalogue,
                    }
                }
                Err(e) => tracing::warn!("Catalogue search failed, answering directly: {}", e),
            }
        }

        Answer {
            text: self.general_answer(question),
            source: AnswerSource::General,
        }
    }

    async fn answer_from_catalogue(&self, question: &str) -> Result<String> {
        let results = self.session.search(question).await?;
        self.generator.generate(&results_prompt(question, &results))
    }

    /// Ask the generator directly
    pub fn general_answer(&self, question: &str) -> String {
        match self.generator.generate(question) {
            Ok(text) => text,
            Err(e) => format!("Sorry, I encountered an error: {}", e),
        }
    }
}
