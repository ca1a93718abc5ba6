//! Hybrid re-ranking: vector similarity blended with keyword-match boosting
//!
//! Pure vector similarity under-ranks passages containing exact rare terms
//! (product codes, numeric identifiers) that general-purpose embeddings
//! under-weight. The boost adds a fixed increment per distinct query keyword
//! literally present in a candidate's content, capped so a keyword-stuffed
//! irrelevant passage can never outrank a strong semantic match by more than
//! the cap.
//!
//! Scoring is pure: a [`ScoredChunk`] from the store goes in, a
//! [`RetrievalResult`] comes out, and nothing is mutated in place, so the
//! ranking logic is testable without a live store.

use crate::storage::ScoredChunk;
use std::collections::HashMap;

/// Additive boost per distinct matching keyword.
pub const KEYWORD_BOOST_PER_MATCH: f32 = 0.25;
/// Upper bound on the total keyword boost.
pub const KEYWORD_BOOST_CAP: f32 = 0.7;

/// Articles and common question words carrying no retrieval signal.
const STOP_WORDS: &[&str] = &[
    "what", "is", "the", "are", "how", "do", "can", "your", "my", "a", "an", "to", "of", "for",
    "and", "or", "in",
];

/// A ranked retrieval hit. Ephemeral, never persisted.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RetrievalResult {
    pub filename: String,
    pub content: String,
    pub chunk_index: usize,
    pub metadata: HashMap<String, String>,
    /// Raw vector similarity from the store.
    pub base_similarity: f32,
    /// Total keyword boost, `0.0..=KEYWORD_BOOST_CAP`.
    pub keyword_boost: f32,
    /// Combined score used for final ordering.
    pub similarity: f32,
}

/// Extract search keywords from a query: lowercased, punctuation-stripped,
/// longer than two characters, not a stop word, deduplicated.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in query.to_lowercase().split_whitespace() {
        let term = token.trim_matches(|c: char| !c.is_alphanumeric());
        if term.chars().count() <= 2 || STOP_WORDS.contains(&term) {
            continue;
        }
        if !keywords.iter().any(|k| k == term) {
            keywords.push(term.to_string());
        }
    }
    keywords
}

/// Boost for a candidate's content: one increment per distinct keyword
/// literally present (case-insensitive), capped at [`KEYWORD_BOOST_CAP`].
/// Occurrences beyond the first of the same keyword do not count.
pub fn keyword_boost(keywords: &[String], content: &str) -> f32 {
    let content_lower = content.to_lowercase();
    let matches = keywords
        .iter()
        .filter(|keyword| content_lower.contains(keyword.as_str()))
        .count();
    (KEYWORD_BOOST_PER_MATCH * matches as f32).min(KEYWORD_BOOST_CAP)
}

/// Score a single store candidate against the extracted keywords.
pub fn score(candidate: ScoredChunk, keywords: &[String]) -> RetrievalResult {
    let boost = keyword_boost(keywords, &candidate.chunk.content);
    RetrievalResult {
        filename: candidate.chunk.filename,
        content: candidate.chunk.content,
        chunk_index: candidate.chunk.chunk_index,
        metadata: candidate.chunk.metadata,
        base_similarity: candidate.base_similarity,
        keyword_boost: boost,
        similarity: candidate.base_similarity + boost,
    }
}

/// Score all candidates and return the top `limit` by combined score.
///
/// Ordering is combined score descending; ties break on base similarity
/// descending, then `(filename, chunk_index)` ascending so results are
/// deterministic for identical scores.
pub fn rank(candidates: Vec<ScoredChunk>, keywords: &[String], limit: usize) -> Vec<RetrievalResult> {
    let mut results: Vec<RetrievalResult> = candidates
        .into_iter()
        .map(|candidate| score(candidate, keywords))
        .collect();

    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.base_similarity
                    .partial_cmp(&a.base_similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.filename.cmp(&b.filename))
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    });
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DocumentChunk;

    fn candidate(filename: &str, content: &str, base_similarity: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: DocumentChunk {
                filename: filename.to_string(),
                content: content.to_string(),
                chunk_index: 0,
                total_chunks: 1,
                embedding: vec![0.0],
                metadata: HashMap::new(),
            },
            base_similarity,
        }
    }

    #[test]
    fn test_extract_keywords_filters_noise() {
        let keywords = extract_keywords("What is the USSD code for transfers?");
        assert_eq!(keywords, vec!["ussd", "code", "transfers"]);
    }

    #[test]
    fn test_extract_keywords_deduplicates() {
        let keywords = extract_keywords("fees fees FEES and more fees");
        assert_eq!(keywords, vec!["fees", "more"]);
    }

    #[test]
    fn test_extract_keywords_strips_punctuation() {
        let keywords = extract_keywords("\"overdraft\", limits? (daily)");
        assert_eq!(keywords, vec!["overdraft", "limits", "daily"]);
    }

    #[test]
    fn test_boost_counts_distinct_keywords_once() {
        let keywords = extract_keywords("ussd code balance");
        // "ussd" appears three times but counts once; "code" once; no "balance".
        let boost = keyword_boost(&keywords, "Dial the USSD menu. USSD code: *462#. ussd");
        assert!((boost - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_boost_is_capped() {
        let keywords = extract_keywords("alpha beta gamma delta epsilon zeta");
        assert_eq!(keywords.len(), 6);
        let boost = keyword_boost(&keywords, "alpha beta gamma delta epsilon zeta");
        assert!((boost - KEYWORD_BOOST_CAP).abs() < 1e-6);
    }

    #[test]
    fn test_boost_never_negative() {
        let keywords = extract_keywords("anything relevant");
        assert_eq!(keyword_boost(&keywords, "totally unrelated text"), 0.0);
        assert_eq!(keyword_boost(&[], "any content at all"), 0.0);
    }

    #[test]
    fn test_score_is_additive() {
        let keywords = extract_keywords("What is the USSD code");
        let result = score(candidate("faq.md", "The USSD code is *462#.", 0.4), &keywords);
        assert!((result.base_similarity - 0.4).abs() < 1e-6);
        assert!((result.keyword_boost - 0.5).abs() < 1e-6);
        assert!((result.similarity - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_exact_term_outranks_semantic_neighbor() {
        // The literal-match candidate starts slightly behind on vector
        // similarity but the boost more than closes the gap.
        let keywords = extract_keywords("What is the USSD code");
        let results = rank(
            vec![
                candidate("generic.md", "You can check balances in the app.", 0.60),
                candidate("ussd.md", "Dial the USSD shortcode to continue.", 0.55),
            ],
            &keywords,
            5,
        );
        assert_eq!(results[0].filename, "ussd.md");
        assert!(results[0].similarity >= results[1].similarity + 0.25 - 0.05);
    }

    #[test]
    fn test_rank_tie_break_is_deterministic() {
        let results = rank(
            vec![
                candidate("b.md", "same text", 0.5),
                candidate("a.md", "same text", 0.5),
            ],
            &[],
            5,
        );
        assert_eq!(results[0].filename, "a.md");
        assert_eq!(results[1].filename, "b.md");
    }

    #[test]
    fn test_rank_truncates_to_limit() {
        let candidates = (0..10)
            .map(|i| candidate(&format!("f{i}.md"), "text", i as f32 / 10.0))
            .collect();
        let results = rank(candidates, &[], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].filename, "f9.md");
    }
}
