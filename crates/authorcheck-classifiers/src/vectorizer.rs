//! Word n-gram vectorizers
//!
//! Two flavours share one vocabulary builder:
//! - [`VectorizerKind::Count`]: raw n-gram counts, non-negative integers
//! - [`VectorizerKind::Tfidf`]: counts scaled by smoothed inverse document
//!   frequency and L2-normalized per document
//!
//! Output matrices are CSR with one row per input text.

use ahash::{AHashMap, AHashSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sprs::CsMat;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Which feature weighting a pipeline uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorizerKind {
    /// Raw term counts
    Count,
    /// Term frequency times inverse document frequency
    Tfidf,
}

/// Vocabulary parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerParams {
    /// Smallest n-gram length, in words
    pub ngram_min: usize,
    /// Largest n-gram length, in words
    pub ngram_max: usize,
    /// Minimum number of documents a term must appear in
    pub min_df: usize,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            ngram_min: 1,
            ngram_max: 2,
            min_df: 1,
        }
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

/// Split text into lowercase word tokens of two or more characters
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Fitted vectorizer: vocabulary plus (for TF-IDF) per-term IDF weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextVectorizer {
    kind: VectorizerKind,
    params: VectorizerParams,
    /// Term to column index, columns assigned in lexical order
    vocabulary: BTreeMap<String, usize>,
    /// Empty for count vectorizers
    idf: Vec<f64>,
}

impl TextVectorizer {
    /// Learn the vocabulary (and IDF weights) from training texts
    pub fn fit<T: AsRef<str>>(kind: VectorizerKind, params: VectorizerParams, texts: &[T]) -> Self {
        debug!(num_texts = texts.len(), ?kind, "Fitting vectorizer");

        let mut document_frequency: AHashMap<String, usize> = AHashMap::new();
        for text in texts {
            let unique: AHashSet<String> = ngrams(text.as_ref(), &params).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<(String, usize)> = document_frequency
            .into_iter()
            .filter(|(_, df)| *df >= params.min_df)
            .collect();
        terms.sort_by(|a, b| a.0.cmp(&b.0));

        let idf = match kind {
            VectorizerKind::Count => Vec::new(),
            VectorizerKind::Tfidf => {
                let n_docs = texts.len() as f64;
                terms
                    .iter()
                    .map(|(_, df)| ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0)
                    .collect()
            }
        };

        let vocabulary: BTreeMap<String, usize> = terms
            .into_iter()
            .enumerate()
            .map(|(idx, (term, _))| (term, idx))
            .collect();

        debug!(vocab_size = vocabulary.len(), "Vectorizer fitting complete");

        Self {
            kind,
            params,
            vocabulary,
            idf,
        }
    }

    /// Fit and transform the same texts
    pub fn fit_transform<T: AsRef<str>>(
        kind: VectorizerKind,
        params: VectorizerParams,
        texts: &[T],
    ) -> (Self, CsMat<f64>) {
        let vectorizer = Self::fit(kind, params, texts);
        let matrix = vectorizer.transform(texts);
        (vectorizer, matrix)
    }

    /// Map texts onto the fitted vocabulary. Unknown terms are ignored.
    pub fn transform<T: AsRef<str>>(&self, texts: &[T]) -> CsMat<f64> {
        let mut indptr = Vec::with_capacity(texts.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for text in texts {
            let mut counts: AHashMap<usize, f64> = AHashMap::new();
            for term in ngrams(text.as_ref(), &self.params) {
                if let Some(&col) = self.vocabulary.get(term.as_str()) {
                    *counts.entry(col).or_insert(0.0) += 1.0;
                }
            }

            let mut row: Vec<(usize, f64)> = counts.into_iter().collect();
            row.sort_unstable_by_key(|(col, _)| *col);

            if self.kind == VectorizerKind::Tfidf {
                for (col, value) in row.iter_mut() {
                    *value *= self.idf[*col];
                }
                let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, value) in row.iter_mut() {
                        *value /= norm;
                    }
                }
            }

            for (col, value) in row {
                indices.push(col);
                data.push(value);
            }
            indptr.push(indices.len());
        }

        CsMat::new((texts.len(), self.num_features()), indptr, indices, data)
    }

    /// Number of columns produced by `transform`
    pub fn num_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Feature weighting in use
    pub fn kind(&self) -> VectorizerKind {
        self.kind
    }

    /// Column index of a term, if it is in the vocabulary
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }
}

/// All word n-grams of the configured lengths, in document order
fn ngrams(text: &str, params: &VectorizerParams) -> Vec<String> {
    let tokens = tokenize(text);
    let mut grams = Vec::new();
    for n in params.ngram_min..=params.ngram_max {
        if n == 0 || n > tokens.len() {
            continue;
        }
        for window in tokens.windows(n) {
            grams.push(window.join(" "));
        }
    }
    grams
}
