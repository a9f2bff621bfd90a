//! A small in-memory knowledge base.
//!
//! Documents come from a JSON object mapping a section name to its content. Each section is
//! rendered as a labelled block of text and indexed either as one merged passage or as one
//! passage per section. Queries are scored with a lexical TF-IDF over lowercase terms and
//! always return the top `k` passages, the same shape a nearest-neighbour lookup gives.
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

lazy_static! {
    static ref TERM: Regex = Regex::new(r"[a-z0-9]+").expect("valid term regex");
}

pub const DEFAULT_TOP_K: usize = 4;

/// The AutoStream knowledge base shipped with the crate
pub const BUNDLED_KNOWLEDGE: &str = include_str!("../data/knowledge.json");

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KnowledgeError {
    #[error("Knowledge base unavailable: {0}")]
    Unavailable(String),
}

/// How sections are grouped into retrievable passages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chunking {
    /// Every section merged into a single passage
    #[default]
    Single,
    /// One passage per section
    PerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub chunking: Chunking,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl KnowledgeConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunking: Chunking::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Load and index the configured file, or `None` when it cannot be used
    pub fn load_index(&self) -> Option<KnowledgeIndex> {
        let index = load_documents(&self.path)
            .and_then(|documents| KnowledgeIndex::build(documents, self.chunking));
        match index {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!(error = %e, "knowledge base unavailable, retrieval runs degraded");
                None
            }
        }
    }
}

/// Index the bundled knowledge base, or `None` when it cannot be used
pub fn bundled_index(chunking: Chunking) -> Option<KnowledgeIndex> {
    match parse_documents(BUNDLED_KNOWLEDGE).and_then(|d| KnowledgeIndex::build(d, chunking)) {
        Ok(index) => Some(index),
        Err(e) => {
            tracing::warn!(error = %e, "bundled knowledge base unusable, retrieval runs degraded");
            None
        }
    }
}

/// A labelled section of the source document set
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub section: String,
    pub content: String,
}

impl Document {
    pub fn new<S: Into<String>, C: Into<String>>(section: S, content: C) -> Self {
        Self {
            section: section.into(),
            content: content.into(),
        }
    }

    fn render(&self) -> String {
        format!("Section: {}\nDetails: {}", self.section, self.content)
    }
}

/// A block of retrievable text and its relevance to the query that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    pub sections: Vec<String>,
    pub text: String,
    pub score: f32,
}

/// Read a knowledge file: a JSON object of section name to content
pub fn load_documents(path: impl AsRef<Path>) -> Result<Vec<Document>, KnowledgeError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|e| {
        KnowledgeError::Unavailable(format!("could not read {}: {}", path.display(), e))
    })?;
    parse_documents(&raw)
}

pub fn parse_documents(raw: &str) -> Result<Vec<Document>, KnowledgeError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| KnowledgeError::Unavailable(format!("malformed knowledge file: {}", e)))?;
    let Value::Object(sections) = value else {
        return Err(KnowledgeError::Unavailable(
            "knowledge file must contain a JSON object of sections".to_string(),
        ));
    };

    if sections.is_empty() {
        return Err(KnowledgeError::Unavailable(
            "knowledge file has no sections".to_string(),
        ));
    }

    Ok(sections
        .into_iter()
        .map(|(section, content)| {
            let content = match content {
                Value::String(text) => text,
                other => other.to_string(),
            };
            Document::new(section, content)
        })
        .collect())
}

#[derive(Debug)]
struct IndexedPassage {
    sections: Vec<String>,
    text: String,
    term_counts: HashMap<String, usize>,
    length: usize,
}

#[derive(Debug)]
pub struct KnowledgeIndex {
    passages: Vec<IndexedPassage>,
    document_frequency: HashMap<String, usize>,
}

impl KnowledgeIndex {
    pub fn build(documents: Vec<Document>, chunking: Chunking) -> Result<Self, KnowledgeError> {
        if documents.is_empty() {
            return Err(KnowledgeError::Unavailable(
                "no sections to index".to_string(),
            ));
        }

        let chunks: Vec<(Vec<String>, String)> = match chunking {
            Chunking::Single => {
                let sections = documents.iter().map(|d| d.section.clone()).collect();
                let text = documents
                    .iter()
                    .map(Document::render)
                    .collect::<Vec<_>>()
                    .join("\n\n");
                vec![(sections, text)]
            }
            Chunking::PerSection => documents
                .iter()
                .map(|d| (vec![d.section.clone()], d.render()))
                .collect(),
        };

        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let passages: Vec<IndexedPassage> = chunks
            .into_iter()
            .map(|(sections, text)| {
                let terms = tokenize(&text);
                let mut term_counts: HashMap<String, usize> = HashMap::new();
                for term in &terms {
                    *term_counts.entry(term.clone()).or_default() += 1;
                }
                for term in term_counts.keys() {
                    *document_frequency.entry(term.clone()).or_default() += 1;
                }
                IndexedPassage {
                    sections,
                    text,
                    term_counts,
                    length: terms.len().max(1),
                }
            })
            .collect();

        tracing::debug!(passages = passages.len(), ?chunking, "built knowledge index");
        Ok(Self {
            passages,
            document_frequency,
        })
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// The `k` most relevant passages for `text`, highest score first
    pub fn query(&self, text: &str, k: usize) -> Vec<Passage> {
        let query_terms: HashSet<String> = tokenize(text).into_iter().collect();
        let total = self.passages.len() as f32;

        let mut scored: Vec<(usize, f32)> = self
            .passages
            .iter()
            .enumerate()
            .map(|(position, passage)| {
                let score = query_terms
                    .iter()
                    .filter_map(|term| {
                        let count = *passage.term_counts.get(term)? as f32;
                        let df = *self.document_frequency.get(term)? as f32;
                        let idf = (1.0 + total / df).ln();
                        Some(count / passage.length as f32 * idf)
                    })
                    .sum();
                (position, score)
            })
            .collect();

        // sort_by is stable, ties keep document order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(k)
            .map(|(position, score)| {
                let passage = &self.passages[position];
                Passage {
                    sections: passage.sections.clone(),
                    text: passage.text.clone(),
                    score,
                }
            })
            .collect()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TERM.find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}
