// src/knowledge/mod.rs
//! Keyword-scored retrieval over a small curated knowledge corpus.
//!
//! Entries are loaded from a JSON file at startup; if the file is missing
//! or malformed the store falls back to a built-in corpus so retrieval
//! keeps working. Scoring is deliberately simple: topic and keyword hits
//! dominate, raw content-word overlap breaks ties.

use std::fs;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Score for the query containing an entry's topic verbatim.
const TOPIC_WEIGHT: u32 = 5;
/// Score per metadata keyword found in the query.
const KEYWORD_WEIGHT: u32 = 3;
/// Score per query word (longer than three characters) found in the content.
const CONTENT_WEIGHT: u32 = 1;

/// Returned as the prompt context when nothing in the corpus matched.
pub const NO_RESULTS_CONTEXT: &str =
    "No specific information found in knowledge base. Provide general guidance.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeMetadata {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub topic: String,
    pub content: String,
    pub source: String,
    #[serde(default)]
    pub metadata: KnowledgeMetadata,
}

pub struct KnowledgeStore {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeStore {
    /// Loads the corpus from `path`, falling back to the built-in entries
    /// when the file cannot be read or parsed.
    pub fn load(path: &str) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Vec<KnowledgeEntry>>(&raw) {
                Ok(entries) => {
                    info!("📚 Loaded {} knowledge entries from {}", entries.len(), path);
                    entries
                }
                Err(e) => {
                    warn!("Knowledge file {} is malformed ({}); using built-in corpus", path, e);
                    Self::default_corpus()
                }
            },
            Err(e) => {
                warn!("Knowledge file {} unavailable ({}); using built-in corpus", path, e);
                Self::default_corpus()
            }
        };
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-`k` entries for a query, highest score first. Entries that score
    /// zero are never returned, so an off-topic query yields an empty list.
    pub fn search(&self, query: &str, k: usize) -> Vec<&KnowledgeEntry> {
        let query = query.to_lowercase();
        let query_words: Vec<&str> =
            query.split_whitespace().filter(|word| word.len() > 3).collect();

        let mut scored: Vec<(u32, &KnowledgeEntry)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let score = Self::score(entry, &query, &query_words);
                (score > 0).then_some((score, entry))
            })
            .collect();

        // Stable sort keeps corpus order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(k).map(|(_, entry)| entry).collect()
    }

    /// Formats search results into the context block injected into the
    /// system prompt. An empty result set yields an explicit no-information
    /// marker rather than an empty string.
    pub fn format_context(results: &[&KnowledgeEntry]) -> String {
        if results.is_empty() {
            return NO_RESULTS_CONTEXT.to_string();
        }
        results
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("[Source {}: {}]\n{}", i + 1, entry.source, entry.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn score(entry: &KnowledgeEntry, query: &str, query_words: &[&str]) -> u32 {
        let mut score = 0;

        if query.contains(&entry.topic.to_lowercase()) {
            score += TOPIC_WEIGHT;
        }
        for keyword in &entry.metadata.keywords {
            if query.contains(&keyword.to_lowercase()) {
                score += KEYWORD_WEIGHT;
            }
        }
        let content = entry.content.to_lowercase();
        for word in query_words {
            if content.contains(word) {
                score += CONTENT_WEIGHT;
            }
        }
        score
    }

    fn default_corpus() -> Vec<KnowledgeEntry> {
        vec![
            KnowledgeEntry {
                topic: "fees".to_string(),
                content: "Remote students at Northfield are charged the same supplementary \
                          fees as on-campus students, including the recreation fee, transit \
                          pass, and student activity fee. Students who study entirely online \
                          and live outside the region can apply for supplementary fee \
                          exemptions through Student Accounts. Exemption requests must be \
                          submitted before the end of the second week of the semester."
                    .to_string(),
                source: "Student Accounts - Fee Policy".to_string(),
                metadata: KnowledgeMetadata {
                    category: "fees".to_string(),
                    keywords: vec![
                        "fee".to_string(),
                        "tuition".to_string(),
                        "gym".to_string(),
                        "bus".to_string(),
                        "transit".to_string(),
                        "exemption".to_string(),
                        "charge".to_string(),
                    ],
                },
            },
            KnowledgeEntry {
                topic: "remote_learning".to_string(),
                content: "Northfield's degree completion programs are delivered fully online \
                          with optional on-campus sessions each semester. Lectures are \
                          recorded and available within 24 hours. Remote students have full \
                          access to library e-resources, online tutoring, and virtual office \
                          hours with instructors."
                    .to_string(),
                source: "Remote Learning Handbook".to_string(),
                metadata: KnowledgeMetadata {
                    category: "academics".to_string(),
                    keywords: vec![
                        "online".to_string(),
                        "remote".to_string(),
                        "lecture".to_string(),
                        "recording".to_string(),
                        "library".to_string(),
                    ],
                },
            },
            KnowledgeEntry {
                topic: "wellness".to_string(),
                content: "The Student Wellbeing Centre offers free counselling to all \
                          registered students, including those studying remotely. Phone and \
                          video appointments are available 8:00am-10:00pm daily. Students in \
                          crisis can call the 24/7 line at 1-833-555-0199 at any time."
                    .to_string(),
                source: "Student Wellbeing Centre".to_string(),
                metadata: KnowledgeMetadata {
                    category: "wellness".to_string(),
                    keywords: vec![
                        "counselling".to_string(),
                        "stress".to_string(),
                        "mental".to_string(),
                        "health".to_string(),
                        "support".to_string(),
                    ],
                },
            },
            KnowledgeEntry {
                topic: "registration".to_string(),
                content: "Course registration for continuing students opens in July for the \
                          fall semester and November for the winter semester. Full-time \
                          status requires enrollment in at least 4 courses per semester. \
                          Students can add or drop courses without penalty during the first \
                          two weeks of classes."
                    .to_string(),
                source: "Office of the Registrar".to_string(),
                metadata: KnowledgeMetadata {
                    category: "academics".to_string(),
                    keywords: vec![
                        "register".to_string(),
                        "enrollment".to_string(),
                        "add".to_string(),
                        "drop".to_string(),
                        "course".to_string(),
                        "semester".to_string(),
                    ],
                },
            },
            KnowledgeEntry {
                topic: "technical_support".to_string(),
                content: "The IT Service Desk supports the student portal, university email, \
                          and the online learning platform. Password resets are self-serve \
                          through the account portal. For platform outages during scheduled \
                          exams, contact the desk immediately so accommodations can be \
                          arranged."
                    .to_string(),
                source: "IT Service Desk".to_string(),
                metadata: KnowledgeMetadata {
                    category: "technical".to_string(),
                    keywords: vec![
                        "portal".to_string(),
                        "password".to_string(),
                        "login".to_string(),
                        "email".to_string(),
                        "platform".to_string(),
                    ],
                },
            },
        ]
    }
}
