//! Context-backoff word prediction.
//!
//! Suggestions come from the longest preceding-word context that has a
//! prefix-matching continuation, topped up from progressively shorter
//! contexts and finally from plain unigram frequency.

use crate::config::DataPaths;
use crate::predict::table::NGramTable;
use std::fmt;

/// Number of suggestion slots shown to the user.
pub const DEFAULT_MAX_RESULTS: usize = 3;

/// Which table produced the first suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NGramLevel {
    Penta,
    Quad,
    Tri,
    Bi,
    Uni,
    #[default]
    None,
}

impl NGramLevel {
    fn for_order(order: usize) -> Self {
        match order {
            5 => NGramLevel::Penta,
            4 => NGramLevel::Quad,
            3 => NGramLevel::Tri,
            2 => NGramLevel::Bi,
            1 => NGramLevel::Uni,
            _ => NGramLevel::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NGramLevel::Penta => "5G",
            NGramLevel::Quad => "4G",
            NGramLevel::Tri => "3G",
            NGramLevel::Bi => "2G",
            NGramLevel::Uni => "1G",
            NGramLevel::None => "—",
        }
    }
}

impl fmt::Display for NGramLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Ranked suggestions plus the diagnostics shown next to them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Suggestions {
    pub candidates: Vec<String>,
    pub level: NGramLevel,
    /// Context words (or prefix) the winning lookup used
    pub context_key: String,
}

impl Suggestions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.candidates.get(index).map(String::as_str)
    }

    pub fn top(&self) -> Option<&str> {
        self.get(0)
    }

    /// Merge `hits` in; the first step to contribute claims the level.
    fn absorb<'a, I, K>(&mut self, level: NGramLevel, context_key: K, hits: I, cap: usize)
    where
        K: FnOnce() -> String,
        I: IntoIterator<Item = &'a String>,
    {
        let added = merge_into(&mut self.candidates, hits, cap);
        if added > 0 && self.level == NGramLevel::None {
            self.level = level;
            self.context_key = context_key();
        }
    }
}

/// Holds the five n-gram tables, unigrams first.
#[derive(Debug, Clone)]
pub struct PredictiveEngine {
    tables: [NGramTable; 5],
}

impl PredictiveEngine {
    pub fn from_tables(
        unigrams: NGramTable,
        bigrams: NGramTable,
        trigrams: NGramTable,
        quadrigrams: NGramTable,
        pentagrams: NGramTable,
    ) -> Self {
        Self {
            tables: [unigrams, bigrams, trigrams, quadrigrams, pentagrams],
        }
    }

    /// Only the built-in unigram list, no context tables
    pub fn with_defaults() -> Self {
        Self::from_tables(
            NGramTable::default_unigrams(),
            NGramTable::empty(2),
            NGramTable::empty(3),
            NGramTable::empty(4),
            NGramTable::empty(5),
        )
    }

    /// Load every table from disk. Never fails: an unreadable context table
    /// becomes empty and an unreadable unigram table becomes the built-in list.
    pub fn load(paths: &DataPaths) -> Self {
        let tables = std::array::from_fn(|idx| {
            let order = idx + 1;
            let path = paths.by_order()[idx];
            match NGramTable::load(path, order) {
                Ok(table) if order == 1 && table.is_empty() => {
                    log::warn!("{} has no words, using built-in list", path.display());
                    NGramTable::default_unigrams()
                }
                Ok(table) => {
                    log::info!(
                        "Loaded {}-gram table {} ({} contexts, {} words)",
                        order,
                        path.display(),
                        table.len(),
                        table.entry_count()
                    );
                    table
                }
                Err(err) if order == 1 => {
                    log::warn!("Unigram table unavailable ({}), using built-in list", err);
                    NGramTable::default_unigrams()
                }
                Err(err) => {
                    log::warn!("{}-gram table unavailable: {}", order, err);
                    NGramTable::empty(order)
                }
            }
        });
        Self { tables }
    }

    /// Table of the given order (1..=5); out-of-range orders clamp.
    pub fn table(&self, order: usize) -> &NGramTable {
        &self.tables[order.clamp(1, 5) - 1]
    }

    /// Ranked completions of `prefix` given the sentence typed so far.
    pub fn get_suggestions(&self, prefix: &str, context: &str, max_results: usize) -> Suggestions {
        let prefix = prefix.trim().to_uppercase();
        let prev_words: Vec<String> = context.split_whitespace().map(str::to_uppercase).collect();
        let mut out = Suggestions::none();

        for order in (2..=5).rev() {
            let needed = order - 1;
            if prev_words.len() < needed {
                continue;
            }
            if order < 5 && out.len() >= max_results {
                break;
            }
            let key = &prev_words[prev_words.len() - needed..];
            let hits = filter_by_prefix(self.table(order).candidates(key), &prefix);
            out.absorb(NGramLevel::for_order(order), || key.join(" "), hits, max_results);
        }

        let unigrams = self.table(1).candidates(&[]);
        if out.len() < max_results {
            let hits = filter_by_prefix(unigrams, &prefix);
            let key = || {
                if prefix.is_empty() {
                    "—".to_string()
                } else {
                    prefix.clone()
                }
            };
            out.absorb(NGramLevel::Uni, key, hits, max_results);
        }

        if out.is_empty() && !unigrams.is_empty() {
            out.candidates = unigrams.iter().take(max_results).cloned().collect();
            out.level = NGramLevel::Uni;
            out.context_key = "—".to_string();
        }

        out.candidates.truncate(max_results);
        out
    }
}

/// Words starting with `prefix`, order preserved. An empty prefix matches all.
pub fn filter_by_prefix<'a>(
    words: &'a [String],
    prefix: &'a str,
) -> impl Iterator<Item = &'a String> + 'a {
    words.iter().filter(move |word| word.starts_with(prefix))
}

/// Append the words of `secondary` missing from `primary`, first-seen order wins.
pub fn merge_dedup(mut primary: Vec<String>, secondary: &[String]) -> Vec<String> {
    merge_into(&mut primary, secondary, usize::MAX);
    primary
}

/// Merge until `target` holds `cap` words; returns how many were added.
fn merge_into<'a, I>(target: &mut Vec<String>, extra: I, cap: usize) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    let mut added = 0;
    for word in extra {
        if target.len() >= cap {
            break;
        }
        if !target.contains(word) {
            target.push(word.clone());
            added += 1;
        }
    }
    added
}
