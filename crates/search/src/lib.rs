//! Shopfront search: approximate title matching for the listing pipeline.
//!
//! Scores come from the skim V2 fuzzy matcher and are normalized against the
//! term's score on itself, so a result's *looseness* lives on a 0 (exact) to
//! 1 (unrelated) scale and one threshold works for short and long terms alike.
//! Typos are caught by a second score: the normalized Levenshtein distance
//! between the term and the closest title window of about the term's length.
//! A title's looseness is the better of the two.

#![forbid(unsafe_code)]

use std::time::Instant;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::trace;

/// Looseness cut-off used when nothing else is configured.
pub const DEFAULT_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Copy)]
pub struct SearchOpts {
    /// Results looser than this are dropped. Clamped to 0..=1.
    pub threshold: f32,
}

impl Default for SearchOpts {
    fn default() -> Self { Self { threshold: DEFAULT_THRESHOLD } }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit { pub doc: usize, pub looseness: f32 }

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SearchDebugInfo {
    pub total: usize,
    pub matched: usize,
}

/// A compiled search term.
pub struct TitleSearch {
    matcher: SkimMatcherV2,
    needle: String,
    needle_len: usize,
    best: i64,
    threshold: f32,
}

impl TitleSearch {
    /// `None` for blank terms: the search stage is skipped entirely.
    pub fn new(term: &str, opts: SearchOpts) -> Option<Self> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() { return None; }
        let matcher = SkimMatcherV2::default();
        let best = matcher.fuzzy_match(&needle, &needle).unwrap_or(1).max(1);
        let needle_len = needle.chars().count();
        Some(Self { matcher, needle, needle_len, best, threshold: opts.threshold.clamp(0.0, 1.0) })
    }

    pub fn term(&self) -> &str { &self.needle }

    /// 0.0 for a match as good as the term against itself, `None` for an empty title.
    pub fn looseness(&self, title: &str) -> Option<f32> {
        let hay = title.to_lowercase();
        let subsequence = self
            .matcher
            .fuzzy_match(&hay, &self.needle)
            .map(|score| 1.0 - (score as f32 / self.best as f32).clamp(0.0, 1.0));
        match (subsequence, self.edit_looseness(&hay)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // Windows one char shorter, equal and one longer cover a single deletion or insertion.
    fn edit_looseness(&self, hay: &str) -> Option<f32> {
        let chars: Vec<char> = hay.chars().collect();
        if chars.is_empty() { return None; }
        let mut best = 0.0f64;
        for width in self.needle_len.saturating_sub(1).max(1)..=self.needle_len + 1 {
            let width = width.min(chars.len());
            for start in 0..=chars.len() - width {
                let window: String = chars[start..start + width].iter().collect();
                best = best.max(strsim::normalized_levenshtein(&window, &self.needle));
                if best >= 1.0 { return Some(0.0); }
            }
        }
        Some(1.0 - best as f32)
    }

    /// Hits within the threshold, best first; equal looseness keeps input order.
    pub fn hits<'a, I>(&self, titles: I) -> (Vec<Hit>, SearchDebugInfo)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let started = Instant::now();
        let mut total = 0usize;
        let mut hits: Vec<Hit> = Vec::new();
        for (doc, title) in titles.into_iter().enumerate() {
            total += 1;
            if let Some(looseness) = self.looseness(title) {
                trace!(doc, looseness, "title scored");
                if looseness <= self.threshold { hits.push(Hit { doc, looseness }); }
            }
        }
        hits.sort_by(|a, b| a.looseness.total_cmp(&b.looseness));
        metrics::histogram!("search_candidates", total as f64);
        metrics::histogram!("search_eval_ms", started.elapsed().as_secs_f64() * 1_000.0);
        let dbg = SearchDebugInfo { total, matched: hits.len() };
        (hits, dbg)
    }
}

/// Keep and re-rank `items` by title match. A blank term returns them untouched.
pub fn rank_by_title<T, F>(items: Vec<T>, term: &str, opts: SearchOpts, title: F) -> (Vec<T>, SearchDebugInfo)
where
    F: Fn(&T) -> &str,
{
    let Some(search) = TitleSearch::new(term, opts) else {
        let n = items.len();
        return (items, SearchDebugInfo { total: n, matched: n });
    };
    let (hits, dbg) = search.hits(items.iter().map(|t| title(t)));
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let ranked = hits.iter().filter_map(|h| slots.get_mut(h.doc).and_then(Option::take)).collect();
    (ranked, dbg)
}
