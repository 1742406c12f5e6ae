//! Multi-keyword line matcher.
//!
//! # Strategy Selection
//!
//! One matcher type, two strategies picked once at construction; callers
//! depend only on [`KeywordMatcher::matches`].
//!
//! - **Empty keyword set**: matches everything.
//! - **Fewer than [`AUTOMATON_THRESHOLD`] keywords**: per-keyword substring
//!   scan with precompiled [`memchr::memmem::Finder`]s. For one to three
//!   needles the SIMD-accelerated scan beats automaton state chasing.
//! - **At or above the threshold**: a dense Aho–Corasick automaton scans the
//!   line once regardless of keyword count.
//!
//! Matching is case-sensitive, byte-exact, and unanchored (substring
//! semantics). The matcher is immutable after construction and shared with
//! the sink thread without synchronization.
//!
//! # Automaton Layout
//!
//! Each state holds a full 256-entry transition row plus a match flag; after
//! construction every `(state, byte)` pair transitions somewhere, so the scan
//! loop is two array indexes per input byte with no failure-link chasing at
//! match time. Failure links exist only during the breadth-first build, where
//! each state's match flag is OR'd with its failure target's so a visited
//! state reports a hit even when the matching keyword is a suffix of the
//! current path (e.g. "error" visiting the "err" accept state).

use std::collections::VecDeque;

use memchr::memmem;

/// Keyword-set size at which the matcher switches from per-keyword substring
/// scans to the Aho–Corasick automaton.
pub const AUTOMATON_THRESHOLD: usize = 4;

/// Line filter over a fixed keyword set.
pub enum KeywordMatcher {
    /// No keywords configured: every line matches.
    MatchAll,
    /// Small set: first-hit-wins substring scan per keyword.
    Scan(Vec<memmem::Finder<'static>>),
    /// Large set: single-pass automaton over all keywords.
    Automaton(AcAutomaton),
}

impl KeywordMatcher {
    /// Builds a matcher, picking the strategy from the keyword count.
    pub fn new(keywords: &[String]) -> Self {
        if keywords.is_empty() {
            return Self::MatchAll;
        }
        if keywords.len() < AUTOMATON_THRESHOLD {
            let finders = keywords
                .iter()
                .map(|kw| memmem::Finder::new(kw.as_bytes()).into_owned())
                .collect();
            return Self::Scan(finders);
        }
        Self::Automaton(AcAutomaton::build(keywords.iter().map(String::as_bytes)))
    }

    /// True if the line contains any configured keyword (or none are
    /// configured).
    #[inline]
    pub fn matches(&self, line: &[u8]) -> bool {
        match self {
            Self::MatchAll => true,
            Self::Scan(finders) => finders.iter().any(|f| f.find(line).is_some()),
            Self::Automaton(ac) => ac.matches(line),
        }
    }

    /// Strategy name for diagnostics.
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::MatchAll => "match-all",
            Self::Scan(_) => "substring-scan",
            Self::Automaton(_) => "aho-corasick",
        }
    }
}

/// Dense-transition Aho–Corasick automaton over a keyword set.
///
/// Built once; read-only thereafter. State 0 is the root. Memory is
/// `states × 256 × 4` bytes for the transition table — keyword sets here are
/// tens of bytes of patterns, so the table stays well inside cache.
pub struct AcAutomaton {
    /// `trans[state][byte]` = next state. Total function after construction.
    trans: Vec<[u32; 256]>,
    /// `output[state]` = some keyword ends at (or via failure chain of) this
    /// state.
    output: Vec<bool>,
}

/// Sentinel for "no trie edge" during construction. Replaced by real targets
/// before `build` returns.
const UNSET: u32 = u32::MAX;

impl AcAutomaton {
    /// Builds the automaton: trie insertion, then breadth-first failure-link
    /// propagation that also completes the transition table and folds match
    /// flags down the failure chains.
    pub fn build<'a>(keywords: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut trans: Vec<[u32; 256]> = vec![[UNSET; 256]];
        let mut output: Vec<bool> = vec![false];

        // Phase 1: trie of all keywords.
        for keyword in keywords {
            let mut state = 0usize;
            for &byte in keyword {
                let next = trans[state][byte as usize];
                state = if next == UNSET {
                    let id = trans.len() as u32;
                    assert!(id != UNSET, "automaton state count overflow");
                    trans.push([UNSET; 256]);
                    output.push(false);
                    trans[state][byte as usize] = id;
                    id as usize
                } else {
                    next as usize
                };
            }
            // An empty keyword marks the root: every line matches.
            output[state] = true;
        }

        // Phase 2: breadth-first failure links. Root's missing edges loop back
        // to the root; depth-1 states fail to the root.
        let mut fail: Vec<u32> = vec![0; trans.len()];
        let mut queue: VecDeque<u32> = VecDeque::new();

        for byte in 0..256 {
            let child = trans[0][byte];
            if child == UNSET {
                trans[0][byte] = 0;
            } else {
                fail[child as usize] = 0;
                queue.push_back(child);
            }
        }

        while let Some(state) = queue.pop_front() {
            let s = state as usize;
            let f = fail[s] as usize;
            for byte in 0..256 {
                let child = trans[s][byte];
                if child == UNSET {
                    // Missing edge: borrow the failure target's transition,
                    // making the goto function total.
                    trans[s][byte] = trans[f][byte];
                } else {
                    let c = child as usize;
                    fail[c] = trans[f][byte];
                    output[c] = output[c] || output[fail[c] as usize];
                    queue.push_back(child);
                }
            }
        }

        Self { trans, output }
    }

    /// Single-pass scan; true as soon as any visited state accepts.
    #[inline]
    pub fn matches(&self, line: &[u8]) -> bool {
        if self.output[0] {
            return true;
        }
        let mut state = 0usize;
        for &byte in line {
            state = self.trans[state][byte as usize] as usize;
            if self.output[state] {
                return true;
            }
        }
        false
    }

    /// Number of states, including the root.
    pub fn state_count(&self) -> usize {
        self.trans.len()
    }
}
