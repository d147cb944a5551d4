use std::cmp::Reverse;

use super::Automaton;
use crate::dat::{Character, END_OF_TEXT, ROOT, Tail, TrieIndex, UserDataList};
use crate::utils::utf8;

/// Bit set selecting what a search reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SearchMode(pub u8);

impl SearchMode {
    pub const ALL: u8 = 0;
    /// Stop at the first occurrence
    pub const FIRST: u8 = 1 << 0;
    /// Only a needle spanning the whole query counts
    pub const EXACT: u8 = 1 << 1;
    /// Rebuild the matched needle text
    pub const NEEDLE: u8 = 1 << 2;
    /// Attach the needle's payload
    pub const USER_DATA: u8 = 1 << 3;

    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub fn is_first(&self) -> bool {
        self.0 & Self::FIRST != 0
    }

    pub fn is_exact(&self) -> bool {
        self.0 & Self::EXACT != 0
    }

    pub fn wants_needle(&self) -> bool {
        self.0 & Self::NEEDLE != 0
    }

    pub fn wants_user_data(&self) -> bool {
        self.0 & Self::USER_DATA != 0
    }
}

impl std::ops::BitOr<u8> for SearchMode {
    type Output = SearchMode;

    fn bitor(self, rhs: u8) -> SearchMode {
        SearchMode(self.0 | rhs)
    }
}

/// One reported match
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occurrence<'a> {
    /// Character offset of the first matched character
    pub start: usize,
    /// Character offset one past the last matched character
    pub end: usize,
    /// State holding the needle's payload
    pub state: TrieIndex,
    /// Payload, when requested and present
    pub user_data: Option<&'a [u8]>,
    /// Matched needle as UTF-8, when requested
    pub needle: Option<String>,
}

impl Occurrence<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Hit {
    start: usize,
    end: usize,
    terminal: TrieIndex,
}

impl Hit {
    /// Earlier end first, longer match first at equal ends
    fn order(&self) -> (usize, Reverse<usize>) {
        (self.end, Reverse(self.end - self.start))
    }
}

struct Searcher<'a> {
    automaton: &'a Automaton,
    tail: &'a Tail,
    user_data: Option<&'a UserDataList>,
}

impl<'a> Searcher<'a> {
    /// If a needle ending at candidate `state` matches with its last trie
    /// character at `position`, return the payload state and match end
    fn verify(&self, state: TrieIndex, query: &[Character], position: usize) -> Option<(TrieIndex, usize)> {
        match self.automaton.tail_index(state) {
            Some(index) => {
                let run = self.tail.get(index)?;
                query[position + 1..]
                    .starts_with(run)
                    .then_some((state, position + 1 + run.len()))
            }
            None => self
                .automaton
                .child(state, END_OF_TEXT)
                .map(|eot| (eot, position + 1)),
        }
    }

    fn hit(&self, state: TrieIndex, query: &[Character], position: usize) -> Option<Hit> {
        let (terminal, end) = self.verify(state, query, position)?;
        let depth = self.automaton.depth(state);
        Some(Hit {
            start: (position + 1).saturating_sub(depth),
            end,
            terminal,
        })
    }

    /// Every hit over the query, unordered; stops early in FIRST mode
    fn scan(&self, query: &[Character], first: bool) -> Vec<Hit> {
        let mut hits = Vec::new();
        let mut best: Option<Hit> = None;
        let mut state = ROOT;

        for (i, &c) in query.iter().enumerate() {
            if c == END_OF_TEXT || c == 0 {
                state = ROOT;
                continue;
            }
            state = self.automaton.step(state, c);

            let mut candidate = if self.automaton.is_candidate(state) {
                state
            } else {
                self.automaton.output(state)
            };
            // Output links only lead to shallower states; the bound guards damaged files
            let mut budget = self.automaton.len();
            while candidate > 0 && budget > 0 {
                budget -= 1;
                if let Some(hit) = self.hit(candidate, query, i) {
                    if first {
                        if best.is_none_or(|b| hit.order() < b.order()) {
                            best = Some(hit);
                        }
                    } else {
                        hits.push(hit);
                    }
                }
                candidate = self.automaton.output(candidate);
            }

            // Hits found later end at i + 2 or beyond
            if let Some(b) = best
                && b.end <= i + 1
            {
                break;
            }
        }

        if first {
            return best.into_iter().collect();
        }
        hits.sort_by_key(Hit::order);
        hits
    }

    /// Goto-only walk: the query itself must be a needle
    fn exact(&self, query: &[Character]) -> Option<Hit> {
        let mut state = ROOT;
        for (i, &c) in query.iter().enumerate() {
            state = self.automaton.child(state, c)?;
            if let Some(index) = self.automaton.tail_index(state) {
                let run = self.tail.get(index)?;
                return (&query[i + 1..] == run).then_some(Hit {
                    start: 0,
                    end: query.len(),
                    terminal: state,
                });
            }
        }
        if query.is_empty() {
            return None;
        }
        self.automaton.child(state, END_OF_TEXT).map(|eot| Hit {
            start: 0,
            end: query.len(),
            terminal: eot,
        })
    }

    fn needle(&self, terminal: TrieIndex) -> String {
        let mut chars = self.automaton.path(terminal);
        if let Some(run) = self
            .automaton
            .tail_index(terminal)
            .and_then(|index| self.tail.get(index))
        {
            chars.extend_from_slice(run);
        }
        utf8::encode(&chars)
    }

    fn occurrence(&self, hit: Hit, mode: SearchMode) -> Occurrence<'a> {
        Occurrence {
            start: hit.start,
            end: hit.end,
            state: hit.terminal,
            user_data: if mode.wants_user_data() {
                self.user_data.and_then(|list| list.get(hit.terminal))
            } else {
                None
            },
            needle: mode.wants_needle().then(|| self.needle(hit.terminal)),
        }
    }
}

/// Find the needles occurring in `query`.
///
/// Occurrences are ordered by end offset, longer first when two end together.
/// `EXACT` reports only a needle equal to the whole query; `FIRST` keeps only
/// the first occurrence of that order.
pub fn search<'a>(
    automaton: &'a Automaton,
    tail: &'a Tail,
    user_data: Option<&'a UserDataList>,
    query: &[Character],
    mode: SearchMode,
) -> Vec<Occurrence<'a>> {
    let searcher = Searcher {
        automaton,
        tail,
        user_data,
    };

    let hits = if mode.is_exact() {
        searcher.exact(query).into_iter().collect()
    } else {
        searcher.scan(query, mode.is_first())
    };

    hits.into_iter()
        .map(|hit| searcher.occurrence(hit, mode))
        .collect()
}
