//! Building a dictionary from a word list.
//!
//! One needle per line. A TAB splits the line into needle and payload; the payload
//! bytes become the needle's user data. Lines are decoded in parallel, then
//! inserted in file order, since the trie itself is single-threaded.

use super::Dictionary;
use crate::automaton::Traversal;
use crate::dat::{DatError, Needle, Trie, TrieOptions};
use crate::utils::{ProgressBar, line_bar};
use ahash::AHashSet;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};

/// A line that could not be turned into a needle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number
    pub line: usize,
    pub reason: DatError,
}

/// Outcome of a build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Non-blank lines read
    pub lines: usize,
    /// Distinct needles in the dictionary
    pub needles: usize,
    /// Lines repeating an earlier needle (their payload replaced the earlier one)
    pub duplicates: usize,
    #[serde(skip)]
    pub skipped: Vec<SkippedLine>,
    /// Occupied trie cells before freezing
    pub trie_cells: usize,
    /// Tail runs before freezing
    pub tail_runs: usize,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn print(&self) {
        println!("Lines:            {}", self.lines);
        println!("Needles:          {}", self.needles);
        println!("Duplicates:       {}", self.duplicates);
        println!("Skipped:          {}", self.skipped.len());
        println!("Trie cells:       {}", self.trie_cells);
        println!("Tail runs:        {}", self.tail_runs);
        println!("Elapsed:          {:.2?}", self.elapsed);
    }
}

struct ParsedLine<'a> {
    line: usize,
    needle_bytes: &'a [u8],
    needle: Result<Needle, DatError>,
    payload: &'a [u8],
}

/// Split into non-blank `(line number, content)` pairs, dropping `\r` before `\n`
fn split_lines(content: &[u8]) -> Vec<(usize, &[u8])> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut number = 0;

    let ends = memchr::memchr_iter(b'\n', content).chain(std::iter::once(content.len()));
    for end in ends {
        if start > content.len() {
            break;
        }
        number += 1;
        let mut line = &content[start..end];
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }
        if !line.is_empty() {
            lines.push((number, line));
        }
        start = end + 1;
    }

    lines
}

fn parse_line(line: usize, content: &[u8]) -> ParsedLine<'_> {
    let (needle_bytes, payload) = match memchr::memchr(b'\t', content) {
        Some(tab) => (&content[..tab], &content[tab + 1..]),
        None => (content, &[][..]),
    };
    ParsedLine {
        line,
        needle_bytes,
        needle: Needle::from_utf8(needle_bytes),
        payload,
    }
}

/// Build from an in-memory word list
pub fn build_from_bytes(
    content: &[u8],
    options: &TrieOptions,
    traversal: Traversal,
    progress: Option<&ProgressBar>,
) -> (Dictionary, BuildReport) {
    let started = Instant::now();
    let lines = split_lines(content);

    let parsed: Vec<ParsedLine> = lines
        .par_iter()
        .map(|&(line, content)| parse_line(line, content))
        .collect();

    if let Some(pb) = progress {
        pb.set_length(parsed.len() as u64);
    }

    let mut trie = Trie::new(options.clone());
    let mut seen: AHashSet<&[u8]> = AHashSet::with_capacity(parsed.len());
    let mut report = BuildReport {
        lines: parsed.len(),
        ..BuildReport::default()
    };

    for (i, entry) in parsed.into_iter().enumerate() {
        match entry.needle {
            Ok(needle) => {
                if !seen.insert(entry.needle_bytes) {
                    report.duplicates += 1;
                }
                trie.add_needle(&needle, entry.payload.to_vec());
            }
            Err(reason) => report.skipped.push(SkippedLine {
                line: entry.line,
                reason,
            }),
        }

        if let Some(pb) = progress
            && i % 1024 == 1023
        {
            pb.inc(1024);
        }
    }

    report.needles = trie.needles();
    report.trie_cells = trie.occupied();
    report.tail_runs = trie.tail_runs();

    if let Some(pb) = progress {
        pb.set_message("Freezing automaton...");
    }
    let dictionary = trie.freeze(traversal);
    report.elapsed = started.elapsed();

    (dictionary, report)
}

/// Build from a word-list file, showing progress unless `silent`
pub fn build_from_word_list(
    path: &Path,
    options: &TrieOptions,
    traversal: Traversal,
    silent: bool,
) -> Result<(Dictionary, BuildReport)> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read word list {}", path.display()))?;

    let progress = if silent { None } else { Some(line_bar("Inserting needles...")?) };

    let (dictionary, report) = build_from_bytes(&content, options, traversal, progress.as_ref());

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    for skipped in &report.skipped {
        eprintln!(
            "acdat: {}:{}: skipped: {}",
            path.display(),
            skipped.line,
            skipped.reason
        );
    }

    Ok((dictionary, report))
}
