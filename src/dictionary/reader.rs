//! Binary dictionary reader (see [`super::writer`] for the layout).
//!
//! Files are memory-mapped and parsed in one pass. Every declared size is checked
//! against the bytes that remain before anything is allocated, and every link is
//! checked to stay inside the automaton, so a damaged file fails to load instead
//! of producing a dictionary that walks out of bounds.

use super::Dictionary;
use crate::automaton::{Automaton, AutomatonCell};
use crate::dat::{Character, ROOT, Tail, UserDataList};
use crate::utils::{read_i32_le, read_u32_le};
use anyhow::{Context, Result, bail, ensure};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

const CELL_BYTES: usize = 16;

/// Cursor over the mapped bytes
struct Input<'a> {
    bytes: &'a [u8],
}

impl<'a> Input<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len()
    }

    fn i32(&mut self, what: &str) -> Result<i32> {
        read_i32_le(&mut self.bytes).with_context(|| format!("Truncated {}", what))
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        read_u32_le(&mut self.bytes).with_context(|| format!("Truncated {}", what))
    }

    /// A non-negative size whose payload of `unit` bytes per item fits the input
    fn size(&mut self, what: &str, unit: usize) -> Result<usize> {
        let size = self.i32(what)?;
        ensure!(size >= 0, "Negative {}: {}", what, size);
        let size = size as usize;
        ensure!(
            size.saturating_mul(unit) <= self.remaining(),
            "{} of {} exceeds the {} remaining bytes",
            what,
            size,
            self.remaining()
        );
        Ok(size)
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        ensure!(len <= self.bytes.len(), "Truncated {}", what);
        let (head, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(head)
    }
}

impl Dictionary {
    /// Parse a serialized dictionary
    pub fn read_from(bytes: &[u8]) -> Result<Self> {
        let mut input = Input { bytes };

        let size = input.size("automaton size", CELL_BYTES)?;
        ensure!(size > ROOT as usize, "Automaton has no root state");

        let mut cells = Vec::with_capacity(size);
        for _ in 0..size {
            cells.push(AutomatonCell {
                base: input.i32("automaton cell")?,
                check: input.i32("automaton cell")?,
                fail: input.i32("automaton cell")?,
                output: input.i32("automaton cell")?,
            });
        }
        validate_cells(&cells)?;

        let tail_size = input.size("tail size", 4)?;
        let mut runs: Vec<Vec<Character>> = Vec::with_capacity(tail_size);
        if tail_size > 0 {
            runs.push(Vec::new());
        }
        for _ in 1..tail_size {
            let len = input.u32("tail length")? as usize;
            ensure!(
                len.saturating_mul(4) <= input.remaining(),
                "Tail run of {} characters exceeds the input",
                len
            );
            let mut run = Vec::with_capacity(len);
            for _ in 0..len {
                run.push(input.i32("tail character")?);
            }
            runs.push(run);
        }

        let mut records = Vec::with_capacity(size);
        for _ in 0..size {
            let len = input.size("user data size", 1)?;
            records.push(input.take(len, "user data")?.to_vec());
        }

        if input.remaining() != 0 {
            bail!("{} trailing bytes after the dictionary", input.remaining());
        }

        Ok(Dictionary::new(
            Automaton::from_cells(cells),
            Tail::from_cells(runs),
            UserDataList::from_records(records),
        ))
    }

    /// Map and parse a dictionary file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open dictionary {}", path.display()))?;
        let len = file.metadata()?.len();
        if len == 0 {
            bail!("Dictionary {} is empty", path.display());
        }

        let mmap = unsafe { Mmap::map(&file)? };
        Self::read_from(&mmap)
            .with_context(|| format!("Failed to read dictionary {}", path.display()))
    }
}

/// Links must stay inside the automaton
fn validate_cells(cells: &[AutomatonCell]) -> Result<()> {
    let size = cells.len() as i64;
    let in_range = |v: i32| (0..size).contains(&i64::from(v));

    let root = &cells[ROOT as usize];
    ensure!(root.check == 0, "Root state has parent {}", root.check);
    ensure!(root.base > 0, "Root state has base {}", root.base);

    for (index, cell) in cells.iter().enumerate() {
        ensure!(
            in_range(cell.check) && in_range(cell.fail) && in_range(cell.output),
            "State {} links outside the automaton",
            index
        );
        ensure!(
            cell.check == 0 || cell.check as usize != index,
            "State {} is its own parent",
            index
        );
    }

    Ok(())
}
