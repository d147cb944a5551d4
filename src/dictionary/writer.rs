//! Binary dictionary writer.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! automaton_size: i32
//! automaton_size x (base: i32, check: i32, fail: i32, output: i32)
//! tail_size: i32
//! for tail index 1..tail_size: length: u32, length x character: i32
//! automaton_size x (user_data_size: i32, user_data_size x u8)
//! ```

use super::Dictionary;
use crate::utils::{write_i32_le, write_u32_le};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn length(len: usize) -> io::Result<i32> {
    i32::try_from(len).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds i32"))
}

impl Dictionary {
    /// Serialize into `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let cells = self.automaton().cells();
        write_i32_le(writer, length(cells.len())?)?;
        for cell in cells {
            write_i32_le(writer, cell.base)?;
            write_i32_le(writer, cell.check)?;
            write_i32_le(writer, cell.fail)?;
            write_i32_le(writer, cell.output)?;
        }

        write_i32_le(writer, length(self.tail().len())?)?;
        for run in self.tail().iter() {
            write_u32_le(writer, length(run.len())? as u32)?;
            for &c in run {
                write_i32_le(writer, c)?;
            }
        }

        for index in 0..cells.len() {
            let record = self.user_data().record(index);
            write_i32_le(writer, length(record.len())?)?;
            writer.write_all(record)?;
        }

        Ok(())
    }

    /// Serialize into a byte vector
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Write the dictionary to `path`
    pub fn store(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }
}
