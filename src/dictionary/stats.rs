use super::Dictionary;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// Size breakdown of a dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DictionaryStats {
    /// Automaton cells, free ones included
    pub automaton_cells: usize,
    /// Occupied states
    pub states: usize,
    /// States where a needle may end
    pub terminal_states: usize,
    /// Tail cells, reserved cell included
    pub tail_cells: usize,
    pub tail_runs: usize,
    pub tail_characters: usize,
    /// Records carrying a payload
    pub user_data_records: usize,
    pub user_data_bytes: usize,
    /// Serialized size in bytes
    pub file_size: u64,
}

impl Dictionary {
    pub fn stats(&self) -> DictionaryStats {
        let automaton = self.automaton();
        let tail = self.tail();
        let user_data = self.user_data();

        let file_size = 4
            + automaton.len() * 16
            + 4
            + tail.iter().map(|run| 4 + run.len() * 4).sum::<usize>()
            + user_data.iter().map(|record| 4 + record.len()).sum::<usize>();

        DictionaryStats {
            automaton_cells: automaton.len(),
            states: automaton.states(),
            terminal_states: automaton.candidates(),
            tail_cells: tail.len(),
            tail_runs: tail.runs(),
            tail_characters: tail.characters(),
            user_data_records: user_data.present(),
            user_data_bytes: user_data.bytes(),
            file_size: file_size as u64,
        }
    }
}

impl DictionaryStats {
    /// Share of automaton cells holding a state
    pub fn fill_ratio(&self) -> f64 {
        if self.automaton_cells == 0 {
            0.0
        } else {
            self.states as f64 / self.automaton_cells as f64
        }
    }

    pub fn print(&self) {
        println!("Dictionary Statistics");
        println!("=====================");
        println!();
        println!("Automaton cells:  {}", self.automaton_cells);
        println!("States:           {} ({:.1}% filled)", self.states, self.fill_ratio() * 100.0);
        println!("Terminal states:  {}", self.terminal_states);
        println!();
        println!("Tail cells:       {}", self.tail_cells);
        println!("Tail runs:        {}", self.tail_runs);
        println!("Tail characters:  {}", self.tail_characters);
        println!();
        println!("User data:        {} records, {}", self.user_data_records, format_size(self.user_data_bytes as u64));
        println!("File size:        {}", format_size(self.file_size));
    }
}

/// Load a dictionary and print its statistics
pub fn show_stats(path: &Path, json: bool) -> Result<()> {
    let dictionary = Dictionary::load(path)?;
    let stats = dictionary.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Dictionary:       {}", path.display());
        println!();
        stats.print();
    }

    Ok(())
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::Traversal;
    use crate::dat::{Trie, TrieOptions};

    #[test]
    fn test_stats_match_serialized_size() {
        let mut trie = Trie::new(TrieOptions::default());
        trie.insert_with_data("alpha", b"1").unwrap();
        trie.insert_with_data("alpine", b"22").unwrap();
        trie.insert("beta").unwrap();
        let dict = trie.freeze(Traversal::Bfs);

        let stats = dict.stats();
        assert_eq!(stats.file_size as usize, dict.to_bytes().unwrap().len());
        assert_eq!(stats.terminal_states, 3);
        assert_eq!(stats.user_data_records, 2);
        assert_eq!(stats.user_data_bytes, 3);
        assert!(stats.fill_ratio() > 0.0 && stats.fill_ratio() <= 1.0);
    }

    #[test]
    fn test_stats_json() {
        let stats = DictionaryStats {
            states: 7,
            ..DictionaryStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["states"], 7);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
