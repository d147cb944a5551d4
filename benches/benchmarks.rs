//! Performance benchmarks for acdat
//!
//! Run with: cargo bench

use acdat::automaton::{SearchMode, Traversal};
use acdat::dat::{Trie, TrieOptions};
use acdat::dictionary::{Dictionary, build_from_bytes};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// Deterministic word list: `count` words over a 6-letter alphabet
fn word_list(count: usize) -> Vec<String> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..count)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let len = 3 + (state % 10) as usize;
            (0..len)
                .map(|i| (b'a' + ((state >> (i * 3)) % 6) as u8) as char)
                .collect()
        })
        .collect()
}

fn build_dictionary(words: &[String], use_tail: bool) -> Dictionary {
    let mut trie = Trie::new(TrieOptions {
        use_tail,
        ..TrieOptions::default()
    });
    for word in words {
        trie.insert(word).expect("Failed to insert word");
    }
    trie.freeze(Traversal::Bfs)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for count in [1_000, 10_000] {
        let words = word_list(count);
        for use_tail in [true, false] {
            let id = format!("{}_{}", count, if use_tail { "tail" } else { "plain" });
            group.bench_with_input(BenchmarkId::from_parameter(id), &words, |b, words| {
                b.iter(|| build_dictionary(black_box(words), use_tail))
            });
        }
    }
    group.finish();
}

fn bench_word_list(c: &mut Criterion) {
    let content = word_list(10_000)
        .iter()
        .enumerate()
        .map(|(i, w)| format!("{}\t{}\n", w, i))
        .collect::<String>();

    c.bench_function("word_list_10k", |b| {
        b.iter(|| {
            build_from_bytes(
                black_box(content.as_bytes()),
                &TrieOptions::default(),
                Traversal::Bfs,
                None,
            )
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let words = word_list(10_000);
    let dictionary = build_dictionary(&words, true);
    let text: String = word_list(2_000).join(" ");

    let mut group = c.benchmark_group("search");
    for (name, bits) in [
        ("all", SearchMode::ALL),
        ("first", SearchMode::FIRST),
        ("needle_user_data", SearchMode::NEEDLE | SearchMode::USER_DATA),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| dictionary.search(black_box(&text), SearchMode(bits)))
        });
    }
    group.bench_function("exact", |b| {
        b.iter(|| dictionary.search(black_box(&words[42]), SearchMode(SearchMode::EXACT)))
    });
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let dictionary = build_dictionary(&word_list(10_000), true);
    let bytes = dictionary.to_bytes().expect("Failed to serialize");

    c.bench_function("load_10k", |b| {
        b.iter(|| Dictionary::read_from(black_box(&bytes)))
    });
}

criterion_group!(benches, bench_build, bench_word_list, bench_search, bench_load);

criterion_main!(benches);
