#![no_main]

use acdat::automaton::SearchMode;
use acdat::dictionary::Dictionary;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Damaged files must be rejected or searched without panicking
    if let Ok(dictionary) = Dictionary::read_from(data) {
        let _ = dictionary.search("abcabc", SearchMode(SearchMode::NEEDLE | SearchMode::USER_DATA));
        let _ = dictionary.stats();
    }
});
