#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Anything that parses must load and survive a text round trip.
    if let Ok(defs) = nx_select::BinDefinitions::parse(text) {
        let _ = nx_select::BinClassifier::load(&defs);
        let again = nx_select::BinDefinitions::parse(&defs.to_text());
        assert!(again.is_ok());
    }
});
