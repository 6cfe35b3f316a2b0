#![no_main]

use libfuzzer_sys::fuzz_target;
use yamlcore::{Reader, Scanner};

fuzz_target!(|data: &[u8]| fuzz_target(data));

fn fuzz_target(data: &[u8]) {
    let mut scanner = Scanner::new(Reader::from_slice(data));
    while let Ok(token) = scanner.scan() {
        let is_end = matches!(token.data, yamlcore::TokenData::StreamEnd);
        if is_end {
            break;
        }
    }
}
