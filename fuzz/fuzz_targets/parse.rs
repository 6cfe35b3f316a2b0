#![no_main]

use libfuzzer_sys::fuzz_target;
use yamlcore::{EventData, Parser, Reader};

fuzz_target!(|data: &[u8]| fuzz_target(data));

fn fuzz_target(data: &[u8]) {
    let mut parser = Parser::new(Reader::from_slice(data));
    while let Ok(event) = parser.parse() {
        let is_end = matches!(event.data, EventData::StreamEnd);
        if is_end {
            break;
        }
    }
}
