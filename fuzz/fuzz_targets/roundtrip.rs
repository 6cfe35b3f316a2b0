#![no_main]

use libfuzzer_sys::fuzz_target;
use yamlcore::{Encoding, EventData, Parser, Presenter, PresenterConfig, Reader, Writer};

fuzz_target!(|data: &[u8]| fuzz_target(data));

fn fuzz_target(data: &[u8]) {
    let mut parser = Parser::new(Reader::from_slice(data));
    let mut events = Vec::new();
    loop {
        match parser.parse() {
            Ok(event) => {
                let done = matches!(event.data, EventData::StreamEnd);
                events.push(event);
                if done {
                    break;
                }
            }
            Err(_) => return,
        }
    }

    let mut out = Vec::new();
    let writer = Writer::new(&mut out, Encoding::Utf8);
    let mut presenter = Presenter::new(writer, PresenterConfig::default(), parser.tag_registry());
    for event in events {
        if presenter.emit(event).is_err() {
            return;
        }
    }
}
