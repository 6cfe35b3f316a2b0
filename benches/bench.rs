use criterion::{criterion_group, criterion_main, Criterion};
use yamlcore::{Encoding, Event, EventData, Parser, Presenter, PresenterConfig, Reader, TagRegistry, Writer};

fn synthetic_document(entries: usize) -> String {
    let mut out = String::from("---\n");
    for i in 0..entries {
        out.push_str(&format!("item{i}:\n  name: entry-{i}\n  value: {i}\n  tags: [a, b, c]\n"));
    }
    out
}

pub fn parser(c: &mut Criterion) {
    let input = synthetic_document(2000);

    c.bench_function("yamlcore parse large", |b| {
        b.iter(|| {
            let mut parser = Parser::new(Reader::from_slice(input.as_bytes()));
            loop {
                let event = parser.parse().unwrap();
                let done = matches!(event.data, EventData::StreamEnd);
                if done {
                    break;
                }
            }
        })
    });

    let events: Vec<Event> = {
        let mut parser = Parser::new(Reader::from_slice(input.as_bytes()));
        let mut events = Vec::new();
        loop {
            let event = parser.parse().unwrap();
            let done = matches!(event.data, EventData::StreamEnd);
            events.push(event);
            if done {
                break;
            }
        }
        events
    };

    c.bench_function("yamlcore present large", |b| {
        let registry = TagRegistry::new();
        b.iter(|| {
            let mut out = Vec::with_capacity(input.len());
            let writer = Writer::new(&mut out, Encoding::Utf8);
            let mut presenter = Presenter::new(writer, PresenterConfig::default(), &registry);
            for event in events.clone() {
                presenter.emit(event).unwrap();
            }
        })
    });
}

criterion_group!(benches, parser);
criterion_main!(benches);
