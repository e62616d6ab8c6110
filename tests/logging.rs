use log::{Level, LevelFilter, Log, Metadata, Record};
use polygen::{Context, Document};
use std::sync::Mutex;

/// Keeps every record emitted by the library
struct Recorder {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for Recorder {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if record.target().starts_with("polygen") {
            let mut records = self.records.lock().unwrap();
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static RECORDER: Recorder = Recorder {
    records: Mutex::new(Vec::new()),
};

#[test]
fn test_exhausted_selection_stays_below_the_default_cli_level() {
    log::set_logger(&RECORDER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let document = Document::parse(
        "S ::= A.a;
         A ::= a: a B and. C;
         B ::= a: b | c: nope;
         C ::= g: c;",
        "S",
    )
    .unwrap();
    for seed in 0..5 {
        let text = document.generate(&mut Context::with_seed(seed)).unwrap();
        assert_eq!(text, "a b and");
    }

    let records = RECORDER.records.lock().unwrap();
    let exhausted: Vec<&(Level, String)> = records
        .iter()
        .filter(|(_, message)| message.contains("every alternative excluded"))
        .collect();
    assert_eq!(exhausted.len(), 5);
    assert!(exhausted.iter().all(|(level, _)| *level == Level::Debug));
    assert!(records.iter().all(|(level, _)| *level > Level::Warn));
}
