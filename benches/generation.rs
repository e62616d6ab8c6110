use criterion::{Criterion, black_box, criterion_group, criterion_main};
use polygen::{Context, Document};

const GRAMMAR: &str = r#"
    S ::= (Ogg.M | Ogg.F).S mangia Ogg.(M|F).P | sei un,una bel,bella ragazz ^ o,a ;

    Ogg ::= M: ((Art Sost).il | (Art Sost).lo)
         |  F: Art Sost ;

    Art ::= M: (il: (S: il | P: i) | lo: (S: lo | P: gli))
         |  F: (S: la | P: le) ;

    Sost ::= M: ( il: (lup ^ Decl.2 | can ^ Decl.3)
                | lo: (gnom ^ Decl.2 | zabaion ^ Decl.3))
          |  F: pecor ^ Decl.1 ;

    Decl ::= 1: (S: a | P: e) | 2: (S: o | P: i) | 3: (S: e | P: i) ;
"#;

fn bench_generation(c: &mut Criterion) {
    let document = Document::parse(GRAMMAR, "S").unwrap();

    c.bench_function("parse", |b| {
        b.iter(|| Document::parse(black_box(GRAMMAR), "S").unwrap())
    });

    c.bench_function("generate", |b| {
        let mut seed = 0u64;
        b.iter(|| {
            seed += 1;
            let mut context = Context::with_seed(seed);
            document.generate(black_box(&mut context)).unwrap()
        })
    });
}

criterion_group!(benches, bench_generation);
criterion_main!(benches);
