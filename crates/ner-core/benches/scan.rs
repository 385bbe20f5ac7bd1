use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ner_core::grammar::{compile, EntityRule};
use ner_core::scanner::{ScanThresholds, Scanner, Threshold};
use ner_core::{GrammarSource, NamedEntityRecognizer, NerOptions, SmaxDocument};

const GRAMMAR: &str = "\
PET <- PET\tpolyethylene terephthalate\tpolyester
HDPE <- HDPE\thigh-density polyethylene\tpolyethylene high-density
PVC <- PVC\tpolyvinyl chloride\tpolyvinylchloride\tvinyl\tpolyvinyl
LDPE <- LDPE\tlow-density polyethylene
PP <- PP\tpolypropylene
PS <- PS\tpolystyrene\tstyrofoam
";

const SENTENCE: &str = "Bottles are made of PET or polyethylene terephthalate, pipes of P.V.C. \
    and crates of high-density polyethylene, while cups are often polystyrene. ";

fn bench_scanner() -> Scanner {
    let rules: Vec<EntityRule> = (0..2_000)
        .map(|i| EntityRule::new(format!("E{i}"), format!("entity number {i}")))
        .chain(
            GRAMMAR
                .lines()
                .flat_map(|line| {
                    let (id, names) = line.split_once(" <- ").unwrap_or((line, ""));
                    names
                        .split('\t')
                        .map(move |name| EntityRule::new(id, name))
                        .collect::<Vec<_>>()
                }),
        )
        .collect();
    Scanner::new(Arc::new(compile(rules, "-")), "", "")
}

fn bench_scan(c: &mut Criterion) {
    let scanner = bench_scanner();
    let thresholds = [
        ("exact", ScanThresholds::default()),
        (
            "fuzzy",
            ScanThresholds {
                case_insensitive: Threshold::AtLeast(3),
                fuzzy: Threshold::AtLeast(3),
            },
        ),
    ];
    let mut group = c.benchmark_group("scan/text");
    for repeat in [1usize, 16, 256] {
        let text: Vec<char> = SENTENCE.repeat(repeat).chars().collect();
        for (label, th) in thresholds {
            group.bench_with_input(BenchmarkId::new(label, text.len()), &text, |b, text| {
                b.iter(|| scanner.matches(text, th).count());
            });
        }
    }
    group.finish();
}

fn bench_annotate(c: &mut Criterion) {
    let options = NerOptions::from_pairs([("word-chars", "-"), ("fuzzy-min-length", "3")])
        .unwrap_or_default();
    let Ok(ner) = NamedEntityRecognizer::compile(&GrammarSource::Text(GRAMMAR.into()), &options)
    else {
        return;
    };
    let xml = format!("<doc><p>{}</p></doc>", SENTENCE.repeat(64));
    c.bench_function("scan/document", |b| {
        b.iter(|| {
            let Ok(mut document) = SmaxDocument::from_xml(&xml) else {
                return 0;
            };
            ner.scan(&mut document).unwrap_or(0)
        });
    });
}

criterion_group!(benches, bench_scan, bench_annotate);
criterion_main!(benches);
