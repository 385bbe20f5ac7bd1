use std::ops::ControlFlow;
use std::sync::Arc;

use proptest::prelude::*;

use super::*;
use crate::grammar::{compile, parse_text_rules, LineSyntax};

fn scanner(grammar: &str, word_chars: &str) -> Scanner {
    scanner_with(grammar, word_chars, "", "")
}

fn scanner_with(grammar: &str, word_chars: &str, no_word_before: &str, no_word_after: &str) -> Scanner {
    let rules = parse_text_rules(grammar, &LineSyntax::default()).unwrap();
    Scanner::new(Arc::new(compile(rules, word_chars)), no_word_before, no_word_after)
}

fn thresholds(case_insensitive: i64, fuzzy: i64) -> ScanThresholds {
    ScanThresholds {
        case_insensitive: Threshold::from_min_length(case_insensitive).unwrap(),
        fuzzy: Threshold::from_min_length(fuzzy).unwrap(),
    }
}

/// `(matched text, tab-joined ids)` for every match.
fn found(scanner: &Scanner, text: &str, thresholds: ScanThresholds) -> Vec<(String, String)> {
    let chars: Vec<char> = text.chars().collect();
    scanner
        .matches(&chars, thresholds)
        .map(|span| (chars[span.start..span.end].iter().collect(), span.ids.join("\t")))
        .collect()
}

fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(t, ids)| (t.to_string(), ids.to_string()))
        .collect()
}

#[test]
fn test_threshold_from_min_length() {
    assert_eq!(Threshold::from_min_length(-1), Some(Threshold::Disabled));
    assert_eq!(Threshold::from_min_length(0), Some(Threshold::Always));
    assert_eq!(Threshold::from_min_length(4), Some(Threshold::AtLeast(4)));
    assert_eq!(Threshold::from_min_length(-2), None);
    assert!(!Threshold::Disabled.permits(100));
    assert!(Threshold::Always.permits(1));
    assert!(Threshold::AtLeast(3).permits(3));
    assert!(!Threshold::AtLeast(3).permits(2));
    assert_eq!(Threshold::AtLeast(7).min_length(), 7);
}

#[test]
fn test_longest_match() {
    let s = scanner("a <- a\nb <- b\nab <- a b\n", "");
    assert_eq!(
        found(&s, "a a b a b b", ScanThresholds::default()),
        pairs(&[("a", "a"), ("a b", "ab"), ("a b", "ab"), ("b", "b")])
    );
}

#[test]
fn test_events_cover_text() {
    let s = scanner("a <- a\nb <- b\nab <- a b\n", "");
    let chars: Vec<char> = "a a b a b b".chars().collect();
    let events: Vec<ScanEvent<'_>> = s.scan(&chars, ScanThresholds::default()).collect();
    let spans: Vec<(usize, usize, bool)> = events
        .iter()
        .map(|e| (e.start(), e.end(), matches!(e, ScanEvent::Match(_))))
        .collect();
    assert_eq!(
        spans,
        vec![
            (0, 1, true),
            (1, 2, false),
            (2, 5, true),
            (5, 6, false),
            (6, 9, true),
            (9, 10, false),
            (10, 11, true),
        ]
    );
}

#[test]
fn test_word_chars_in_names() {
    let syntax = LineSyntax::new(r"\s*<=\s*", r"\s*;\s*").unwrap();
    let rules = parse_text_rules("eg:1 <= e.g.\neg:2<=e g; eg\n", &syntax).unwrap();
    let s = Scanner::new(Arc::new(compile(rules, ".")), "", "");
    assert_eq!(
        found(&s, "e.g. e g eg", ScanThresholds::default()),
        pairs(&[("e.g.", "eg:1"), ("e g", "eg:2"), ("eg", "eg:2")])
    );
}

#[test]
fn test_fuzzy_prefers_noise_separator_over_skip() {
    let s = scanner(
        "eg1 <- e.g.\neg2 <- e g\neg3 <- eg\n1 <- A A\tB A\n2 <- A B\tB B\n3 <- A C\tB C\n",
        "",
    );
    assert_eq!(
        found(&s, "A   A  e.g. e g eg  B A B B B C", thresholds(-1, 1)),
        pairs(&[
            ("A   A", "1"),
            ("e.g", "eg2"),
            ("e g", "eg2"),
            ("eg", "eg1\teg3"),
            ("B A", "1"),
            ("B B", "2"),
            ("B C", "3"),
        ])
    );
}

#[test]
fn test_shared_normalized_name_reports_all_ids() {
    let s = scanner("eg1 <- e.g.\neg3 <- eg\n", "");
    assert_eq!(
        found(&s, "eg", thresholds(-1, 0)),
        pairs(&[("eg", "eg1\teg3")])
    );
}

#[test]
fn test_without_fuzzy_noise_blocks_match() {
    let s = scanner("eg2 <- e g\neg3 <- eg\n", "");
    assert!(found(&s, "e.g", ScanThresholds::default()).is_empty());
    assert_eq!(
        found(&s, "e   g", ScanThresholds::default()),
        pairs(&[("e   g", "eg2")])
    );
}

#[test]
fn test_case_threshold() {
    let s = scanner("THE <- THE\nCF <- C F\n", "");
    assert!(found(&s, "Do the right thing.", thresholds(4, 4)).is_empty());
    assert_eq!(
        found(&s, "Do the right thing.", thresholds(3, 3)),
        pairs(&[("the", "THE")])
    );
    assert_eq!(found(&s, "Do the right thing.", thresholds(0, -1)).len(), 1);
    assert!(found(&s, "Do the right thing.", thresholds(-1, -1)).is_empty());
    assert_eq!(
        found(&s, "THE end", ScanThresholds::default()),
        pairs(&[("THE", "THE")])
    );
}

#[test]
fn test_fuzzy_threshold() {
    let s = scanner("THE <- THE\nCF <- C F\n", "");
    let text = "C.F. Gauss was a German mathematician.";
    assert!(found(&s, text, thresholds(4, 4)).is_empty());
    assert_eq!(found(&s, text, thresholds(3, 3)), pairs(&[("C.F", "CF")]));
}

#[test]
fn test_word_chars_disable_fuzzy_dots() {
    let grammar = "RSVP <- R S V P\n";
    let text = "Put an r.s.v.p. at the end.";
    assert_eq!(
        found(&scanner(grammar, ""), text, thresholds(4, 4)),
        pairs(&[("r.s.v.p", "RSVP")])
    );
    assert!(found(&scanner(grammar, "."), text, thresholds(4, 4)).is_empty());
}

#[test]
fn test_threshold_uses_entity_length_not_span_length() {
    // The matched span "C . . . F" is 9 chars long but the entity "C F" has 3.
    let s = scanner("CF <- C F\n", "");
    assert!(found(&s, "C . . . F", thresholds(-1, 4)).is_empty());
    assert_eq!(
        found(&s, "C . . . F", thresholds(-1, 3)),
        pairs(&[("C . . . F", "CF")])
    );
    // A long entity allows folding even where the differing part is short.
    let s = scanner("X <- abcdef\n", "");
    assert_eq!(found(&s, "Abcdef", thresholds(6, -1)).len(), 1);
    assert!(found(&s, "Abcdef", thresholds(7, -1)).is_empty());
}

#[test]
fn test_no_match_inside_words() {
    let s = scanner("cat <- cat\n", "");
    assert_eq!(found(&s, "concatenate cats cat", ScanThresholds::default()), pairs(&[("cat", "cat")]));
}

#[test]
fn test_boundary_vetoes_fall_back_to_shorter_candidate() {
    let s = scanner_with("a <- a\nab <- a b\n", "", "%", "");
    // "a b" would be followed by '%', so the shorter "a" is chosen.
    assert_eq!(
        found(&s, "a b% x", ScanThresholds::default()),
        pairs(&[("a", "a")])
    );
    let s = scanner_with("x <- x\n", "", "", "#");
    assert_eq!(found(&s, "#x x", ScanThresholds::default()), pairs(&[("x", "x")]));
}

#[test]
fn test_match_may_end_at_end_of_text() {
    let s = scanner_with("a <- a\nab <- a b\n", "", "%", "#");
    let exact = ScanThresholds::default();
    assert_eq!(found(&s, "b a", exact), pairs(&[("a", "a")]));
    assert_eq!(found(&s, "x a b", exact), pairs(&[("a b", "ab")]));
    // Each boundary set only vetoes its own side.
    assert_eq!(found(&s, "%a", exact), pairs(&[("a", "a")]));
    assert_eq!(found(&s, "a#", exact), pairs(&[("a", "a")]));
    assert!(found(&s, "#a", exact).is_empty());
    assert!(found(&s, "a%", exact).is_empty());
}

#[test]
fn test_case_folding_is_char_for_char() {
    let s = scanner("X <- istanbul\nS <- STRASSE\nF <- fish\n", "");
    let folding = thresholds(0, -1);
    assert_eq!(found(&s, "ISTANBUL", folding), pairs(&[("ISTANBUL", "X")]));
    assert_eq!(found(&s, "strasse", folding), pairs(&[("strasse", "S")]));
    // Folds that change the number of chars are not applied.
    assert!(found(&s, "İstanbul", folding).is_empty());
    assert!(found(&s, "straße", folding).is_empty());
    assert!(found(&s, "ﬁsh", folding).is_empty());
    assert_eq!(found(&s, "FISH", folding), pairs(&[("FISH", "F")]));
}

#[test]
fn test_trailing_noise_is_not_part_of_match() {
    let s = scanner("ab <- a b\n", "");
    let chars: Vec<char> = "a-b-".chars().collect();
    let spans: Vec<MatchSpan<'_>> = s.matches(&chars, thresholds(-1, 0)).collect();
    assert_eq!(spans.len(), 1);
    assert_eq!((spans[0].start, spans[0].end), (0, 3));
}

#[test]
fn test_empty_text_and_empty_trie() {
    let s = scanner("", "");
    let chars: Vec<char> = "nothing to see".chars().collect();
    let events: Vec<ScanEvent<'_>> = s.scan(&chars, ScanThresholds::default()).collect();
    assert!(events.iter().all(|e| matches!(e, ScanEvent::NoMatch { .. })));
    assert_eq!(s.scan(&[], ScanThresholds::default()).count(), 0);
}

struct Collect {
    matches: usize,
    gaps: usize,
    stop_after: usize,
}

impl MatchHandler for Collect {
    fn on_match(&mut self, _text: &[char], _span: &MatchSpan<'_>) -> ControlFlow<()> {
        self.matches += 1;
        if self.matches >= self.stop_after {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn on_no_match(&mut self, _text: &[char], _start: usize, _end: usize) -> ControlFlow<()> {
        self.gaps += 1;
        ControlFlow::Continue(())
    }
}

#[test]
fn test_handler_can_stop_scan() {
    let s = scanner("a <- a\n", "");
    let chars: Vec<char> = "a a a a".chars().collect();
    let mut handler = Collect {
        matches: 0,
        gaps: 0,
        stop_after: 2,
    };
    let flow = s.scan_with(&chars, ScanThresholds::default(), &mut handler);
    assert_eq!(flow, ControlFlow::Break(()));
    assert_eq!(handler.matches, 2);
    assert_eq!(handler.gaps, 1);

    let mut handler = Collect {
        matches: 0,
        gaps: 0,
        stop_after: usize::MAX,
    };
    let flow = s.scan_with(&chars, ScanThresholds::default(), &mut handler);
    assert_eq!(flow, ControlFlow::Continue(()));
    assert_eq!((handler.matches, handler.gaps), (4, 3));
}

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!['a', 'b', 'A', 'B', ' ', '.', '-', '\t', 'é']),
        0..40,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn arb_threshold() -> impl Strategy<Value = Threshold> {
    (-1i64..4).prop_map(|n| Threshold::from_min_length(n).unwrap_or_default())
}

proptest! {
    #[test]
    fn prop_events_partition_text(
        text in arb_text(),
        case_insensitive in arb_threshold(),
        fuzzy in arb_threshold(),
    ) {
        let s = scanner("a <- a\nab <- a b\nb <- b.b\nx <- A-B\tb a b\n", "-");
        let chars: Vec<char> = text.chars().collect();
        let thresholds = ScanThresholds { case_insensitive, fuzzy };
        let mut expected_start = 0;
        for event in s.scan(&chars, thresholds) {
            prop_assert_eq!(event.start(), expected_start);
            prop_assert!(event.end() > event.start());
            if let ScanEvent::Match(span) = event {
                prop_assert!(!span.ids.is_empty());
                prop_assert!(s.classes().is_significant(chars[span.start]));
                prop_assert!(s.classes().is_significant(chars[span.end - 1]));
            }
            expected_start = event.end();
        }
        prop_assert_eq!(expected_start, chars.len());
    }

    #[test]
    fn prop_exact_name_is_found(name in "[a-z]{1,6}( [a-z]{1,6}){0,2}") {
        let s = scanner(&format!("id <- {name}\n"), "");
        let text = format!("x {name} y");
        let hits = found(&s, &text, ScanThresholds::default());
        prop_assert!(hits.contains(&(name.clone(), "id".to_string())));
    }
}
