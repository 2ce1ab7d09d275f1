//! Tests for the token sorting utility

use std::io::Write;

use treeguard::text::{SortOrder, Text, IGNORED_CHARS};

fn sorted_tokens(input: &str, order: SortOrder) -> Vec<String> {
    let mut text = Text::from_string(input.to_string(), '\n');
    text.sort_tokens(order, IGNORED_CHARS);
    text.tokens()
        .iter()
        .filter(|t| !t.is_empty())
        .cloned()
        .collect()
}

#[test]
fn given_mixed_case_lines_when_sorting_then_case_is_ignored() {
    let tokens = sorted_tokens("Zebra\napple\nMango", SortOrder::StartToEnd);
    assert_eq!(tokens, vec!["apple", "Mango", "Zebra"]);
}

#[test]
fn given_punctuated_lines_when_sorting_then_punctuation_is_ignored() {
    let tokens = sorted_tokens("...cherry\n\"banana\"\n[apple]", SortOrder::StartToEnd);
    assert_eq!(tokens, vec!["[apple]", "\"banana\"", "...cherry"]);
}

#[test]
fn given_lines_when_sorting_end_to_start_then_suffix_order_wins() {
    let tokens = sorted_tokens("bring\nsold\nsing\nbold", SortOrder::EndToStart);
    // -old before -ing ('d' < 'g' at the last character).
    assert_eq!(tokens, vec!["bold", "sold", "bring", "sing"]);
}

#[test]
fn given_custom_terminator_when_splitting_then_tokens_follow_it() {
    let text = Text::from_string("a;b;c".to_string(), ';');
    assert_eq!(text.tokens().len(), 3);
    assert_eq!(text.terminator(), ';');
}

#[test]
fn given_sorted_text_when_writing_raw_then_original_order_is_kept() {
    let mut text = Text::from_string("b\na".to_string(), '\n');
    text.sort_tokens(SortOrder::StartToEnd, IGNORED_CHARS);

    let mut raw = Vec::new();
    text.write_raw(&mut raw).unwrap();
    assert_eq!(String::from_utf8(raw).unwrap(), "b\na");

    let mut sorted = Vec::new();
    text.write_tokens(&mut sorted).unwrap();
    assert_eq!(String::from_utf8(sorted).unwrap(), "a\nb\n");
}

#[test]
fn given_file_when_loading_then_tokens_match_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lines.txt");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "gamma").unwrap();
    writeln!(file, "alpha").unwrap();
    write!(file, "beta").unwrap();
    drop(file);

    let mut text = Text::from_file(&path, '\n').unwrap();
    text.sort_tokens(SortOrder::StartToEnd, IGNORED_CHARS);
    let tokens: Vec<&str> = text
        .tokens()
        .iter()
        .filter(|t| !t.is_empty())
        .map(String::as_str)
        .collect();
    assert_eq!(tokens, vec!["alpha", "beta", "gamma"]);
}
