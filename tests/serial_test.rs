//! Tests for the parenthesized prefix format: round-trip law and syntax
//! failures

use rstest::rstest;
use treeguard::domain::{DomainError, Index, Operator, Tree, Value};

fn num(n: f64) -> Value {
    Value::Number(n)
}

/// `(10 (5 nil nil) (15 nil nil))`, bound as root.
fn three_node_tree() -> Tree {
    let mut tree = Tree::new(100);
    let n5 = tree.new_node(num(5.0), None, None).unwrap();
    let n15 = tree.new_node(num(15.0), None, None).unwrap();
    let root = tree.new_node(num(10.0), Some(n5), Some(n15)).unwrap();
    tree.bind_root(root).unwrap();
    tree
}

fn print_to_string(tree: &mut Tree, separator: char) -> String {
    let mut out = Vec::new();
    tree.print_to(&mut out, separator, None).unwrap();
    String::from_utf8(out).unwrap()
}

// ============================================================
// Printing
// ============================================================

#[test]
fn given_three_node_tree_when_printing_then_exact_token_stream() {
    let mut tree = three_node_tree();
    let printed = print_to_string(&mut tree, ' ');
    assert_eq!(printed.trim_end(), "( 10 ( 5 nil nil ) ( 15 nil nil ) )");
}

#[test]
fn given_corrupt_tree_when_printing_then_error_and_no_output() {
    let mut tree = three_node_tree();
    let root = tree.root().unwrap();
    tree.wire_count(root, 42).unwrap();

    let mut out = Vec::new();
    let err = tree.print_to(&mut out, ' ', None).unwrap_err();

    assert!(matches!(err, DomainError::CountMismatch { .. }));
    assert!(out.is_empty(), "a failed print must not emit tokens");
}

// ============================================================
// Reading
// ============================================================

#[test]
fn given_token_stream_when_reading_then_shape_and_values_match() {
    let tree = Tree::read_from_str("( 10 ( 5 nil nil ) ( 15 nil nil ) )", ' ', 100, None).unwrap();

    assert!(tree.verify().is_ok());
    assert_eq!(tree.count_nodes().unwrap(), 3);
    let root = tree.root().unwrap();
    let rec = tree.node(root).unwrap();
    assert_eq!(rec.value, num(10.0));
    let left = tree.node(rec.left.unwrap()).unwrap();
    let right = tree.node(rec.right.unwrap()).unwrap();
    assert_eq!(left.value, num(5.0));
    assert_eq!(right.value, num(15.0));
    assert_eq!(left.left, None);
    assert_eq!(right.right, None);
}

#[test]
fn given_left_only_stream_when_reading_then_two_nodes_verify() {
    let tree = Tree::read_from_str("( 10 ( 5 nil nil ) nil )", ' ', 100, None).unwrap();
    assert!(tree.verify().is_ok());
    assert_eq!(tree.count_nodes().unwrap(), 2);
}

#[rstest]
#[case::truncated("( 10 ( 5 nil nil )")]
#[case::missing_children("( 10 )")]
#[case::bad_value("( 1a! nil nil )")]
#[case::bad_child("( 10 what nil )")]
#[case::trailing_garbage("( 10 nil nil ) extra")]
#[case::close_first(") 10 nil nil (")]
#[case::empty("")]
fn given_malformed_stream_when_reading_then_syntax_error(#[case] input: &str) {
    let err = Tree::read_from_str(input, ' ', 100, None).unwrap_err();
    assert!(
        matches!(err, DomainError::Syntax { .. }),
        "expected syntax error for {:?}, got {:?}",
        input,
        err
    );
}

#[test]
fn given_bare_nil_when_reading_then_no_root() {
    let err = Tree::read_from_str("nil", ' ', 100, None).unwrap_err();
    assert!(matches!(err, DomainError::NoRoot));
}

#[test]
fn given_nesting_past_the_size_limit_when_reading_then_size_exceeded() {
    fn left_spine(depth: usize) -> String {
        if depth == 0 {
            "nil".to_string()
        } else {
            format!("( 1 {} nil )", left_spine(depth - 1))
        }
    }
    let err = Tree::read_from_str(&left_spine(8), ' ', 4, None).unwrap_err();
    assert!(matches!(err, DomainError::SizeExceeded { .. }));
}

// ============================================================
// Round-trip law
// ============================================================

#[test]
fn given_printed_tree_when_reading_back_then_structurally_identical() {
    let mut tree = three_node_tree();
    let printed = print_to_string(&mut tree, ' ');

    let reread = Tree::read_from_str(&printed, ' ', 100, None).unwrap();

    assert!(reread.verify().is_ok());
    assert!(tree.same_structure(&reread));
}

#[test]
fn given_custom_separator_when_round_tripping_then_structurally_identical() {
    let mut tree = three_node_tree();
    let printed = print_to_string(&mut tree, ';');
    assert_eq!(printed.trim_end(), "(;10;(;5;nil;nil;);(;15;nil;nil;);)");

    let reread = Tree::read_from_str(&printed, ';', 100, None).unwrap();
    assert!(tree.same_structure(&reread));
}

#[test]
fn given_expression_payloads_when_round_tripping_then_values_survive() {
    // ((x * 2.5) + -3): operators, symbols, and a negative literal.
    let mut tree = Tree::new(100);
    let x = tree
        .new_node(Value::Symbol("x".to_string()), None, None)
        .unwrap();
    let c = tree.new_node(num(2.5), None, None).unwrap();
    let mul = tree
        .new_node(Value::Operator(Operator::Mul), Some(x), Some(c))
        .unwrap();
    let neg = tree.new_node(num(-3.0), None, None).unwrap();
    let root = tree
        .new_node(Value::Operator(Operator::Add), Some(mul), Some(neg))
        .unwrap();
    tree.bind_root(root).unwrap();

    let printed = print_to_string(&mut tree, ' ');
    assert_eq!(printed.trim_end(), "( + ( * ( x nil nil ) ( 2.5 nil nil ) ) ( -3 nil nil ) )");

    let reread = Tree::read_from_str(&printed, ' ', 100, None).unwrap();
    assert!(tree.same_structure(&reread));
}

#[test]
fn given_file_round_trip_then_structurally_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tree.txt");

    let mut tree = balanced(7);
    tree.print_to_file(&path, ' ', None).unwrap();

    let reread = Tree::read_from_file(&path, ' ', 100, None).unwrap();
    assert!(reread.verify().is_ok());
    assert_eq!(reread.count_nodes().unwrap(), 7);
    assert!(tree.same_structure(&reread));
}

#[test]
fn given_reread_tree_when_printing_again_then_streams_match() {
    // Print -> Read -> Print is a fixpoint.
    let mut tree = balanced(7);
    let first = print_to_string(&mut tree, ' ');
    let mut reread = Tree::read_from_str(&first, ' ', 100, None).unwrap();
    let second = print_to_string(&mut reread, ' ');
    assert_eq!(first, second);
}

/// Balanced tree with `n` nodes for n in {1, 3, 7}: values are heap order.
fn balanced(n: u64) -> Tree {
    let mut tree = Tree::new(100);
    let root = build_heap(&mut tree, 1, n);
    tree.bind_root(root.unwrap()).unwrap();
    tree
}

fn build_heap(tree: &mut Tree, i: u64, n: u64) -> Option<Index> {
    if i > n {
        return None;
    }
    let left = build_heap(tree, 2 * i, n);
    let right = build_heap(tree, 2 * i + 1, n);
    Some(tree.new_node(num(i as f64), left, right).unwrap())
}
