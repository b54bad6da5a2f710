//! End-to-end editing sequences through the public API.

use quill_buffer::{DocumentAccessor, Span, TagId, TextBuffer, EOF_CHAR};

// Nanosecond timestamps far enough apart that edits never merge.
fn ts(step: u64) -> u64 {
    step * 10_000_000_000
}

#[test]
fn test_insert_mid_line_preserves_line_structure() {
    let mut buf = TextBuffer::from_str("ab\ncd");
    assert!(buf.insert_str("X", 1, ts(1), true));
    assert_eq!(buf.content(), "aXb\ncd");
    assert_eq!(buf.line_count(), 2);
    assert_eq!(buf.offset_to_line(0), Some(0));
    assert_eq!(buf.offset_to_line(5), Some(1));
}

#[test]
fn test_delete_up_to_newline_preserves_line_structure() {
    let mut buf = TextBuffer::from_str("ab\ncd");
    assert!(buf.delete(0, 2, ts(1), true));
    assert_eq!(buf.content(), "\ncd");
    assert_eq!(buf.line_count(), 2);
    assert_eq!(buf.line_offset(1), Some(1));
}

#[test]
fn test_oversized_insert_reallocates_without_corrupting_content() {
    let mut buf = TextBuffer::from_str("ab");
    let before = buf.capacity();
    let filler = "x".repeat(before + 100);
    assert!(buf.insert_str(&filler, 1, ts(1), true));
    assert!(buf.capacity() > before);
    assert_eq!(buf.content(), format!("a{}b", filler));
}

#[test]
fn test_batched_replace_undoes_as_one_step() {
    let mut buf = TextBuffer::from_str("hello world");
    buf.begin_batch();
    assert!(buf.delete(0, 3, ts(1), true));
    assert!(buf.insert_str("HELLO", 0, ts(2), true));
    buf.end_batch();
    assert_eq!(buf.content(), "HELLOlo world");

    assert!(buf.undo().is_some());
    assert_eq!(buf.content(), "hello world");
    assert!(!buf.can_undo());
}

#[test]
fn test_typing_burst_undoes_as_one_step() {
    let mut buf = TextBuffer::new();
    // Keystrokes a few milliseconds apart merge into a single entry.
    for (i, c) in "hello".chars().enumerate() {
        assert!(buf.insert(&[c], i, (i as u64) * 5_000_000, true));
    }
    assert_eq!(buf.content(), "hello");
    assert_eq!(buf.undo(), Some(0));
    assert_eq!(buf.content(), "");
    assert!(!buf.can_undo());
}

#[test]
fn test_backspace_run_undoes_as_one_step() {
    let mut buf = TextBuffer::from_str("hello");
    for (i, offset) in [4usize, 3, 2].iter().enumerate() {
        assert!(buf.delete(*offset, 1, (i as u64) * 5_000_000, true));
    }
    assert_eq!(buf.content(), "he");
    assert_eq!(buf.undo(), Some(5));
    assert_eq!(buf.content(), "hello");
    assert!(!buf.can_undo());
}

#[test]
fn test_undo_redo_walks_whole_session() {
    let original = "fn main() {\n    println!(\"hi\");\n}\n";
    let mut buf = TextBuffer::from_str(original);

    assert!(buf.insert_str("pub ", 0, ts(1), true));
    assert!(buf.delete(8, 2, ts(2), true));
    buf.begin_batch();
    assert!(buf.delete(0, 3, ts(3), true));
    assert!(buf.insert_str("PUB", 0, ts(4), true));
    buf.end_batch();
    let edited = buf.content();

    let mut undo_count = 0;
    while buf.undo().is_some() {
        undo_count += 1;
    }
    assert_eq!(undo_count, 3);
    assert_eq!(buf.content(), original);
    assert_eq!(buf.line_count(), 4);

    while buf.redo().is_some() {}
    assert_eq!(buf.content(), edited);
}

#[test]
fn test_line_queries_track_a_growing_document() {
    let mut buf = TextBuffer::new();
    for i in 0..50u32 {
        let line = format!("line number {}\n", i);
        let at = buf.text_length();
        assert!(buf.insert_str(&line, at, ts(u64::from(i)), true));
    }
    assert_eq!(buf.line_count(), 51);
    assert_eq!(buf.line_content(0), "line number 0");
    assert_eq!(buf.line_content(49), "line number 49");
    assert_eq!(buf.line_content(50), "");
    // Jump around so lookups exercise both scan directions off the cache.
    for &line in &[40usize, 3, 25, 49, 0, 12] {
        let start = buf.line_offset(line).unwrap();
        assert_eq!(buf.offset_to_line(start), Some(line));
        assert_eq!(buf.line_content(line), format!("line number {}", line));
    }
}

#[test]
fn test_spans_survive_an_editing_session() {
    let mut buf = TextBuffer::from_str("let x = 1;");
    buf.replace_spans(vec![
        Span::new(3, TagId(1)),
        Span::new(5, TagId(0)),
        Span::new(1, TagId(2)),
        Span::new(1, TagId(0)),
    ])
    .unwrap();

    assert!(buf.insert_str("mut ", 4, ts(1), true));
    assert!(buf.delete(8, 1, ts(2), true));
    let sum: usize = buf.spans().iter().map(|s| s.length).sum();
    assert_eq!(sum, buf.text_length());

    // A stale pass computed against the old length is rejected outright.
    let stale = vec![Span::new(10, TagId(1))];
    assert!(buf.replace_spans(stale).is_err());
    let sum: usize = buf.spans().iter().map(|s| s.length).sum();
    assert_eq!(sum, buf.text_length());
}

#[test]
fn test_shared_accessor_sees_edits_from_another_view() {
    let doc = DocumentAccessor::new(TextBuffer::from_str("abc\ndef"));
    let mut reader = doc.clone();

    assert!(doc.insert("123", 0, ts(1)));
    let mut seen = String::new();
    while reader.has_next() {
        let c = reader.next();
        if c == EOF_CHAR {
            break;
        }
        seen.push(c);
    }
    assert_eq!(seen, "123abc\ndef");
    assert_eq!(doc.line_offset(1), Some(7));

    assert_eq!(doc.undo(), Some(0));
    assert_eq!(reader.content(), "abc\ndef");
}
