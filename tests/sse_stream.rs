use studybuddy::sse::SseParser;

fn frame(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({ "choices": [{ "delta": { "content": text } }] })
    )
}

fn accumulate(chunks: &[&[u8]]) -> String {
    let mut parser = SseParser::new();
    let mut out = String::new();
    for chunk in chunks {
        for delta in parser.push(chunk) {
            out.push_str(&delta);
        }
        if parser.is_done() {
            return out;
        }
    }
    for delta in parser.finish() {
        out.push_str(&delta);
    }
    out
}

#[test]
fn single_read_stream() {
    let stream = format!("{}{}data: [DONE]\n", frame("Hello"), frame(" world"));
    assert_eq!(accumulate(&[stream.as_bytes()]), "Hello world");
}

#[test]
fn frame_split_across_chunks() {
    let chunk1 = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel";
    let chunk2 = "lo\"}}]}\n\ndata: [DONE]\n";
    assert_eq!(accumulate(&[chunk1.as_bytes(), chunk2.as_bytes()]), "Hello");
}

#[test]
fn chunking_at_every_byte_offset_matches_whole_read() {
    // Multi-byte content so some offsets land inside a UTF-8 sequence.
    let stream = format!(
        "{}: heartbeat\n{}{}data: [DONE]\n",
        frame("Héllo"),
        frame(" wörld"),
        frame(" ☕")
    );
    let bytes = stream.as_bytes();
    let expected = accumulate(&[bytes]);
    assert_eq!(expected, "Héllo wörld ☕");

    for split in 1..bytes.len() {
        let got = accumulate(&[&bytes[..split], &bytes[split..]]);
        assert_eq!(got, expected, "mismatch splitting at byte {}", split);
    }
}

#[test]
fn one_byte_at_a_time() {
    let stream = format!("{}data: [DONE]\n", frame("abc"));
    let chunks: Vec<&[u8]> = stream.as_bytes().chunks(1).collect();
    assert_eq!(accumulate(&chunks), "abc");
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    let plain = format!("{}{}data: [DONE]\n", frame("a"), frame("b"));
    let noisy = format!(
        ": heartbeat\n\n{}: another\r\n\n{}data: [DONE]\n",
        frame("a"),
        frame("b")
    );
    assert_eq!(accumulate(&[noisy.as_bytes()]), accumulate(&[plain.as_bytes()]));
}

#[test]
fn crlf_line_endings_are_normalized() {
    let stream = "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r\n\r\ndata: [DONE]\r\n";
    assert_eq!(accumulate(&[stream.as_bytes()]), "ok");
}

#[test]
fn done_sentinel_halts_accumulation() {
    let mut parser = SseParser::new();
    let stream = format!("{}data: [DONE]\ndata: {{garbage\n", frame("first"));
    let deltas = parser.push(stream.as_bytes());
    assert_eq!(deltas, vec!["first".to_string()]);
    assert!(parser.is_done());

    // Anything after the sentinel is ignored, even well-formed frames.
    assert!(parser.push(frame("second").as_bytes()).is_empty());
    assert!(parser.finish().is_empty());
}

#[test]
fn line_without_newline_waits_for_more_input() {
    let mut parser = SseParser::new();
    let deltas = parser.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}");
    assert!(deltas.is_empty());
    let deltas = parser.push(b"\n");
    assert_eq!(deltas, vec!["Hi".to_string()]);
}

#[test]
fn trailing_malformed_frame_is_dropped_on_finish() {
    let mut parser = SseParser::new();
    let stream = format!("{}data: {{\"choices\":[{{\"delt", frame("Hi"));
    let mut out = String::new();
    for delta in parser.push(stream.as_bytes()) {
        out.push_str(&delta);
    }
    // Stream ends; the truncated frame can never complete and is ignored.
    for delta in parser.finish() {
        out.push_str(&delta);
    }
    assert_eq!(out, "Hi");
}

#[test]
fn frames_without_delta_content_are_ignored() {
    let stream = "data: {\"choices\":[{\"delta\":{}}]}\n\
                  data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\
                  data: {\"choices\":[{\"finish_reason\":\"stop\"}]}\n\
                  data: [DONE]\n";
    assert_eq!(accumulate(&[stream.as_bytes()]), "");
}

#[test]
fn multibyte_character_split_across_chunks() {
    let stream = frame("☕") + "data: [DONE]\n";
    let bytes = stream.as_bytes();
    // Split inside the three-byte encoding of the cup.
    let cup_start = stream.find('☕').unwrap();
    let split = cup_start + 1;
    assert_eq!(accumulate(&[&bytes[..split], &bytes[split..]]), "☕");
}

#[test]
fn output_grows_monotonically() {
    let stream = format!(
        "{}{}{}data: [DONE]\n",
        frame("Explain "),
        frame("the "),
        frame("theorem")
    );
    let bytes = stream.as_bytes();
    let mut parser = SseParser::new();
    let mut accumulated = String::new();
    let mut last_len = 0;
    for chunk in bytes.chunks(7) {
        for delta in parser.push(chunk) {
            accumulated.push_str(&delta);
        }
        assert!(accumulated.len() >= last_len);
        last_len = accumulated.len();
        if parser.is_done() {
            break;
        }
    }
    assert_eq!(accumulated, "Explain the theorem");
}
