//! Best-effort structural repair of near-valid JSON.
//!
//! Model output is usually valid JSON. When it is not, the damage is almost
//! always one of a small set of textual slips, each handled by a single
//! forward pass over the characters:
//!
//! | Slip                                   | Fix                                   |
//! |----------------------------------------|---------------------------------------|
//! | output cut off mid-array               | close open strings, objects, arrays   |
//! | `[1, 2,]` / `{"a": 1,}`                | drop the trailing comma               |
//! | `"What is "ATP"?"`                     | escape quotes that cannot end a string|
//! | raw newline / tab inside a string      | escape it                             |
//! | `"key":` at end of input               | append `null`                         |
//! | `{"a": 1, "ke` at end of input         | drop the key                          |
//! | stray `}` / `]` with nothing to close  | drop it                               |
//!
//! [`repair_json`] never fails; whether the result parses is for the caller
//! to find out.

/// Repair common structural damage in `input`. Valid JSON passes through
/// unchanged.
pub fn repair_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    // Closers owed for every open object/array, innermost last.
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    // Where the last object key without a following `:` starts in `out`.
    let mut pending_key: Option<usize> = None;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                out.push(c);
                escaped = false;
                continue;
            }
            match c {
                '\\' => {
                    out.push(c);
                    escaped = true;
                }
                '"' if closes_string(&chars[i + 1..]) => {
                    out.push('"');
                    in_string = false;
                }
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                let trimmed = out.trim_end();
                if stack.last() == Some(&'}') && (trimmed.ends_with('{') || trimmed.ends_with(',')) {
                    pending_key = Some(out.len());
                }
                out.push(c);
                in_string = true;
            }
            ':' => {
                pending_key = None;
                out.push(c);
            }
            '{' => {
                stack.push('}');
                out.push(c);
            }
            '[' => {
                stack.push(']');
                out.push(c);
            }
            '}' | ']' => {
                if !stack.contains(&c) {
                    continue;
                }
                while let Some(closer) = stack.pop() {
                    strip_trailing_comma(&mut out);
                    out.push(closer);
                    if closer == c {
                        break;
                    }
                }
            }
            c => out.push(c),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    if let Some(start) = pending_key {
        out.truncate(start);
    }
    strip_trailing_comma(&mut out);
    if out.trim_end().ends_with(':') {
        out.push_str(" null");
    }
    while let Some(closer) = stack.pop() {
        strip_trailing_comma(&mut out);
        out.push(closer);
    }
    out
}

/// Whether a `"` followed by `rest` can be the end of a string token.
fn closes_string(rest: &[char]) -> bool {
    let mut iter = rest.iter().copied().skip_while(|c| c.is_whitespace());
    match iter.next() {
        None | Some(':') | Some('}') | Some(']') => true,
        // A comma ends the string only if a JSON value or closer follows it.
        Some(',') => {
            let after: String = iter.skip_while(|c| c.is_whitespace()).take(5).collect();
            match after.chars().next() {
                None => true,
                Some(c) if "\"{[]}-".contains(c) || c.is_ascii_digit() => true,
                _ => ["true", "false", "null"].iter().any(|w| after.starts_with(w)),
            }
        }
        _ => false,
    }
}

fn strip_trailing_comma(out: &mut String) {
    let len = out.trim_end().len();
    if out[..len].ends_with(',') {
        out.truncate(len - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn parse(s: &str) -> Value {
        serde_json::from_str(&repair_json(s)).unwrap_or_else(|e| {
            panic!("repaired text did not parse: {e}\n{}", repair_json(s))
        })
    }

    #[test]
    fn valid_json_is_unchanged() {
        let valid = r#"[{"question": "Why \"ATP\"?", "options": [], "n": -1.5, "ok": true}]"#;
        assert_eq!(repair_json(valid), valid);
    }

    #[test]
    fn missing_closing_bracket() {
        let broken = r#"[{"question":"Q1","answer":"A"},{"question":"Q2","answer":"B"}"#;
        assert_eq!(
            parse(broken),
            json!([{"question":"Q1","answer":"A"},{"question":"Q2","answer":"B"}])
        );
    }

    #[test]
    fn output_cut_inside_string() {
        let broken = r#"[{"question":"Q1","answer":"Photosynth"#;
        assert_eq!(parse(broken), json!([{"question":"Q1","answer":"Photosynth"}]));
    }

    #[test]
    fn trailing_commas_removed() {
        assert_eq!(parse(r#"[{"a":1,},]"#), json!([{"a":1}]));
        assert_eq!(parse("[1, 2, 3,\n]"), json!([1, 2, 3]));
        assert_eq!(parse(r#"[{"a":1},"#), json!([{"a":1}]));
    }

    #[test]
    fn inner_quotes_escaped() {
        let broken = r#"[{"question":"What does "ATP" stand for?","answer":"x"}]"#;
        assert_eq!(
            parse(broken),
            json!([{"question":"What does \"ATP\" stand for?","answer":"x"}])
        );
    }

    #[test]
    fn quoted_phrase_with_comma_stays_inside() {
        let broken = r#"["He said "wait", then left"]"#;
        assert_eq!(parse(broken), json!(["He said \"wait\", then left"]));
    }

    #[test]
    fn raw_newlines_escaped() {
        assert_eq!(parse("[\"line one\nline two\"]"), json!(["line one\nline two"]));
    }

    #[test]
    fn dangling_key_gets_null() {
        assert_eq!(parse(r#"[{"a":1,"b":"#), json!([{"a":1,"b":null}]));
    }

    #[test]
    fn output_cut_inside_key_drops_the_key() {
        assert_eq!(
            parse(r#"[{"question":"Q1"},{"question":"Q2","ans"#),
            json!([{"question":"Q1"},{"question":"Q2"}])
        );
        assert_eq!(parse(r#"[{"a":1,"b""#), json!([{"a":1}]));
        assert_eq!(parse(r#"[{"qu"#), json!([{}]));
    }

    #[test]
    fn stray_closer_dropped() {
        assert_eq!(parse(r#"[1, 2]]"#), json!([1, 2]));
    }

    #[test]
    fn mismatched_closer_closes_inner_first() {
        assert_eq!(parse(r#"[{"a":[1,2}]"#), json!([{"a":[1,2]}]));
    }
}
