/// Console input handling: script splitting and shell-like tokenizing
use crate::error::{EngineError, EngineResult};
use bytes::Bytes;
use std::borrow::Cow;

/// Split a multi-line script into one command per non-empty line
pub fn parse_commands(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split one command line into binary-safe arguments.
///
/// Double quotes support `\n \r \t \b \a \\ \"` and `\xHH` escapes, single
/// quotes only `\'`. A closing quote must be followed by whitespace or the
/// end of the line.
pub fn split_args(line: &str) -> EngineResult<Vec<Bytes>> {
    let bytes = line.as_bytes();
    let mut args = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return Ok(args);
        }

        let mut current: Vec<u8> = Vec::new();
        let mut in_double = false;
        let mut in_single = false;

        loop {
            if in_double {
                let Some(&byte) = bytes.get(pos) else {
                    return Err(unbalanced(line));
                };
                if byte == b'\\'
                    && bytes.get(pos + 1) == Some(&b'x')
                    && bytes.get(pos + 2).map_or(false, u8::is_ascii_hexdigit)
                    && bytes.get(pos + 3).map_or(false, u8::is_ascii_hexdigit)
                {
                    current.push(hex_value(bytes[pos + 2]) * 16 + hex_value(bytes[pos + 3]));
                    pos += 4;
                } else if byte == b'\\' && pos + 1 < bytes.len() {
                    current.push(match bytes[pos + 1] {
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'b' => 0x08,
                        b'a' => 0x07,
                        other => other,
                    });
                    pos += 2;
                } else if byte == b'"' {
                    pos += 1;
                    if pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                        return Err(unbalanced(line));
                    }
                    break;
                } else {
                    current.push(byte);
                    pos += 1;
                }
            } else if in_single {
                let Some(&byte) = bytes.get(pos) else {
                    return Err(unbalanced(line));
                };
                if byte == b'\\' && bytes.get(pos + 1) == Some(&b'\'') {
                    current.push(b'\'');
                    pos += 2;
                } else if byte == b'\'' {
                    pos += 1;
                    if pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                        return Err(unbalanced(line));
                    }
                    break;
                } else {
                    current.push(byte);
                    pos += 1;
                }
            } else {
                match bytes.get(pos) {
                    None => break,
                    Some(byte) if byte.is_ascii_whitespace() => break,
                    Some(b'"') => in_double = true,
                    Some(b'\'') => in_single = true,
                    Some(&byte) => current.push(byte),
                }
                pos += 1;
            }
        }

        args.push(Bytes::from(current));
    }
}

/// Split a line whose arguments must all be text
pub fn split_text_args(line: &str) -> EngineResult<Vec<String>> {
    split_args(line)?
        .into_iter()
        .map(|arg| arg_text(&arg).map(str::to_string))
        .collect()
}

/// View an argument as text, for names, numbers and patterns
pub fn arg_text(arg: &[u8]) -> EngineResult<&str> {
    std::str::from_utf8(arg).map_err(|_| {
        EngineError::invalid_input(format!(
            "Argument is not valid UTF-8: {}",
            quote_bytes(arg)
        ))
    })
}

/// Quote an argument so that `split_args` yields it back unchanged
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control() && c != '"' && c != '\'' && c != '\\');
    if plain {
        return Cow::Borrowed(arg);
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    push_escaped(&mut quoted, arg);
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Quote raw bytes. Bytes outside valid UTF-8 sequences become `\xHH`.
pub fn quote_bytes(arg: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(arg) {
        return quote_arg(text);
    }

    let mut quoted = String::with_capacity(arg.len() * 2 + 2);
    quoted.push('"');
    let mut rest = arg;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(text) => {
                push_escaped(&mut quoted, text);
                break;
            }
            Err(e) => {
                let (valid, invalid) = rest.split_at(e.valid_up_to());
                push_escaped(&mut quoted, std::str::from_utf8(valid).unwrap_or_default());
                let bad = e.error_len().unwrap_or(invalid.len());
                for byte in &invalid[..bad] {
                    quoted.push_str(&format!("\\x{:02x}", byte));
                }
                rest = &invalid[bad..];
            }
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

fn push_escaped(quoted: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\u{7}' => quoted.push_str("\\a"),
            '\u{8}' => quoted.push_str("\\b"),
            c if c.is_ascii_control() => quoted.push_str(&format!("\\x{:02x}", c as u32)),
            c => quoted.push(c),
        }
    }
}

/// Join arguments into one command line, quoting where needed
pub fn join_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| quote_arg(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}

fn unbalanced(line: &str) -> EngineError {
    EngineError::invalid_input(format!("Unbalanced quotes in command line: {}", line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<String> {
        split_text_args(line).unwrap()
    }

    #[test]
    fn test_split_simple() {
        assert_eq!(texts("SET alex palec"), vec!["SET", "alex", "palec"]);
        assert_eq!(texts("   GET   a  "), vec!["GET", "a"]);
        assert!(split_args("").unwrap().is_empty());
    }

    #[test]
    fn test_split_single_quoted_json() {
        let args = texts(r#"SET alex '{"test":1}'"#);
        assert_eq!(args, vec!["SET", "alex", r#"{"test":1}"#]);
    }

    #[test]
    fn test_split_double_quoted() {
        let args = texts(r#"HMSET gameConfig:1:1 tile "note3" caption_uk "Kuzma""#);
        assert_eq!(
            args,
            vec!["HMSET", "gameConfig:1:1", "tile", "note3", "caption_uk", "Kuzma"]
        );

        let args = texts(r#"SET key "hello world\n\x41""#);
        assert_eq!(args, vec!["SET", "key", "hello world\nA"]);
    }

    #[test]
    fn test_split_unbalanced_quotes() {
        assert!(split_args(r#"SET key "value"#).is_err());
        assert!(split_args("SET key 'value").is_err());
        assert!(split_args(r#"SET key "a"b"#).is_err());
    }

    #[test]
    fn test_quote_arg() {
        assert_eq!(quote_arg("plain"), "plain");
        assert_eq!(quote_arg(""), "\"\"");
        assert_eq!(quote_arg("two words"), "\"two words\"");
        assert_eq!(quote_arg("\n"), "\"\\n\"");

        for raw in ["", "a b", "quote\"inside", "back\\slash", "it's", "tab\there", "\u{1}"] {
            assert_eq!(texts(&quote_arg(raw)), vec![raw.to_string()]);
        }
    }

    #[test]
    fn test_binary_args_round_trip() {
        let raw: &[u8] = b"user:\xff\xfe \xc3\xa9t\xc3";
        let quoted = quote_bytes(raw);
        assert_eq!(quoted, "\"user:\\xff\\xfe \u{e9}t\\xc3\"");

        let args = split_args(&format!("DEL {}", quoted)).unwrap();
        assert_eq!(args, vec![Bytes::from("DEL"), Bytes::copy_from_slice(raw)]);
    }

    #[test]
    fn test_text_args_reject_invalid_utf8() {
        assert!(split_args(r#"SELECT "\xff""#).is_ok());
        let err = split_text_args(r#"SELECT "\xff""#).unwrap_err();
        assert!(err.to_string().contains("\\xff"));
    }

    #[test]
    fn test_parse_commands() {
        let commands = parse_commands("SET a 1\r\n\n  GET a  \n");
        assert_eq!(commands, vec!["SET a 1", "GET a"]);
        assert!(parse_commands("\n\n").is_empty());
    }
}
