/// Utility functions and helpers
use std::time::{SystemTime, UNIX_EPOCH};

/// Generate a unique ID based on timestamp and random component
pub fn generate_id(prefix: &str) -> String {
    let random: u32 = rand::random();
    format!("{}-{}-{:x}", prefix, now_millis(), random)
}

/// Wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Glob-style matching as used by SCAN/KEYS patterns.
///
/// Supports `*`, `?`, `[abc]`, `[a-z]`, `[^abc]` and `\` escapes.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_at(&pattern, &text)
}

fn glob_match_at(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    while p < pattern.len() {
        match pattern[p] {
            '*' => {
                while p + 1 < pattern.len() && pattern[p + 1] == '*' {
                    p += 1;
                }
                if p + 1 == pattern.len() {
                    return true;
                }
                return (t..=text.len()).any(|start| glob_match_at(&pattern[p + 1..], &text[start..]));
            }
            '?' => {
                if t >= text.len() {
                    return false;
                }
                t += 1;
            }
            '[' => {
                if t >= text.len() {
                    return false;
                }
                let (matched, next) = match_class(pattern, p + 1, text[t]);
                if !matched {
                    return false;
                }
                p = next;
                t += 1;
                continue;
            }
            '\\' if p + 1 < pattern.len() => {
                p += 1;
                if t >= text.len() || pattern[p] != text[t] {
                    return false;
                }
                t += 1;
            }
            c => {
                if t >= text.len() || c != text[t] {
                    return false;
                }
                t += 1;
            }
        }
        p += 1;
    }
    t == text.len()
}

/// Returns whether `c` matches the class starting at `start` and the index after `]`
fn match_class(pattern: &[char], start: usize, c: char) -> (bool, usize) {
    let mut p = start;
    let negate = p < pattern.len() && pattern[p] == '^';
    if negate {
        p += 1;
    }
    let mut matched = false;
    while p < pattern.len() && pattern[p] != ']' {
        if pattern[p] == '\\' && p + 1 < pattern.len() {
            p += 1;
            matched |= pattern[p] == c;
        } else if p + 2 < pattern.len() && pattern[p + 1] == '-' && pattern[p + 2] != ']' {
            let (lo, hi) = if pattern[p] <= pattern[p + 2] {
                (pattern[p], pattern[p + 2])
            } else {
                (pattern[p + 2], pattern[p])
            };
            matched |= lo <= c && c <= hi;
            p += 2;
        } else {
            matched |= pattern[p] == c;
        }
        p += 1;
    }
    (matched != negate, p + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", ""));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("user:*", "user:42"));
        assert!(!glob_match("user:*", "session:42"));
        assert!(glob_match("h?llo", "hello"));
        assert!(!glob_match("h?llo", "hllo"));
        assert!(glob_match("h[ae]llo", "hallo"));
        assert!(!glob_match("h[ae]llo", "hillo"));
        assert!(glob_match("h[^e]llo", "hallo"));
        assert!(glob_match("key[0-9]", "key7"));
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
        assert!(glob_match("*:*:1", "gameConfig:1:1"));
    }

    #[test]
    fn test_now_millis() {
        let first = now_millis();
        let second = now_millis();
        assert!(first > 0);
        assert!(second >= first);
    }

    #[test]
    fn test_generate_id() {
        let id1 = generate_id("driver");
        let id2 = generate_id("driver");

        assert!(id1.starts_with("driver-"));
        assert!(id2.starts_with("driver-"));
        assert_ne!(id1, id2);
    }
}
