/// Cluster redirection handling (MOVED and ASK)
///
/// Error replies are scanned with Aho-Corasick for the two redirect
/// keywords; the slot is parsed with `btoi` straight from the bytes.
use crate::error::{EngineError, EngineResult};
use aho_corasick::AhoCorasick;
use lazy_static::lazy_static;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectType {
    /// Slot has permanently moved
    Moved { slot: u16, target: String },
    /// Temporary redirection during slot migration
    Ask { slot: u16, target: String },
}

impl RedirectType {
    pub fn slot(&self) -> u16 {
        match self {
            RedirectType::Moved { slot, .. } | RedirectType::Ask { slot, .. } => *slot,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            RedirectType::Moved { target, .. } | RedirectType::Ask { target, .. } => target,
        }
    }

    pub fn is_ask(&self) -> bool {
        matches!(self, RedirectType::Ask { .. })
    }
}

impl From<RedirectType> for EngineError {
    fn from(redirect: RedirectType) -> Self {
        let ask = redirect.is_ask();
        match redirect {
            RedirectType::Moved { slot, target } | RedirectType::Ask { slot, target } => {
                EngineError::Redirect { slot, target, ask }
            }
        }
    }
}

const BYTE_SPACE: u8 = b' ';
const PATTERNS: &[&str] = &["ASK", "MOVED"];

lazy_static! {
    static ref FINDER: AhoCorasick =
        AhoCorasick::new(PATTERNS).expect("redirect patterns are valid");
}

pub struct RedirectParser;

impl RedirectParser {
    /// Parse an error message such as `MOVED 3999 127.0.0.1:6381`
    pub fn parse(message: &[u8]) -> Option<RedirectType> {
        let found = FINDER.find(message)?;
        if found.start() != 0 {
            return None;
        }
        let end = found.end();
        if message.get(end) != Some(&BYTE_SPACE) {
            return None;
        }

        let rest = &message[end + 1..];
        let space = rest.iter().position(|&b| b == BYTE_SPACE)?;
        let slot = btoi::btoi::<u16>(&rest[..space]).ok()?;
        let target = String::from_utf8_lossy(&rest[space + 1..])
            .trim_end_matches(['\r', '\n'])
            .to_string();
        if target.is_empty() {
            return None;
        }

        if found.pattern().as_u32() == 0 {
            Some(RedirectType::Ask { slot, target })
        } else {
            Some(RedirectType::Moved { slot, target })
        }
    }
}

/// Redirect budget for one request
#[derive(Debug, Clone)]
pub struct RedirectionContext {
    pub redirect_count: u8,
    pub max_redirects: u8,
    pub redirect_chain: Vec<String>,
}

impl RedirectionContext {
    pub fn new(max_redirects: u8) -> Self {
        Self {
            redirect_count: 0,
            max_redirects,
            redirect_chain: Vec::new(),
        }
    }

    pub fn add_redirect(&mut self, target: &str) -> EngineResult<()> {
        if !self.can_redirect() {
            return Err(EngineError::connection(format!(
                "Max redirects exceeded ({}): {}",
                self.max_redirects,
                self.redirect_chain.join(" -> ")
            )));
        }
        self.redirect_count += 1;
        self.redirect_chain.push(target.to_string());
        Ok(())
    }

    pub fn can_redirect(&self) -> bool {
        self.redirect_count < self.max_redirects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_moved() {
        let redirect = RedirectParser::parse(b"MOVED 3999 127.0.0.1:6381").unwrap();
        assert_eq!(
            redirect,
            RedirectType::Moved {
                slot: 3999,
                target: "127.0.0.1:6381".to_string()
            }
        );
    }

    #[test]
    fn test_parse_ask() {
        let redirect = RedirectParser::parse(b"ASK 12345 192.168.1.100:6380\r\n").unwrap();
        assert!(redirect.is_ask());
        assert_eq!(redirect.slot(), 12345);
        assert_eq!(redirect.target(), "192.168.1.100:6380");
    }

    #[test]
    fn test_parse_rejects_non_redirects() {
        assert!(RedirectParser::parse(b"").is_none());
        assert!(RedirectParser::parse(b"ERR unknown command").is_none());
        assert!(RedirectParser::parse(b"MOVED3999 127.0.0.1:6381").is_none());
        assert!(RedirectParser::parse(b"MOVED 3999").is_none());
        assert!(RedirectParser::parse(b"MOVED abc 127.0.0.1:6381").is_none());
        assert!(RedirectParser::parse(b"ERR ASK 1 host:1").is_none());
    }

    #[test]
    fn test_into_engine_error() {
        let error: EngineError = RedirectType::Ask {
            slot: 0,
            target: "h:1".to_string(),
        }
        .into();
        assert!(matches!(error, EngineError::Redirect { slot: 0, ask: true, .. }));
        assert_eq!(error.to_string(), "-> Redirected to slot [0] located at h:1");
    }

    #[test]
    fn test_redirection_context() {
        let mut context = RedirectionContext::new(2);
        assert!(context.add_redirect("127.0.0.1:6380").is_ok());
        assert!(context.add_redirect("127.0.0.1:6381").is_ok());
        assert!(!context.can_redirect());
        assert!(context.add_redirect("127.0.0.1:6382").is_err());
        assert_eq!(context.redirect_chain.len(), 2);
    }
}
