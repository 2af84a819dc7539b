use std::fmt::{self, Write};
use std::sync::Arc;

use rand::Rng;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const TOKEN_BYTES: usize = 16;
const SHORT_LEN: usize = 8;

// -----------------------------------------------------------------------------
// ----- SessionId -------------------------------------------------------------

/// Opaque session token. The contents are never interpreted, only compared.
///
/// `Display` prints a shortened form so tokens don't end up whole in logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(Arc<str>);

// -----------------------------------------------------------------------------
// ----- SessionId: Static -----------------------------------------------------

impl SessionId {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// Fresh random token, 32 lowercase hex chars.
    pub fn generate() -> Self {
        let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
        let token = bytes.iter().fold(
            String::with_capacity(TOKEN_BYTES * 2),
            |mut token, b| {
                let _ = write!(token, "{b:02x}");
                token
            },
        );
        Self::new(token)
    }
}

// -----------------------------------------------------------------------------
// ----- SessionId: Public -----------------------------------------------------

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.short().len() < self.0.len() {
            write!(f, "{}…", self.short())
        } else {
            f.write_str(&self.0)
        }
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({self})")
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_hex_and_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_eq!(a.as_str().len(), 32);
        assert!(
            a.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
        assert_ne!(a, b);
    }

    #[test]
    fn display_shortens_long_tokens() {
        let id = SessionId::new("0123456789abcdef");
        assert_eq!(id.to_string(), "01234567…");
        assert_eq!(SessionId::new("abc").to_string(), "abc");
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
