use serde::{Deserialize, Serialize};
use std::fmt;

/// Short hex tag used to correlate the log lines of one async request chain.
pub fn new_correlation_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

/// Identity of one challenge: the `(dojo, module, challenge)` triple.
///
/// All three parts are opaque strings assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeRef {
    pub dojo_id: String,
    pub module_id: String,
    pub challenge_id: String,
}

impl ChallengeRef {
    pub fn new(
        dojo_id: impl Into<String>,
        module_id: impl Into<String>,
        challenge_id: impl Into<String>,
    ) -> Self {
        Self {
            dojo_id: dojo_id.into(),
            module_id: module_id.into(),
            challenge_id: challenge_id.into(),
        }
    }

    /// Parse the `dojo/module/challenge` short form.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim_matches('/').split('/');
        let dojo = parts.next().filter(|p| !p.is_empty())?;
        let module = parts.next().filter(|p| !p.is_empty())?;
        let challenge = parts.next().filter(|p| !p.is_empty())?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(dojo, module, challenge))
    }

    /// API path segment `dojo/module/challenge` (no leading slash).
    pub fn api_path(&self) -> String {
        format!("{}/{}/{}", self.dojo_id, self.module_id, self.challenge_id)
    }
}

impl fmt::Display for ChallengeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.dojo_id, self.module_id, self.challenge_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_is_short_hex() {
        let cid = new_correlation_id();
        assert_eq!(cid.len(), 8);
        assert!(cid.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn challenge_ref_display_matches_api_path() {
        let r = ChallengeRef::new("intro", "shell", "cat-flag");
        assert_eq!(r.to_string(), "intro/shell/cat-flag");
        assert_eq!(r.api_path(), "intro/shell/cat-flag");
    }

    #[test]
    fn challenge_ref_parse() {
        let r = ChallengeRef::parse("/intro/shell/cat-flag/").unwrap();
        assert_eq!(r, ChallengeRef::new("intro", "shell", "cat-flag"));

        assert!(ChallengeRef::parse("intro/shell").is_none());
        assert!(ChallengeRef::parse("intro//cat").is_none());
        assert!(ChallengeRef::parse("a/b/c/d").is_none());
    }

    #[test]
    fn challenge_ref_equality_and_hash() {
        use std::collections::HashSet;
        let a = ChallengeRef::new("d", "m", "c");
        let b = a.clone();
        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
        assert_ne!(
            ChallengeRef::new("d", "m", "c1"),
            ChallengeRef::new("d", "m", "c2")
        );
    }
}
