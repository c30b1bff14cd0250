use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub const MINTED_RUN_ID_LEN: usize = 12;

pub fn validate_identifier_value(kind: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{kind} must be non-empty"));
    }
    if value == "." || value == ".." {
        return Err(format!("{kind} must not be a relative path segment"));
    }
    if value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Ok(());
    }
    Err(format!(
        "{kind} must use only ASCII letters, digits, '-' or '_'"
    ))
}

/// Identifier of one run. Always safe to use as a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn parse(raw: &str) -> Result<Self, String> {
        validate_identifier_value("run id", raw)?;
        Ok(Self(raw.to_string()))
    }

    /// Mints a fresh random id of twelve lowercase hex characters.
    pub fn mint() -> Result<Self, String> {
        let mut bytes = [0_u8; MINTED_RUN_ID_LEN / 2];
        getrandom::getrandom(&mut bytes)
            .map_err(|err| format!("failed to generate run id randomness: {err}"))?;
        Ok(Self(hex_encode(&bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq<str> for RunId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RunId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::borrow::Borrow<str> for RunId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for RunId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl<'de> Deserialize<'de> for RunId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .map_err(|err| D::Error::custom(format!("invalid run id `{raw}`: {err}")))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_twelve_lowercase_hex_chars() {
        let id = RunId::mint().expect("mint");
        assert_eq!(id.as_str().len(), MINTED_RUN_ID_LEN);
        assert!(id
            .as_str()
            .chars()
            .all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch)));
    }

    #[test]
    fn rejects_path_like_values() {
        assert!(RunId::parse("../etc").is_err());
        assert!(RunId::parse("a/b").is_err());
        assert!(RunId::parse("..").is_err());
        assert!(RunId::parse("").is_err());
        assert!(RunId::parse("run_01-a").is_ok());
    }

    #[test]
    fn hex_encode_pads_nibbles() {
        assert_eq!(hex_encode(&[0x00, 0x0f, 0xa0]), "000fa0");
    }
}
