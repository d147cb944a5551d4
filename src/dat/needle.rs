use super::{Character, DatError, END_OF_TEXT};
use crate::utils::utf8;

/// A decoded needle: a non-empty run of code points with no reserved characters
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Needle {
    characters: Vec<Character>,
}

/// Characters that may never appear inside a needle
#[inline]
pub fn is_reserved(c: Character) -> bool {
    c == 0 || c == END_OF_TEXT
}

impl Needle {
    /// Decode a UTF-8 byte run into a needle
    pub fn from_utf8(bytes: &[u8]) -> Result<Self, DatError> {
        Self::from_characters(utf8::decode(bytes)?)
    }

    pub fn from_characters(characters: Vec<Character>) -> Result<Self, DatError> {
        if characters.is_empty() {
            return Err(DatError::EmptyNeedle);
        }
        if let Some(offset) = characters.iter().position(|&c| is_reserved(c)) {
            return Err(DatError::ReservedCharacter {
                offset,
                character: characters[offset],
            });
        }
        Ok(Self { characters })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Always false; kept for API symmetry with `len`
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Character] {
        &self.characters
    }
}

impl std::str::FromStr for Needle {
    type Err = DatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_characters(s.chars().map(|c| c as Character).collect())
    }
}

impl std::fmt::Display for Needle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&utf8::encode(&self.characters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_utf8() {
        let needle = Needle::from_utf8("caf\u{e9}".as_bytes()).unwrap();
        assert_eq!(needle.as_slice(), &[99, 97, 102, 0xE9]);
        assert_eq!(needle.len(), 4);
        assert_eq!(needle.to_string(), "caf\u{e9}");
    }

    #[test]
    fn test_rejects_invalid() {
        assert_eq!(
            Needle::from_utf8(b"ab\xff"),
            Err(DatError::InvalidUtf8 { offset: 2 })
        );
        assert_eq!(Needle::from_utf8(b""), Err(DatError::EmptyNeedle));
        assert_eq!(
            Needle::from_utf8(b"a\x03b"),
            Err(DatError::ReservedCharacter {
                offset: 1,
                character: END_OF_TEXT
            })
        );
        assert!("x\0".parse::<Needle>().is_err());
    }

    #[test]
    fn test_from_str_matches_from_utf8() {
        let text = "\u{1f984} unicorn";
        let a: Needle = text.parse().unwrap();
        let b = Needle::from_utf8(text.as_bytes()).unwrap();
        assert_eq!(a, b);
    }
}
