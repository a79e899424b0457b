use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated 17-character vehicle identification number. The alphabet
/// excludes I, O, and Q, which are never issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Vin(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VinError {
    #[error("VIN must be 17 characters, got {0}")]
    WrongLength(usize),
    #[error("VIN contains disallowed character '{0}'")]
    DisallowedCharacter(char),
}

impl Vin {
    pub fn parse(raw: &str) -> Result<Self, VinError> {
        let candidate = raw.trim().to_ascii_uppercase();
        if candidate.chars().count() != 17 {
            return Err(VinError::WrongLength(candidate.chars().count()));
        }

        for ch in candidate.chars() {
            let allowed = matches!(ch, '0'..='9' | 'A'..='Z') && !matches!(ch, 'I' | 'O' | 'Q');
            if !allowed {
                return Err(VinError::DisallowedCharacter(ch));
            }
        }

        Ok(Self(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Vin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Vin {
    type Error = VinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Vin> for String {
    fn from(vin: Vin) -> Self {
        vin.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_well_formed_vin() {
        let vin = Vin::parse("1HGCM82633A004352").expect("valid VIN");
        assert_eq!(vin.as_str(), "1HGCM82633A004352");
    }

    #[test]
    fn uppercases_and_trims_input() {
        let vin = Vin::parse("  1hgcm82633a004352 ").expect("valid VIN");
        assert_eq!(vin.as_str(), "1HGCM82633A004352");
    }

    #[test]
    fn rejects_sixteen_characters() {
        assert_eq!(
            Vin::parse("1HGCM82633A00435"),
            Err(VinError::WrongLength(16))
        );
    }

    #[test]
    fn rejects_oh_eye_and_cue() {
        assert_eq!(
            Vin::parse("1HGCM82633A00435O"),
            Err(VinError::DisallowedCharacter('O'))
        );
        assert_eq!(
            Vin::parse("IHGCM82633A004352"),
            Err(VinError::DisallowedCharacter('I'))
        );
        assert_eq!(
            Vin::parse("QHGCM82633A004352"),
            Err(VinError::DisallowedCharacter('Q'))
        );
    }

    #[test]
    fn rejects_punctuation() {
        assert_eq!(
            Vin::parse("1HGCM82633A00435-"),
            Err(VinError::DisallowedCharacter('-'))
        );
    }
}
