use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

const VISIBLE_SUFFIX: usize = 3;
const MIN_LEN_FOR_SUFFIX: usize = 6;

/// Wrapper for travel documents and other personal data.
///
/// `Debug` and `Display` only ever reveal the last few characters, so the
/// value can sit inside structs that get logged with `tracing::info!("{:?}")`.
/// Serialization writes the real value: API responses and the database need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: fmt::Display> Masked<T> {
    fn masked(&self) -> String {
        let raw = self.0.to_string();
        let len = raw.chars().count();
        if len < MIN_LEN_FOR_SUFFIX {
            return "********".to_string();
        }
        let suffix: String = raw.chars().skip(len - VISIBLE_SUFFIX).collect();
        format!("******{}", suffix)
    }
}

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Masked({})", self.masked())
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    /// Borrow the raw value. Call sites should be limited to persistence and responses.
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_passport_number() {
        let passport = Masked("X1234567".to_string());

        let rendered = format!("{:?}", passport);
        assert_eq!(rendered, "Masked(******567)");
        assert!(!rendered.contains("X1234"));
    }

    #[test]
    fn test_short_values_fully_masked() {
        let short = Masked("AB12".to_string());
        assert_eq!(short.to_string(), "********");
    }

    #[test]
    fn test_serialization_keeps_real_value() {
        let passport = Masked("P998877".to_string());
        let json = serde_json::to_string(&passport).unwrap();
        assert_eq!(json, "\"P998877\"");

        let back: Masked<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expose(), "P998877");
    }
}
