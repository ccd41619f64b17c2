//! Serde helpers for the proto3 JSON mapping used by the REST API
//!
//! - int64 values travel as decimal strings (numbers are accepted on input)
//! - durations travel as `"<seconds>[.<fraction>]s"`
//! - field masks travel as a comma-joined string of paths
//! - enums travel as their SCREAMING_CASE names; unknown names decode to the
//!   `*_UNSPECIFIED` variant

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serializer, de};

static DURATION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:\.(\d{1,9}))?s$").ok());

/// Parse a proto3 JSON duration such as `"10s"` or `"1.5s"`
pub fn parse_duration(s: &str) -> Option<Duration> {
    let caps = DURATION_RE.as_ref()?.captures(s)?;
    let secs: u64 = caps[1].parse().ok()?;
    let nanos = match caps.get(2) {
        Some(frac) => {
            let digits = frac.as_str();
            let padded = format!("{:0<9}", digits);
            padded.parse::<u32>().ok()?
        }
        None => 0,
    };
    Some(Duration::new(secs, nanos))
}

/// Format a duration the way the REST API expects it
pub fn format_duration(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        format!("{}s", d.as_secs())
    } else {
        let frac = format!("{:09}", d.subsec_nanos());
        format!("{}.{}s", d.as_secs(), frac.trim_end_matches('0'))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

/// int64 fields
pub mod int64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match IntOrString::deserialize(deserializer)? {
            IntOrString::Int(i) => Ok(i),
            IntOrString::Str(s) => s
                .parse()
                .map_err(|_| de::Error::custom(format!("invalid int64 '{}'", s))),
        }
    }
}

/// Optional duration fields
pub mod duration {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_str(&format_duration(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => parse_duration(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid duration '{}'", s))),
            None => Ok(None),
        }
    }
}

/// Field masks
pub mod field_mask {
    use super::*;

    pub fn serialize<S: Serializer>(paths: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&paths.join(","))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect())
    }
}

/// Define a wire enum with a catch-all unspecified variant
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $unspecified:ident = $unspecified_str:literal,
            $($variant:ident = $s:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub enum $name {
            #[default]
            $unspecified,
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::$unspecified => $unspecified_str,
                    $($name::$variant => $s),+
                }
            }

            pub fn from_wire(s: &str) -> Self {
                match s {
                    $($s => $name::$variant,)+
                    _ => $name::$unspecified,
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                Ok($name::from_wire(&s))
            }
        }
    };
}

pub(crate) use wire_enum;
