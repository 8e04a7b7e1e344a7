//! Classification of outgoing request URLs against the repository's
//! update-check endpoints.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::codec::SerializationFormat;

/// Which catalog an update-check endpoint serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Plugins,
    Themes,
}

impl EndpointKind {
    /// The form-body field the repository endpoint reads the payload from.
    pub fn body_key(&self) -> &'static str {
        match self {
            EndpointKind::Plugins => "plugins",
            EndpointKind::Themes => "themes",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.body_key())
    }
}

impl FromStr for EndpointKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plugins" => Ok(EndpointKind::Plugins),
            "themes" => Ok(EndpointKind::Themes),
            _ => anyhow::bail!("Unknown endpoint kind: {}. Expected plugins or themes.", s),
        }
    }
}

/// Per-request descriptor derived from a matched update-check URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEndpoint {
    pub kind: EndpointKind,
    pub api_version: String,
    pub format: SerializationFormat,
}

static ENDPOINT_PATTERN: OnceLock<Regex> = OnceLock::new();

fn endpoint_pattern() -> &'static Regex {
    ENDPOINT_PATTERN.get_or_init(|| {
        Regex::new(r"://api\.wordpress\.org/(?P<kind>plugins|themes)/update-check/(?P<version>[0-9.]+)/")
            .expect("endpoint pattern is valid")
    })
}

/// Matches `url` against the repository update-check path. `None` means the
/// URL is not an update-check endpoint and the request must pass through
/// untouched.
pub fn classify(url: &str) -> Option<UpdateEndpoint> {
    let captures = endpoint_pattern().captures(url)?;

    let kind = match &captures["kind"] {
        "plugins" => EndpointKind::Plugins,
        _ => EndpointKind::Themes,
    };
    let api_version = captures["version"].to_string();

    // API 1.0 still speaks the legacy native-serialization format; every
    // later version speaks JSON. Comparison is numeric so "1.00" counts.
    let legacy = api_version.parse::<f64>().is_ok_and(|v| v == 1.0);
    let format = if legacy {
        SerializationFormat::Legacy
    } else {
        SerializationFormat::Json
    };

    Some(UpdateEndpoint {
        kind,
        api_version,
        format,
    })
}
