//! Static capability table: engine family → priority, feature flags, reported version.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine families a ghost package can ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineFamily {
    Yaya,
    Satoriya,
    Generic,
}

impl EngineFamily {
    pub const ALL: [EngineFamily; 3] = [EngineFamily::Yaya, EngineFamily::Satoriya, EngineFamily::Generic];

    /// Map a binary file name to its family. Exact, case-sensitive match.
    pub fn from_binary_name(file_name: &str) -> Option<Self> {
        match file_name {
            "yaya.dll" | "aya5.dll" => Some(EngineFamily::Yaya),
            "satoriya.dll" => Some(EngineFamily::Satoriya),
            "shiori.dll" => Some(EngineFamily::Generic),
            _ => None,
        }
    }

    /// Lowercase token used in descriptor ids and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            EngineFamily::Yaya => "yaya",
            EngineFamily::Satoriya => "satoriya",
            EngineFamily::Generic => "generic",
        }
    }
}

impl fmt::Display for EngineFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature flags advertised by an engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub scripting: bool,
    pub variables: bool,
    pub functions: bool,
    pub arrays: bool,
    pub networking: bool,
    #[serde(rename = "fileIO")]
    pub file_io: bool,
    pub regex: bool,
    pub multi_character: bool,
    pub debugging: bool,
}

const YAYA_CAPABILITIES: Capabilities = Capabilities {
    scripting: true,
    variables: true,
    functions: true,
    arrays: true,
    networking: true,
    file_io: true,
    regex: true,
    multi_character: true,
    debugging: true,
};

const SATORIYA_CAPABILITIES: Capabilities = Capabilities {
    scripting: true,
    variables: true,
    functions: true,
    arrays: false,
    networking: false,
    file_io: true,
    regex: false,
    multi_character: true,
    debugging: false,
};

const GENERIC_CAPABILITIES: Capabilities = Capabilities {
    scripting: true,
    variables: true,
    functions: false,
    arrays: false,
    networking: false,
    file_io: false,
    regex: false,
    multi_character: false,
    debugging: false,
};

/// Selection priority; higher wins.
pub fn priority_of(family: EngineFamily) -> u32 {
    match family {
        EngineFamily::Yaya => 100,
        EngineFamily::Satoriya => 80,
        EngineFamily::Generic => 50,
    }
}

pub fn capabilities_of(family: EngineFamily) -> Capabilities {
    match family {
        EngineFamily::Yaya => YAYA_CAPABILITIES,
        EngineFamily::Satoriya => SATORIYA_CAPABILITIES,
        EngineFamily::Generic => GENERIC_CAPABILITIES,
    }
}

/// Version reported for a detected binary of this family.
pub fn default_version_of(family: EngineFamily) -> &'static str {
    match family {
        EngineFamily::Yaya => "8.0.0",
        EngineFamily::Satoriya => "1.2.3",
        EngineFamily::Generic => "1.0.0",
    }
}
