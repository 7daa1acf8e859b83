//! Waste categories and their base rewards.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Category of waste handed over in a pickup.
///
/// Names outside the known set are kept verbatim in [`WasteCategory::Other`]
/// and earn the default base reward.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WasteCategory {
    Recyclables,
    EWaste,
    Organic,
    GeneralWaste,
    Other(String),
}

impl WasteCategory {
    /// Resolve a display name. Matching is exact; anything else is `Other`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Recyclables" => Self::Recyclables,
            "E-Waste" => Self::EWaste,
            "Organic" => Self::Organic,
            "General Waste" => Self::GeneralWaste,
            other => Self::Other(other.to_string()),
        }
    }

    /// Category used when a payload carries no waste type at all.
    pub fn unspecified() -> Self {
        Self::Other(String::new())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Recyclables => "Recyclables",
            Self::EWaste => "E-Waste",
            Self::Organic => "Organic",
            Self::GeneralWaste => "General Waste",
            Self::Other(name) => name,
        }
    }

    /// Base reward in tokens; `None` for categories outside the table.
    pub fn base_reward(&self) -> Option<u64> {
        match self {
            Self::Recyclables => Some(10),
            Self::EWaste => Some(15),
            Self::Organic => Some(5),
            Self::GeneralWaste => Some(3),
            Self::Other(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.base_reward().is_some()
    }
}

impl std::fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for WasteCategory {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl Serialize for WasteCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WasteCategory {
    /// `null` is treated like a missing category.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(name
            .map(|n| Self::from_name(&n))
            .unwrap_or_else(Self::unspecified))
    }
}
