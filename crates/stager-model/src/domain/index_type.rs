use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Vector index layouts accepted by the shared index server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexType {
    Flat,
    IvfFlat,
    Hnsw,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Flat => "FLAT",
            IndexType::IvfFlat => "IVF_FLAT",
            IndexType::Hnsw => "HNSW",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FLAT" => Ok(IndexType::Flat),
            "IVF_FLAT" => Ok(IndexType::IvfFlat),
            "HNSW" => Ok(IndexType::Hnsw),
            _ => Err(ModelError::UnknownIndexType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("ivf_flat".parse::<IndexType>().unwrap(), IndexType::IvfFlat);
        assert_eq!("HNSW".parse::<IndexType>().unwrap(), IndexType::Hnsw);
        assert!("IVF4096,Flat".parse::<IndexType>().is_err());
    }

    #[test]
    fn serde_uses_server_spelling() {
        let json = serde_json::to_string(&IndexType::IvfFlat).unwrap();
        assert_eq!(json, r#""IVF_FLAT""#);
    }
}
