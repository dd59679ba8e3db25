use serde_derive::{Deserialize, Serialize};
use std::{fmt::Display, path::Path};

use crate::ARCHIVE_EXTENSION;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct WorldName(pub String);

impl Display for WorldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl WorldName {
    pub fn snapshot_name(&self) -> ObjectName {
        ObjectName(format!("{}{}", self.0, ARCHIVE_EXTENSION))
    }

    /// Name of the remote copy of the canary file, pushed next to the snapshot so
    /// fingerprints can be compared without downloading the whole archive.
    pub fn canary_name(&self, canary_file: &Path) -> ObjectName {
        let file_name = canary_file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| canary_file.display().to_string());
        ObjectName(format!("{}.{}", self.0, file_name))
    }

    pub fn is_valid(&self) -> bool {
        let value = self.0.trim();
        !value.is_empty() && !value.contains(['/', '\\']) && value != "." && value != ".."
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct ObjectId(pub String);

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct ObjectName(pub String);

impl Display for ObjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;
    use std::path::PathBuf;

    #[test]
    fn test_snapshot_name() {
        assert_eq!(
            WorldName("Survival".to_string()).snapshot_name(),
            ObjectName("Survival.zip".to_string())
        )
    }

    #[rstest]
    #[case("level.dat", "Survival.level.dat")]
    #[case("data/level.dat", "Survival.level.dat")]
    fn test_canary_name(#[case] canary_file: &str, #[case] expected: &str) {
        assert_eq!(
            WorldName("Survival".to_string()).canary_name(&PathBuf::from(canary_file)),
            ObjectName(expected.to_string())
        )
    }

    #[rstest]
    #[case("Survival", true)]
    #[case("My World", true)]
    #[case("", false)]
    #[case("  ", false)]
    #[case("..", false)]
    #[case("saves/Survival", false)]
    fn test_world_name_validity(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(WorldName(raw.to_string()).is_valid(), expected)
    }
}
