//! File assets staged for upload before deployment

use crate::token::{Pseudo, Token};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How an asset is packaged for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Packaging {
    /// Directory zipped before upload
    ZipDirectory,
    /// File uploaded as-is
    File,
}

/// A local path referenced by a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAsset {
    pub id: String,
    pub path: String,
    pub packaging: Packaging,
}

impl FileAsset {
    /// The id is a content address over the packaging and the path
    pub fn new(path: impl Into<String>, packaging: Packaging) -> Self {
        let path = path.into();
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}:", packaging).as_bytes());
        hasher.update(path.as_bytes());
        let id = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>();

        Self { id, path, packaging }
    }

    /// Object key in the staging bucket
    pub fn object_key(&self) -> String {
        match self.packaging {
            Packaging::ZipDirectory => format!("{}.zip", self.id),
            Packaging::File => self.id.clone(),
        }
    }

    /// Where the asset lives once staged
    pub fn location(&self) -> AssetLocation {
        AssetLocation {
            bucket: staging_bucket(),
            key: self.object_key(),
        }
    }
}

/// Staged location of an asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetLocation {
    pub bucket: Token,
    pub key: String,
}

/// Per-account, per-region staging bucket
pub fn staging_bucket() -> Token {
    Token::concat([
        Token::literal("cdk-assets-"),
        Pseudo::AccountId.into(),
        Token::literal("-"),
        Pseudo::Region.into(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_is_stable() {
        let a = FileAsset::new("../functions", Packaging::ZipDirectory);
        let b = FileAsset::new("../functions", Packaging::ZipDirectory);
        let c = FileAsset::new("./assets/archive", Packaging::ZipDirectory);

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id.len(), 64);
        assert!(a.object_key().ends_with(".zip"));
    }

    #[test]
    fn test_packaging_changes_id() {
        let zipped = FileAsset::new("assets.zip", Packaging::ZipDirectory);
        let file = FileAsset::new("assets.zip", Packaging::File);

        assert_ne!(zipped.id, file.id);
        assert_eq!(file.object_key(), file.id);
    }
}
