//! Cloud assembly on-disk format

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{Packaging, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MANIFEST_VERSION: &str = "1";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const ASSETS_FILE: &str = "assets.json";
pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// `<stack>.template.json`
pub fn template_file(stack: &str) -> String {
    format!("{}.template.json", stack)
}

/// Deployment target of every stack; an unset region resolves at deploy time
pub fn environment_uri(region: Option<&str>) -> String {
    format!("aws://unknown-account/{}", region.unwrap_or("unknown-region"))
}

/// `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    /// Stack names in declaration order
    pub stack_order: Vec<String>,
    pub artifacts: BTreeMap<String, StackArtifact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: StackArtifactProperties,
    /// Stacks that must deploy first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifactProperties {
    pub template_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `assets.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    pub version: String,
    pub files: BTreeMap<String, AssetEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub source: AssetSource,
    /// Key in the staging bucket
    pub object_key: String,
    /// Stacks referencing the asset
    pub stacks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSource {
    pub path: String,
    pub packaging: Packaging,
}

/// Synthesized templates plus the manifests describing them
#[derive(Debug, Clone, PartialEq)]
pub struct CloudAssembly {
    pub templates: BTreeMap<String, Value>,
    pub manifest: Manifest,
    pub assets: AssetManifest,
}

impl CloudAssembly {
    pub fn template(&self, stack: &str) -> Option<&Value> {
        self.templates.get(stack)
    }

    pub fn artifact(&self, stack: &str) -> Option<&StackArtifact> {
        self.manifest.artifacts.get(stack)
    }

    /// Write every template and both manifests into `dir`, creating it if needed
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for (stack, template) in &self.templates {
            let path = dir.join(template_file(stack));
            std::fs::write(&path, serde_json::to_string_pretty(template)?)?;
            written.push(path);
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        std::fs::write(&manifest_path, serde_json::to_string_pretty(&self.manifest)?)?;
        written.push(manifest_path);

        let assets_path = dir.join(ASSETS_FILE);
        std::fs::write(&assets_path, serde_json::to_string_pretty(&self.assets)?)?;
        written.push(assets_path);

        info!(dir = %dir.display(), files = written.len(), "cloud assembly written");
        Ok(written)
    }

    /// Read back the manifest of an assembly directory
    pub fn read_manifest(dir: &Path) -> Result<Manifest> {
        let content = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }
}
