//! Bucket naming strategies
//!
//! Bucket names are global, so every name carries a numeric suffix. The
//! default strategy derives the suffix from the project and environment so
//! that re-running assembly yields the same names.

use rand::Rng;
use sha2::{Digest, Sha256};
use shared::{Result, StackError};

/// Common prefix of every bucket name
pub const BUCKET_NAME_PREFIX: &str = "aws-fullstack-template";

/// Suffixes fall in `0..SUFFIX_RANGE`
pub const SUFFIX_RANGE: u32 = 1_000_000;

/// What a bucket is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketPurpose {
    SourceAssets,
    Website,
    PipelineArtifacts,
}

impl BucketPurpose {
    pub fn label(&self) -> &'static str {
        match self {
            BucketPurpose::SourceAssets => "source-assets",
            BucketPurpose::Website => "website",
            BucketPurpose::PipelineArtifacts => "codepipeline-artifacts",
        }
    }
}

/// Produces physical bucket names
pub trait BucketNaming {
    fn bucket_name(&self, purpose: BucketPurpose) -> String;
}

/// Suffix derived from a hash of project, environment and purpose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterministicNaming {
    project: String,
    environment: String,
}

impl DeterministicNaming {
    pub fn new(project: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            environment: environment.into(),
        }
    }

    fn suffix(&self, purpose: BucketPurpose) -> u32 {
        let mut hasher = Sha256::new();
        hasher.update(self.project.as_bytes());
        hasher.update([0]);
        hasher.update(self.environment.as_bytes());
        hasher.update([0]);
        hasher.update(purpose.label().as_bytes());
        let digest = hasher.finalize();

        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(head) % u64::from(SUFFIX_RANGE)) as u32
    }
}

impl BucketNaming for DeterministicNaming {
    fn bucket_name(&self, purpose: BucketPurpose) -> String {
        format!("{}-{}-{}", BUCKET_NAME_PREFIX, purpose.label(), self.suffix(purpose))
    }
}

/// Random suffix per call. Names differ between runs, so redeploys replace
/// every bucket.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffixNaming;

impl BucketNaming for RandomSuffixNaming {
    fn bucket_name(&self, purpose: BucketPurpose) -> String {
        let suffix = rand::thread_rng().gen_range(0..SUFFIX_RANGE);
        format!("{}-{}-{}", BUCKET_NAME_PREFIX, purpose.label(), suffix)
    }
}

/// S3 bucket naming rules: 3-63 chars, lowercase letters, digits, dots, hyphens
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let valid = (3..=63).contains(&name.len())
        && regex::Regex::new("^[a-z0-9][a-z0-9.-]*[a-z0-9]$")
            .map(|r| r.is_match(name))
            .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(StackError::Naming(format!("Invalid bucket name '{}'", name)))
    }
}
