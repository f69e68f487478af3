//! SsmParameterStore - AWS Systems Manager Parameter Store backend

use crate::store::ParameterStore;
use aws_config::BehaviorVersion;
use aws_sdk_ssm::error::DisplayErrorContext;
use shared::{ParameterNotFoundError, Result, StackError};
use tracing::debug;

/// Parameter store backed by SSM.
///
/// Lookups are blocking: each call drives the SDK on a private
/// current-thread runtime.
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
    runtime: tokio::runtime::Runtime,
}

impl SsmParameterStore {
    /// Build a client from the default credential/region chain
    pub fn from_env(region: Option<String>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = runtime.block_on(loader.load());

        Ok(Self {
            client: aws_sdk_ssm::Client::new(&config),
            runtime,
        })
    }
}

impl ParameterStore for SsmParameterStore {
    fn get(&self, path: &str) -> Result<String> {
        debug!(path, "reading parameter from SSM");

        let response = self
            .runtime
            .block_on(self.client.get_parameter().name(path).send());

        match response {
            Ok(output) => output
                .parameter()
                .and_then(|p| p.value())
                .map(str::to_string)
                .ok_or_else(|| {
                    ParameterNotFoundError {
                        path: path.to_string(),
                    }
                    .into()
                }),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_parameter_not_found())
                    .unwrap_or(false);

                if not_found {
                    Err(ParameterNotFoundError {
                        path: path.to_string(),
                    }
                    .into())
                } else {
                    Err(StackError::Store(format!(
                        "failed to read '{}': {}",
                        path,
                        DisplayErrorContext(&err)
                    )))
                }
            }
        }
    }
}
