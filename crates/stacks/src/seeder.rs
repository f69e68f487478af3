//! Parameter seeder - stores the property values an environment reads

use params::ParameterFile;
use shared::{Resource, ResourceRef, Result, Stack};
use tracing::info;

pub const STACK_NAME: &str = "SsmSeederStack";

/// Handles produced by the seeder
#[derive(Debug, Clone, PartialEq)]
pub struct SeederOutputs {
    /// `(path, parameter)` for every seeded value
    pub parameters: Vec<(String, ResourceRef)>,
}

/// Logical id derived from the parameter path
fn parameter_logical_id(path: &str) -> String {
    let mut id: String = path.chars().filter(char::is_ascii_alphanumeric).collect();
    id.push_str("Parameter");
    id
}

/// Declare one `String` parameter per entry of the file
pub fn declare(stack: &mut Stack, parameters: &ParameterFile) -> Result<SeederOutputs> {
    let parameters = parameters
        .parameters()
        .into_iter()
        .map(|(path, value)| {
            let resource = stack.add_resource(
                &parameter_logical_id(&path),
                Resource::new("AWS::SSM::Parameter")
                    .with("Name", path.as_str())
                    .with("Type", "String")
                    .with("Value", value),
            )?;
            Ok((path, resource))
        })
        .collect::<Result<Vec<_>>>()?;

    info!(stack = stack.name(), parameters = parameters.len(), "declared seeder");
    Ok(SeederOutputs { parameters })
}
