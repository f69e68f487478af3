//! Synthesis of an app into CloudFormation templates
//!
//! Tokens resolve to intrinsics. A reference into another stack becomes an
//! `Fn::ImportValue` in the consumer, an exported output in the producer, and
//! a manifest dependency from consumer to producer.

use crate::app::App;
use crate::manifest::{
    environment_uri, template_file, AssetEntry, AssetManifest, AssetSource, CloudAssembly, Manifest,
    StackArtifact, StackArtifactProperties, MANIFEST_VERSION, STACK_ARTIFACT_TYPE,
};
use serde_json::{json, Map, Value};
use shared::{Prop, ResourceRef, Result, Stack, StackError, Token};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Output id under which a producer exports a referenced value
pub fn export_output_id(target: &ResourceRef, attribute: Option<&str>) -> String {
    match attribute {
        None => format!("ExportsOutputRef{}", target.logical_id),
        Some(attribute) => format!(
            "ExportsOutputFnGetAtt{}{}",
            target.logical_id,
            attribute.chars().filter(char::is_ascii_alphanumeric).collect::<String>()
        ),
    }
}

/// `<Stack>:<output id>`
pub fn export_name(target: &ResourceRef, attribute: Option<&str>) -> String {
    format!("{}:{}", target.stack, export_output_id(target, attribute))
}

#[derive(Debug, Clone, PartialEq)]
struct Export {
    name: String,
    value: Value,
}

/// Exports requested so far, by producer stack then output id
type Exports = BTreeMap<String, BTreeMap<String, Export>>;

fn unresolved(consumer: &str, producer: &str, reason: impl Into<String>) -> StackError {
    StackError::UnresolvedReference {
        consumer: consumer.to_string(),
        producer: producer.to_string(),
        reason: reason.into(),
    }
}

/// Resolves the tokens of one consumer stack
struct Resolver<'a> {
    app: &'a App,
    consumer: &'a Stack,
    consumer_index: usize,
    exports: &'a mut Exports,
    dependencies: BTreeSet<String>,
}

impl<'a> Resolver<'a> {
    fn token(&mut self, token: &Token) -> Result<Value> {
        match token {
            Token::Literal(s) => Ok(Value::String(s.clone())),
            Token::Pseudo(pseudo) => Ok(json!({ "Ref": pseudo.as_str() })),
            Token::Concat(parts) => {
                let parts = parts
                    .iter()
                    .map(|part| self.token(part))
                    .collect::<Result<Vec<_>>>()?;
                Ok(json!({ "Fn::Join": ["", parts] }))
            }
            Token::Ref(target) => self.reference(target, None),
            Token::GetAtt { target, attribute } => {
                self.reference(target, Some(attribute.as_str()))
            }
        }
    }

    fn reference(&mut self, target: &ResourceRef, attribute: Option<&str>) -> Result<Value> {
        let local = match attribute {
            None => json!({ "Ref": target.logical_id }),
            Some(attribute) => json!({ "Fn::GetAtt": [target.logical_id, attribute] }),
        };
        let consumer = self.consumer.name();

        if target.stack == consumer {
            if self.consumer.resource(&target.logical_id).is_none() {
                return Err(unresolved(
                    consumer,
                    &target.stack,
                    format!("resource '{}' is not declared", target.logical_id),
                ));
            }
            return Ok(local);
        }

        let producer_index = self
            .app
            .position(&target.stack)
            .ok_or_else(|| unresolved(consumer, &target.stack, "stack is not part of the app"))?;
        if producer_index > self.consumer_index {
            return Err(unresolved(
                consumer,
                &target.stack,
                "stack is declared after the consumer",
            ));
        }
        let producer = &self.app.stacks()[producer_index];
        if producer.resource(&target.logical_id).is_none() {
            return Err(unresolved(
                consumer,
                &target.stack,
                format!("resource '{}' is not declared", target.logical_id),
            ));
        }

        let name = export_name(target, attribute);
        self.exports
            .entry(target.stack.clone())
            .or_default()
            .entry(export_output_id(target, attribute))
            .or_insert_with(|| Export {
                name: name.clone(),
                value: local,
            });
        self.dependencies.insert(target.stack.clone());

        debug!(consumer, export = %name, "cross-stack reference");
        Ok(json!({ "Fn::ImportValue": name }))
    }

    fn prop(&mut self, prop: &Prop) -> Result<Value> {
        Ok(match prop {
            Prop::Str(s) => Value::String(s.clone()),
            Prop::Bool(b) => Value::Bool(*b),
            Prop::Int(i) => Value::from(*i),
            Prop::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.prop(item))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Prop::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.prop(value)?);
                }
                Value::Object(map)
            }
            Prop::Token(token) => self.token(token)?,
        })
    }

    fn template(&mut self) -> Result<Map<String, Value>> {
        let stack = self.consumer;
        let mut template = Map::new();
        if let Some(description) = stack.description() {
            template.insert("Description".to_string(), Value::from(description));
        }

        let mut resources = Map::new();
        for (logical_id, resource) in stack.resources() {
            let mut rendered = Map::new();
            rendered.insert("Type".to_string(), Value::from(resource.resource_type.as_str()));

            if !resource.properties.is_empty() {
                let mut properties = Map::new();
                for (key, value) in &resource.properties {
                    properties.insert(key.clone(), self.prop(value)?);
                }
                rendered.insert("Properties".to_string(), Value::Object(properties));
            }

            if !resource.depends_on.is_empty() {
                if let Some(missing) = resource
                    .depends_on
                    .iter()
                    .find(|id| stack.resource(id).is_none())
                {
                    return Err(unresolved(
                        stack.name(),
                        stack.name(),
                        format!("'{}' depends on undeclared '{}'", logical_id, missing),
                    ));
                }
                rendered.insert("DependsOn".to_string(), json!(resource.depends_on));
            }

            if let Some(policy) = resource.removal_policy {
                rendered.insert("DeletionPolicy".to_string(), Value::from(policy.deletion_policy()));
                rendered.insert(
                    "UpdateReplacePolicy".to_string(),
                    Value::from(policy.deletion_policy()),
                );
            }

            resources.insert(logical_id.to_string(), Value::Object(rendered));
        }
        template.insert("Resources".to_string(), Value::Object(resources));

        let mut outputs = Map::new();
        for (logical_id, output) in stack.outputs() {
            let mut rendered = Map::new();
            rendered.insert("Value".to_string(), self.token(&output.value)?);
            if let Some(description) = &output.description {
                rendered.insert("Description".to_string(), Value::from(description.as_str()));
            }
            outputs.insert(logical_id.to_string(), Value::Object(rendered));
        }
        if !outputs.is_empty() {
            template.insert("Outputs".to_string(), Value::Object(outputs));
        }

        Ok(template)
    }
}

fn asset_manifest(app: &App) -> AssetManifest {
    let mut files: BTreeMap<String, AssetEntry> = BTreeMap::new();
    for stack in app.stacks() {
        for asset in stack.assets() {
            files
                .entry(asset.id.clone())
                .or_insert_with(|| AssetEntry {
                    source: AssetSource {
                        path: asset.path.clone(),
                        packaging: asset.packaging,
                    },
                    object_key: asset.object_key(),
                    stacks: Vec::new(),
                })
                .stacks
                .push(stack.name().to_string());
        }
    }

    AssetManifest {
        version: MANIFEST_VERSION.to_string(),
        files,
    }
}

/// Synthesize every stack of the app
pub fn synth(app: &App) -> Result<CloudAssembly> {
    let mut templates: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    let mut artifacts = BTreeMap::new();
    let mut exports = Exports::new();

    for (index, stack) in app.stacks().iter().enumerate() {
        let mut resolver = Resolver {
            app,
            consumer: stack,
            consumer_index: index,
            exports: &mut exports,
            dependencies: BTreeSet::new(),
        };
        let template = resolver.template()?;
        let dependencies = resolver.dependencies.into_iter().collect();

        artifacts.insert(
            stack.name().to_string(),
            StackArtifact {
                artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                environment: environment_uri(app.region()),
                properties: StackArtifactProperties {
                    template_file: template_file(stack.name()),
                    description: stack.description().map(str::to_string),
                },
                dependencies,
                tags: app.tags().clone(),
            },
        );
        templates.insert(stack.name().to_string(), template);
    }

    let mut export_count = 0;
    for (producer, outputs) in exports {
        let Some(template) = templates.get_mut(&producer) else {
            continue;
        };
        let rendered = template
            .entry("Outputs")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(rendered) = rendered {
            for (output_id, export) in outputs {
                rendered.insert(
                    output_id,
                    json!({ "Value": export.value, "Export": { "Name": export.name } }),
                );
                export_count += 1;
            }
        }
    }

    info!(stacks = templates.len(), exports = export_count, "synthesized app");
    Ok(CloudAssembly {
        templates: templates
            .into_iter()
            .map(|(name, template)| (name, Value::Object(template)))
            .collect(),
        manifest: Manifest {
            version: MANIFEST_VERSION.to_string(),
            stack_order: app.stack_names().into_iter().map(str::to_string).collect(),
            artifacts,
        },
        assets: asset_manifest(app),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{assemble, AssemblyConfig};
    use params::ParameterFile;
    use shared::{Output, Pseudo, Resource};

    fn goals() -> CloudAssembly {
        let config = AssemblyConfig {
            environment: Some("Dev-local".to_string()),
            project_name: "Goals".to_string(),
            ..Default::default()
        };
        let topology = assemble(&config, &ParameterFile::defaults().to_store()).unwrap();
        synth(&topology.app).unwrap()
    }

    /// Every `Fn::ImportValue` name found anywhere in the value
    fn imports(value: &Value, found: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(name)) = map.get("Fn::ImportValue") {
                    found.push(name.clone());
                }
                map.values().for_each(|v| imports(v, found));
            }
            Value::Array(items) => items.iter().for_each(|v| imports(v, found)),
            _ => {}
        }
    }

    // ============== Token Resolution Tests ==============

    #[test]
    fn test_same_stack_references() {
        let mut stack = Stack::new("DatabaseStack");
        let table = stack
            .add_resource("TGoals", Resource::new("AWS::DynamoDB::Table"))
            .unwrap();
        stack
            .add_resource(
                "GoalsPolicy",
                Resource::new("AWS::IAM::Policy")
                    .with("Table", table.reference())
                    .with("Arn", table.get_att("Arn")),
            )
            .unwrap();
        let mut app = App::new();
        app.add_stack(stack).unwrap();

        let assembly = synth(&app).unwrap();
        let properties = &assembly.template("DatabaseStack").unwrap()["Resources"]["GoalsPolicy"]["Properties"];
        assert_eq!(properties["Table"], json!({"Ref": "TGoals"}));
        assert_eq!(properties["Arn"], json!({"Fn::GetAtt": ["TGoals", "Arn"]}));
        assert!(assembly.artifact("DatabaseStack").unwrap().dependencies.is_empty());
    }

    #[test]
    fn test_concat_and_pseudo_render_as_join() {
        let mut stack = Stack::new("ApiGatewayStack");
        let api = stack
            .add_resource("AppApi", Resource::new("AWS::ApiGateway::RestApi"))
            .unwrap();
        stack
            .add_output(
                "AppApiEndpoint",
                Output::new(Token::concat([
                    Token::literal("https://"),
                    api.reference(),
                    Token::literal(".execute-api."),
                    Pseudo::Region.into(),
                ])),
            )
            .unwrap();
        let mut app = App::new();
        app.add_stack(stack).unwrap();

        let assembly = synth(&app).unwrap();
        assert_eq!(
            assembly.template("ApiGatewayStack").unwrap()["Outputs"]["AppApiEndpoint"]["Value"],
            json!({"Fn::Join": ["", [
                "https://",
                {"Ref": "AppApi"},
                ".execute-api.",
                {"Ref": "AWS::Region"}
            ]]})
        );
    }

    // ============== Cross-Stack Tests ==============

    fn two_stacks(producer_first: bool) -> App {
        let mut producer = Stack::new("DatabaseStack");
        let table = producer
            .add_resource("TGoals", Resource::new("AWS::DynamoDB::Table"))
            .unwrap();

        let mut consumer = Stack::new("LambdaStack");
        consumer
            .add_resource(
                "FunctionListGoals",
                Resource::new("AWS::Lambda::Function")
                    .with("TableName", table.reference())
                    .with("TableArn", table.get_att("Arn"))
                    .with("Again", table.reference()),
            )
            .unwrap();

        let mut app = App::new();
        if producer_first {
            app.add_stack(producer).unwrap();
            app.add_stack(consumer).unwrap();
        } else {
            app.add_stack(consumer).unwrap();
            app.add_stack(producer).unwrap();
        }
        app
    }

    #[test]
    fn test_cross_stack_reference_becomes_export_and_import() {
        let assembly = synth(&two_stacks(true)).unwrap();

        let properties = &assembly.template("LambdaStack").unwrap()["Resources"]["FunctionListGoals"]["Properties"];
        assert_eq!(
            properties["TableName"],
            json!({"Fn::ImportValue": "DatabaseStack:ExportsOutputRefTGoals"})
        );
        assert_eq!(
            properties["TableArn"],
            json!({"Fn::ImportValue": "DatabaseStack:ExportsOutputFnGetAttTGoalsArn"})
        );

        let outputs = &assembly.template("DatabaseStack").unwrap()["Outputs"];
        assert_eq!(outputs.as_object().unwrap().len(), 2);
        assert_eq!(
            outputs["ExportsOutputRefTGoals"],
            json!({"Value": {"Ref": "TGoals"}, "Export": {"Name": "DatabaseStack:ExportsOutputRefTGoals"}})
        );
        assert_eq!(
            assembly.artifact("LambdaStack").unwrap().dependencies,
            vec!["DatabaseStack".to_string()]
        );
    }

    #[test]
    fn test_reference_to_later_stack_fails() {
        let err = synth(&two_stacks(false)).unwrap_err();
        assert!(matches!(
            err,
            StackError::UnresolvedReference { ref consumer, ref producer, .. }
                if consumer == "LambdaStack" && producer == "DatabaseStack"
        ));
    }

    #[test]
    fn test_reference_to_unknown_stack_fails() {
        let mut stack = Stack::new("LambdaStack");
        stack
            .add_resource(
                "FunctionListGoals",
                Resource::new("AWS::Lambda::Function")
                    .with("TableName", ResourceRef::new("MissingStack", "TGoals").reference()),
            )
            .unwrap();
        let mut app = App::new();
        app.add_stack(stack).unwrap();

        assert!(matches!(synth(&app), Err(StackError::UnresolvedReference { .. })));
    }

    #[test]
    fn test_undeclared_dependency_fails() {
        let mut stack = Stack::new("ApiGatewayStack");
        stack
            .add_resource(
                "AppApiDeployment",
                Resource::new("AWS::ApiGateway::Deployment").depends_on("AppApiANY"),
            )
            .unwrap();
        let mut app = App::new();
        app.add_stack(stack).unwrap();

        assert!(synth(&app).is_err());
    }

    // ============== Goals Topology Tests ==============

    #[test]
    fn test_goals_end_to_end() {
        let assembly = goals();

        let table = &assembly.template("DatabaseStack").unwrap()["Resources"]["TGoals"];
        assert_eq!(table["Properties"]["TableName"], "Goals-Goals");
        assert_eq!(table["DeletionPolicy"], "Delete");

        let endpoint = &assembly.template("ApiGatewayStack").unwrap()["Outputs"]["AppApiEndpoint"]["Value"];
        assert_eq!(
            endpoint,
            &json!({"Fn::Join": ["", [
                "https://",
                {"Ref": "AppApi"},
                ".execute-api.",
                {"Ref": "AWS::Region"},
                ".",
                {"Ref": "AWS::URLSuffix"},
                "/prod/"
            ]]})
        );

        let cdn = &assembly.template("CdnStack").unwrap()["Outputs"]["CloudFrontCDNUrl"]["Value"];
        assert_eq!(
            cdn,
            &json!({"Fn::Join": ["", ["http://", {"Fn::GetAtt": ["AssetsCDN", "DomainName"]}]]})
        );
    }

    #[test]
    fn test_goals_imports_match_exports() {
        let assembly = goals();

        let mut exported = BTreeSet::new();
        for template in assembly.templates.values() {
            if let Some(outputs) = template.get("Outputs").and_then(Value::as_object) {
                for output in outputs.values() {
                    if let Some(name) = output["Export"]["Name"].as_str() {
                        exported.insert(name.to_string());
                    }
                }
            }
        }

        let mut imported = Vec::new();
        for template in assembly.templates.values() {
            imports(template, &mut imported);
        }
        let imported: BTreeSet<_> = imported.into_iter().collect();

        assert!(!imported.is_empty());
        assert_eq!(imported, exported);
    }

    #[test]
    fn test_goals_dependencies() {
        let assembly = goals();
        let dependencies = |stack: &str| assembly.artifact(stack).unwrap().dependencies.clone();

        assert!(dependencies("DatabaseStack").is_empty());
        assert_eq!(dependencies("LambdaStack"), vec!["DatabaseStack".to_string()]);
        assert_eq!(dependencies("CdnStack"), vec!["S3Stack".to_string()]);
        assert_eq!(
            dependencies("ApiGatewayStack"),
            vec!["CognitoStack".to_string(), "LambdaStack".to_string()]
        );
        assert_eq!(
            dependencies("CodeStack"),
            vec![
                "ApiGatewayStack".to_string(),
                "CognitoStack".to_string(),
                "S3Stack".to_string()
            ]
        );
    }

    #[test]
    fn test_goals_manifest_and_assets() {
        let assembly = goals();

        assert_eq!(assembly.manifest.stack_order.len(), 7);
        for artifact in assembly.manifest.artifacts.values() {
            assert_eq!(artifact.tags.get("App").map(String::as_str), Some("CDKFullStack"));
        }

        let functions = assembly
            .assets
            .files
            .values()
            .find(|entry| entry.source.path == "../functions")
            .unwrap();
        assert_eq!(functions.stacks, vec!["LambdaStack".to_string()]);
    }

    #[test]
    fn test_goals_assembly_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        goals().write(dir.path()).unwrap();

        for stack in [
            "DatabaseStack",
            "S3Stack",
            "CdnStack",
            "LambdaStack",
            "CognitoStack",
            "ApiGatewayStack",
            "CodeStack",
        ] {
            let path = dir.path().join(template_file(stack));
            let template: Value =
                serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
            assert!(template["Resources"].as_object().is_some_and(|r| !r.is_empty()), "{stack}");
        }

        let manifest = CloudAssembly::read_manifest(dir.path()).unwrap();
        assert_eq!(manifest.stack_order[0], "DatabaseStack");
    }

    #[test]
    fn test_synth_is_idempotent() {
        assert_eq!(goals(), goals());
    }
}
