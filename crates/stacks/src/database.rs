//! Database component - keyed table and the role scoped to it

use shared::{PolicyDocument, PolicyStatement, Prop, RemovalPolicy, Resource, ResourceRef, Result, Stack, Token};
use tracing::info;

pub const STACK_NAME: &str = "DatabaseStack";

/// Provisioned read and write capacity of the table
pub const TABLE_CAPACITY: u32 = 1;

/// Declared table
#[derive(Debug, Clone, PartialEq)]
pub struct TableHandle {
    pub resource: ResourceRef,
    pub table_name: String,
}

impl TableHandle {
    /// Physical table name
    pub fn name(&self) -> Token {
        self.resource.reference()
    }

    pub fn arn(&self) -> Token {
        self.resource.get_att("Arn")
    }
}

/// Declared IAM role
#[derive(Debug, Clone, PartialEq)]
pub struct RoleHandle {
    pub resource: ResourceRef,
}

impl RoleHandle {
    pub fn name(&self) -> Token {
        self.resource.reference()
    }

    pub fn arn(&self) -> Token {
        self.resource.get_att("Arn")
    }
}

/// Handles produced by the database component
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseOutputs {
    pub table: TableHandle,
    pub role: RoleHandle,
}

/// Declare the two-key table and a Lambda role with full access to it
pub fn declare(
    stack: &mut Stack,
    table_name: &str,
    partition_key: &str,
    sort_key: &str,
) -> Result<DatabaseOutputs> {
    let key = |name: &str, key_type: &str| {
        Prop::map([
            ("AttributeName", Prop::from(name)),
            ("KeyType", Prop::from(key_type)),
        ])
    };
    let attribute = |name: &str| {
        Prop::map([
            ("AttributeName", Prop::from(name)),
            ("AttributeType", Prop::from("S")),
        ])
    };

    let table = stack.add_resource(
        "TGoals",
        Resource::new("AWS::DynamoDB::Table")
            .with("TableName", table_name)
            .with("KeySchema", Prop::list([key(partition_key, "HASH"), key(sort_key, "RANGE")]))
            .with(
                "AttributeDefinitions",
                Prop::list([attribute(partition_key), attribute(sort_key)]),
            )
            .with(
                "ProvisionedThroughput",
                Prop::map([
                    ("ReadCapacityUnits", Prop::from(TABLE_CAPACITY)),
                    ("WriteCapacityUnits", Prop::from(TABLE_CAPACITY)),
                ]),
            )
            .with_removal_policy(RemovalPolicy::Destroy),
    )?;
    let table = TableHandle {
        resource: table,
        table_name: table_name.to_string(),
    };

    let role = stack.add_resource(
        "DynamoDbRole",
        Resource::new("AWS::IAM::Role").with(
            "AssumeRolePolicyDocument",
            PolicyDocument::assume_role("lambda.amazonaws.com").to_prop(),
        ),
    )?;
    let role = RoleHandle { resource: role };

    stack.add_resource(
        "GoalsPolicy",
        Resource::new("AWS::IAM::Policy")
            .with("PolicyName", "GoalsPolicy")
            .with("Roles", Prop::list([role.name()]))
            .with(
                "PolicyDocument",
                PolicyDocument::new()
                    .with_statement(
                        PolicyStatement::allow()
                            .with_actions(["dynamodb:*"])
                            .with_resources([table.arn()]),
                    )
                    .to_prop(),
            ),
    )?;

    info!(stack = stack.name(), table = table_name, "declared database");
    Ok(DatabaseOutputs { table, role })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> (Stack, DatabaseOutputs) {
        let mut stack = Stack::new(STACK_NAME);
        let outputs = declare(&mut stack, "Goals-Goals", "userId", "goalId").unwrap();
        (stack, outputs)
    }

    #[test]
    fn test_declares_table_role_and_policy() {
        let (stack, outputs) = declared();

        assert_eq!(stack.resources_of_type("AWS::DynamoDB::Table").count(), 1);
        assert_eq!(stack.resources_of_type("AWS::IAM::Role").count(), 1);
        assert_eq!(stack.resources_of_type("AWS::IAM::Policy").count(), 1);
        assert_eq!(outputs.table.table_name, "Goals-Goals");
        assert_eq!(outputs.table.resource.stack, STACK_NAME);
    }

    #[test]
    fn test_table_keys_and_capacity() {
        let (stack, _) = declared();
        let table = stack.resource("TGoals").unwrap();

        let schema = table.property("KeySchema").and_then(Prop::as_list).unwrap();
        assert_eq!(schema[0].get("AttributeName").and_then(Prop::as_str), Some("userId"));
        assert_eq!(schema[0].get("KeyType").and_then(Prop::as_str), Some("HASH"));
        assert_eq!(schema[1].get("AttributeName").and_then(Prop::as_str), Some("goalId"));
        assert_eq!(schema[1].get("KeyType").and_then(Prop::as_str), Some("RANGE"));

        let throughput = table.property("ProvisionedThroughput").unwrap();
        assert_eq!(throughput.get("ReadCapacityUnits"), Some(&Prop::Int(1)));
        assert_eq!(throughput.get("WriteCapacityUnits"), Some(&Prop::Int(1)));
        assert_eq!(table.removal_policy, Some(RemovalPolicy::Destroy));
    }

    #[test]
    fn test_policy_scoped_to_table() {
        let (stack, outputs) = declared();
        let policy = stack.resource("GoalsPolicy").unwrap();
        let statement = policy
            .property("PolicyDocument")
            .and_then(|d| d.get("Statement"))
            .and_then(|s| s.at(0))
            .unwrap();

        assert_eq!(statement.get("Action").and_then(Prop::as_str), Some("dynamodb:*"));
        assert_eq!(statement.get("Resource").and_then(Prop::as_token), Some(&outputs.table.arn()));
    }
}
