//! The core infrastructure stack.
//!
//! Declares storage, messaging, networking, database, workflow and IAM
//! resources for one environment. Everything is validated while it is
//! declared; nothing touches the filesystem here.

use crate::environments::EnvironmentSettings;
use crate::error::Result;
use crate::resources::ec2::{Network, NetworkLayout, SecurityGroup};
use crate::resources::grants;
use crate::resources::iam::{Policy, PolicyStatement, Role};
use crate::resources::kms::{Alias, Key};
use crate::resources::lambda::Function;
use crate::resources::logs::LogGroup;
use crate::resources::rds::{
    secret_field, DbCluster, DbInstance, DbSubnetGroup, Secret, SecretTargetAttachment,
    AURORA_POSTGRES_ENGINE,
};
use crate::resources::s3::{AutoDeleteObjects, Bucket, BucketPolicy, LifecycleRule};
use crate::resources::sfn::{
    Definition, LogLevel, LoggingConfiguration, State, StateMachine, StateMachineType,
};
use crate::resources::sqs::Queue;
use crate::template::{
    managed_policy_arn, LogicalId, RemovalPolicy, ResourceOptions, Template, TemplateBuilder,
};

pub const STACK_DESCRIPTION: &str = "Core infrastructure for GA Maintenance LogbookLM: buckets, queues, Aurora, Step Functions, and IAM roles.";

pub const AURORA_ENGINE_VERSION: &str = "15.3";
pub const DEFAULT_DATABASE_NAME: &str = "logbooklm";
pub const BACKUP_RETENTION_DAYS: u32 = 7;

pub const DLQ_RETENTION_SECONDS: u32 = 14 * 24 * 60 * 60;
pub const INGESTION_VISIBILITY_TIMEOUT_SECONDS: u32 = 5 * 60;
pub const INGESTION_MAX_RECEIVE_COUNT: u32 = 5;

pub const WORKFLOW_LOG_RETENTION_DAYS: u32 = 30;
pub const NONCURRENT_ARTIFACT_EXPIRATION_DAYS: u32 = 30;

const LAMBDA_SERVICE: &str = "lambda.amazonaws.com";
const STATES_SERVICE: &str = "states.amazonaws.com";

/// Synthesized stack plus handles to its primary resources.
#[derive(Debug, Clone)]
pub struct CoreInfrastructureStack {
    pub stack_name: String,
    pub environment: EnvironmentSettings,
    pub template: Template,
    pub data_key: LogicalId,
    pub documents_bucket: LogicalId,
    pub artifacts_bucket: LogicalId,
    pub ingestion_queue: LogicalId,
    pub dead_letter_queue: LogicalId,
    pub aurora_cluster: LogicalId,
    pub aurora_secret: LogicalId,
    pub ingestion_state_machine: LogicalId,
    pub workflow_role: LogicalId,
    pub ingestion_lambda_role: LogicalId,
}

impl CoreInfrastructureStack {
    pub fn new(stack_id: &str, env: &EnvironmentSettings) -> Result<Self> {
        env.validate()?;
        let name = env.name;

        let mut b = TemplateBuilder::new()
            .with_description(STACK_DESCRIPTION)
            .with_tag("Environment", name);
        let destroy = || ResourceOptions::new().removal_policy(RemovalPolicy::Delete);

        // Encryption
        let data_key = b.add_with(
            "PrimaryDataKey",
            Key::rotating().with_description(format!("LogbookLM {name} primary data key")),
            destroy(),
        )?;
        b.add(
            "PrimaryDataKeyAlias",
            Alias::new(format!("alias/logbooklm/{name}/primary"), data_key.arn()),
        )?;

        // Storage
        let provider_role = b.add(
            "AutoDeleteObjectsProviderRole",
            Role::assumed_by(LAMBDA_SERVICE).with_managed_policy(managed_policy_arn(
                "service-role/AWSLambdaBasicExecutionRole",
            )),
        )?;
        let provider = b.add(
            "AutoDeleteObjectsProvider",
            Function::auto_delete_objects_provider(&provider_role),
        )?;

        let documents_bucket = encrypted_bucket(
            &mut b,
            "DocumentsBucket",
            Bucket::encrypted(&data_key),
            &provider,
            &provider_role,
        )?;
        let artifacts_bucket = encrypted_bucket(
            &mut b,
            "ArtifactsBucket",
            Bucket::encrypted(&data_key).with_lifecycle_rule(LifecycleRule::expire_noncurrent(
                "expire-noncurrent-artifacts",
                NONCURRENT_ARTIFACT_EXPIRATION_DAYS,
            )),
            &provider,
            &provider_role,
        )?;

        // Messaging
        let dead_letter_queue = b.add_with(
            "IngestionDeadLetterQueue",
            Queue::named(format!("logbooklm-{name}-ingestion-dlq"))
                .encrypted_with(&data_key)
                .with_retention(DLQ_RETENTION_SECONDS),
            destroy(),
        )?;
        let ingestion_queue = b.add_with(
            "IngestionQueue",
            Queue::named(format!("logbooklm-{name}-ingestion"))
                .encrypted_with(&data_key)
                .with_visibility_timeout(INGESTION_VISIBILITY_TIMEOUT_SECONDS)
                .with_dead_letter_queue(&dead_letter_queue, INGESTION_MAX_RECEIVE_COUNT),
            destroy(),
        )?;

        // Networking
        let network = Network::declare(&mut b, "ApplicationVpc", &NetworkLayout::default())?;
        let db_security_group = b.add(
            "DatabaseSecurityGroup",
            SecurityGroup::allow_all_outbound(
                "Restrict Aurora access to application workloads.",
                &network.vpc,
            ),
        )?;

        // Database
        let aurora_secret = b.add_with(
            "AuroraClusterSecret",
            Secret::master_credentials(
                format!("Master credentials for logbooklm-{name}-aurora"),
                "postgres",
            ),
            destroy(),
        )?;
        let subnet_group = b.add_with(
            "AuroraClusterSubnets",
            DbSubnetGroup {
                description: "Private subnets for the Aurora cluster".to_string(),
                subnet_ids: network.private_subnet_refs(),
            },
            destroy(),
        )?;
        let aurora_cluster = b.add_with(
            "AuroraCluster",
            DbCluster {
                cluster_identifier: format!("logbooklm-{name}-aurora"),
                engine: AURORA_POSTGRES_ENGINE,
                engine_version: AURORA_ENGINE_VERSION.to_string(),
                database_name: DEFAULT_DATABASE_NAME.to_string(),
                master_username: secret_field(&aurora_secret, "username"),
                master_user_password: secret_field(&aurora_secret, "password"),
                subnet_group_name: subnet_group.reference(),
                vpc_security_group_ids: vec![db_security_group.attr("GroupId")],
                storage_encrypted: true,
                kms_key_id: data_key.arn(),
                backup_retention_period: BACKUP_RETENTION_DAYS,
                copy_tags_to_snapshot: true,
                serverless_v2_scaling_configuration: env.aurora_capacity.into(),
            },
            destroy(),
        )?;
        b.add(
            "AuroraClusterSecretAttachment",
            SecretTargetAttachment::cluster(&aurora_secret, &aurora_cluster),
        )?;
        b.add_with(
            "AuroraClusterWriter",
            DbInstance::serverless_writer(&aurora_cluster, &data_key),
            destroy(),
        )?;

        // Workflow
        let workflow_logs = b.add_with(
            "IngestionWorkflowLogs",
            LogGroup::new(
                format!("/aws/vendedlogs/states/logbooklm/{name}"),
                WORKFLOW_LOG_RETENTION_DAYS,
            ),
            destroy(),
        )?;

        let workflow_role = b.add(
            "WorkflowExecutionRole",
            Role::assumed_by(STATES_SERVICE)
                .with_name(format!("logbooklm-{name}-workflow"))
                .with_description("Base execution role for Step Functions ingestion workflow."),
        )?;
        let workflow_policy = attach_policy(
            &mut b,
            &workflow_role,
            vec![
                grants::bucket_read_write(&documents_bucket),
                grants::bucket_read_write(&artifacts_bucket),
                grants::key_encrypt_decrypt(&data_key),
                grants::log_delivery(),
            ],
        )?;

        let ingestion_state_machine = b.add_with(
            "IngestionWorkflow",
            StateMachine::new(
                format!("logbooklm-{name}-ingestion"),
                StateMachineType::Express,
                &workflow_role,
                Definition::starting_with(
                    "StartIngestion",
                    State::pass("Placeholder state until service Lambdas are implemented."),
                ),
                LoggingConfiguration::to_log_group(&workflow_logs, LogLevel::All),
            )?,
            ResourceOptions::new()
                .depends_on(&workflow_policy)
                .depends_on(&workflow_role),
        )?;

        // Compute
        let ingestion_lambda_role = b.add(
            "IngestionLambdaRole",
            Role::assumed_by(LAMBDA_SERVICE)
                .with_name(format!("logbooklm-{name}-ingestion-lambda"))
                .with_description("Shared execution role for ingestion Lambdas.")
                .with_managed_policy(managed_policy_arn(
                    "service-role/AWSLambdaBasicExecutionRole",
                )),
        )?;
        attach_policy(
            &mut b,
            &ingestion_lambda_role,
            vec![
                grants::bucket_read_write(&documents_bucket),
                grants::bucket_read_write(&artifacts_bucket),
                grants::queue_send_messages(&ingestion_queue),
                grants::key_encrypt_decrypt(&data_key),
                grants::state_machine_start_execution(&ingestion_state_machine),
            ],
        )?;

        // Outputs
        b.output("DocumentsBucketName", documents_bucket.reference(), "Documents bucket name")?;
        b.output("ArtifactsBucketName", artifacts_bucket.reference(), "Artifacts bucket name")?;
        b.output("IngestionQueueUrl", ingestion_queue.reference(), "Ingestion queue URL")?;
        b.output(
            "AuroraClusterEndpoint",
            aurora_cluster.attr("Endpoint.Address"),
            "Aurora writer endpoint",
        )?;
        b.output(
            "AuroraClusterSecretArn",
            aurora_secret.reference(),
            "Aurora master credentials secret",
        )?;
        b.output(
            "IngestionStateMachineArn",
            ingestion_state_machine.reference(),
            "Ingestion workflow state machine",
        )?;
        b.output("WorkflowRoleArn", workflow_role.arn(), "Workflow execution role")?;
        b.output(
            "IngestionLambdaRoleArn",
            ingestion_lambda_role.arn(),
            "Ingestion Lambda execution role",
        )?;

        let template = b.build()?;
        tracing::debug!(
            stack = stack_id,
            resources = template.resources.len(),
            "Declared core infrastructure"
        );

        Ok(Self {
            stack_name: stack_id.to_string(),
            environment: env.clone(),
            template,
            data_key,
            documents_bucket,
            artifacts_bucket,
            ingestion_queue,
            dead_letter_queue,
            aurora_cluster,
            aurora_secret,
            ingestion_state_machine,
            workflow_role,
            ingestion_lambda_role,
        })
    }

    /// Builds the stack under its default name, `LogbookLM-<env>`.
    pub fn for_environment(env: &EnvironmentSettings) -> Result<Self> {
        Self::new(&env.stack_name(), env)
    }
}

/// Declares a bucket with its TLS-only policy and auto-delete custom resource.
fn encrypted_bucket(
    b: &mut TemplateBuilder,
    id: &str,
    bucket: Bucket,
    provider: &LogicalId,
    provider_role: &LogicalId,
) -> Result<LogicalId> {
    let bucket = b.add_with(
        id,
        bucket,
        ResourceOptions::new().removal_policy(RemovalPolicy::Delete),
    )?;
    let policy = b.add(
        &format!("{id}Policy"),
        BucketPolicy::tls_only_with_auto_delete(&bucket, provider_role),
    )?;
    b.add_with(
        &format!("{id}AutoDeleteObjects"),
        AutoDeleteObjects::new(provider, &bucket),
        ResourceOptions::new()
            .depends_on(&policy)
            .removal_policy(RemovalPolicy::Delete),
    )?;
    Ok(bucket)
}

/// Gathers grants for a role into one inline policy.
fn attach_policy(
    b: &mut TemplateBuilder,
    role: &LogicalId,
    statements: Vec<PolicyStatement>,
) -> Result<LogicalId> {
    b.add(
        &format!("{role}DefaultPolicy"),
        Policy::for_role(format!("{role}DefaultPolicy"), role.reference(), statements),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environments::{find_environment, resolve_environment, AuroraCapacity};
    use crate::error::SynthError;
    use serde_json::{json, Value};

    fn dev_stack() -> CoreInfrastructureStack {
        let env = resolve_environment(None, None).unwrap();
        CoreInfrastructureStack::for_environment(env).unwrap()
    }

    fn template_json(stack: &CoreInfrastructureStack) -> Value {
        serde_json::to_value(&stack.template).unwrap()
    }

    fn of_type<'a>(json: &'a Value, resource_type: &str) -> Vec<&'a Value> {
        json["Resources"]
            .as_object()
            .unwrap()
            .values()
            .filter(|r| r["Type"] == resource_type)
            .collect()
    }

    #[test]
    fn test_exactly_two_encrypted_versioned_buckets() {
        let json = template_json(&dev_stack());
        let buckets = of_type(&json, "AWS::S3::Bucket");

        assert_eq!(buckets.len(), 2);
        for bucket in buckets {
            let props = &bucket["Properties"];
            assert_eq!(props["VersioningConfiguration"]["Status"], "Enabled");
            assert_eq!(
                props["BucketEncryption"]["ServerSideEncryptionConfiguration"][0]
                    ["ServerSideEncryptionByDefault"]["SSEAlgorithm"],
                "aws:kms"
            );
            assert_eq!(bucket["DeletionPolicy"], "Delete");
        }
        assert_eq!(of_type(&json, "Custom::S3AutoDeleteObjects").len(), 2);
        assert_eq!(of_type(&json, "AWS::Lambda::Function").len(), 1);
    }

    #[test]
    fn test_ingestion_queue_redrive() {
        let json = template_json(&dev_stack());
        let queue = &json["Resources"]["IngestionQueue"]["Properties"];

        assert_eq!(queue["VisibilityTimeout"], 300);
        assert_eq!(queue["RedrivePolicy"]["maxReceiveCount"], 5);
        assert_eq!(queue["QueueName"], "logbooklm-dev-ingestion");

        let dlq = &json["Resources"]["IngestionDeadLetterQueue"]["Properties"];
        assert_eq!(dlq["MessageRetentionPeriod"], 1_209_600);
        assert_eq!(
            queue["RedrivePolicy"]["deadLetterTargetArn"],
            json!({ "Fn::GetAtt": ["IngestionDeadLetterQueue", "Arn"] })
        );
    }

    #[test]
    fn test_serverless_cluster_matches_environment() {
        let json = template_json(&dev_stack());
        let clusters = of_type(&json, "AWS::RDS::DBCluster");
        assert_eq!(clusters.len(), 1);

        let props = &clusters[0]["Properties"];
        assert_eq!(props["StorageEncrypted"], true);
        assert_eq!(props["Engine"], "aurora-postgresql");
        assert_eq!(props["EngineVersion"], "15.3");
        assert_eq!(props["DatabaseName"], "logbooklm");
        assert_eq!(props["BackupRetentionPeriod"], 7);
        assert_eq!(
            props["ServerlessV2ScalingConfiguration"],
            json!({ "MinCapacity": 0.5, "MaxCapacity": 4.0 })
        );

        let instances = of_type(&json, "AWS::RDS::DBInstance");
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0]["Properties"]["DBInstanceClass"], "db.serverless");
        assert_eq!(instances[0]["Properties"]["EnablePerformanceInsights"], true);
    }

    #[test]
    fn test_express_state_machine_logs_everything() {
        let json = template_json(&dev_stack());
        let machines = of_type(&json, "AWS::StepFunctions::StateMachine");
        assert_eq!(machines.len(), 1);

        let props = &machines[0]["Properties"];
        assert_eq!(props["StateMachineType"], "EXPRESS");
        assert_eq!(props["LoggingConfiguration"]["Level"], "ALL");

        let definition: Value =
            serde_json::from_str(props["DefinitionString"].as_str().unwrap()).unwrap();
        assert_eq!(definition["StartAt"], "StartIngestion");
        assert_eq!(definition["States"]["StartIngestion"]["Type"], "Pass");

        let logs = &json["Resources"]["IngestionWorkflowLogs"]["Properties"];
        assert_eq!(logs["RetentionInDays"], 30);
        assert_eq!(logs["LogGroupName"], "/aws/vendedlogs/states/logbooklm/dev");
    }

    #[test]
    fn test_roles_trust_lambda_and_states() {
        let stack = dev_stack();
        let json = template_json(&stack);

        let services: Vec<&str> = of_type(&json, "AWS::IAM::Role")
            .into_iter()
            .filter_map(|r| {
                r["Properties"]["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]
                    ["Service"]
                    .as_str()
            })
            .collect();
        assert!(services.contains(&"lambda.amazonaws.com"));
        assert!(services.contains(&"states.amazonaws.com"));

        let lambda_role = &json["Resources"]["IngestionLambdaRole"]["Properties"];
        assert_eq!(lambda_role["RoleName"], "logbooklm-dev-ingestion-lambda");
        assert_eq!(lambda_role["ManagedPolicyArns"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_lambda_role_grants() {
        let json = template_json(&dev_stack());
        let statements = json["Resources"]["IngestionLambdaRoleDefaultPolicy"]["Properties"]
            ["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap()
            .clone();

        let actions: Vec<String> = statements
            .iter()
            .flat_map(|s| s["Action"].as_array().unwrap().clone())
            .filter_map(|a| a.as_str().map(str::to_string))
            .collect();
        assert!(actions.contains(&"sqs:SendMessage".to_string()));
        assert!(actions.contains(&"states:StartExecution".to_string()));
        assert!(actions.contains(&"kms:GenerateDataKey*".to_string()));
        assert!(actions.contains(&"s3:PutObject".to_string()));
    }

    #[test]
    fn test_key_alias_and_environment_tag() {
        let json = template_json(&dev_stack());

        assert_eq!(
            json["Resources"]["PrimaryDataKeyAlias"]["Properties"]["AliasName"],
            "alias/logbooklm/dev/primary"
        );
        assert_eq!(json["Resources"]["PrimaryDataKey"]["Properties"]["EnableKeyRotation"], true);
        assert_eq!(json["Resources"]["PrimaryDataKey"]["DeletionPolicy"], "Delete");
        assert_eq!(
            json["Resources"]["DocumentsBucket"]["Properties"]["Tags"],
            json!([{ "Key": "Environment", "Value": "dev" }])
        );
        assert_eq!(json["Description"], STACK_DESCRIPTION);
    }

    #[test]
    fn test_network_has_no_nat_gateways() {
        let json = template_json(&dev_stack());
        assert_eq!(of_type(&json, "AWS::EC2::VPC").len(), 1);
        assert_eq!(of_type(&json, "AWS::EC2::Subnet").len(), 6);
        assert!(of_type(&json, "AWS::EC2::NatGateway").is_empty());

        let subnets = &json["Resources"]["AuroraClusterSubnets"]["Properties"]["SubnetIds"];
        assert_eq!(
            subnets,
            &json!([
                { "Ref": "ApplicationVpcPrivateSubnet1" },
                { "Ref": "ApplicationVpcPrivateSubnet2" }
            ])
        );
    }

    #[test]
    fn test_outputs_declared() {
        let stack = dev_stack();
        assert_eq!(stack.stack_name, "LogbookLM-dev");
        for name in [
            "DocumentsBucketName",
            "IngestionQueueUrl",
            "AuroraClusterEndpoint",
            "IngestionStateMachineArn",
            "WorkflowRoleArn",
            "IngestionLambdaRoleArn",
        ] {
            assert!(stack.template.outputs.contains_key(name), "missing output {name}");
        }
    }

    #[test]
    fn test_invalid_capacity_fails_before_synthesis() {
        let mut env = find_environment("dev").unwrap().clone();
        env.aurora_capacity = AuroraCapacity {
            min_capacity: 8.0,
            max_capacity: 2.0,
        };

        let err = CoreInfrastructureStack::for_environment(&env).unwrap_err();
        assert!(matches!(
            err,
            SynthError::InvalidProperty {
                property: "ServerlessV2ScalingConfiguration",
                ..
            }
        ));
    }
}
