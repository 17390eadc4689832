//! Built-in rule catalog, loosely modeled on well-architected pillars.

use serde_json::json;

use crate::rules::{Category, Rule, RuleStore, Severity};

/// Install the standard catalog into a store.
pub(crate) fn install(store: &mut RuleStore) {
    install_security(store);
    install_reliability(store);
    install_performance(store);
    install_cost(store);
    install_operations(store);
    install_sustainability(store);
}

fn install_security(store: &mut RuleStore) {
    store.add(
        Category::Security,
        Rule::encryption(
            "SEC-001",
            "Encryption at Rest Required",
            vec![
                "server_side_encryption_configuration".to_string(),
                "encrypted".to_string(),
                "encryption".to_string(),
            ],
        )
        .with_description("All storage resources must have encryption at rest enabled")
        .with_severity(Severity::High)
        .with_types(&[
            "aws_s3_bucket",
            "aws_ebs_volume",
            "aws_rds_instance",
            "azurerm_storage_account",
            "google_storage_bucket",
        ])
        .with_recommendation("Enable encryption at rest for all storage resources")
        .with_references(&[
            "https://docs.aws.amazon.com/AmazonS3/latest/userguide/bucket-encryption.html",
            "https://docs.microsoft.com/en-us/azure/storage/common/storage-service-encryption",
        ]),
    );

    store.add(
        Category::Security,
        Rule::network_exposure("SEC-002", "Restrict Inbound Traffic")
            .with_description("Security groups should not allow unrestricted inbound traffic")
            .with_severity(Severity::Critical)
            .with_types(&["aws_security_group", "azurerm_network_security_group"])
            .with_recommendation(
                "Restrict CIDR blocks to specific IP ranges instead of 0.0.0.0/0",
            )
            .with_references(&[
                "https://docs.aws.amazon.com/vpc/latest/userguide/VPC_SecurityGroups.html",
            ]),
    );

    store.add(
        Category::Security,
        Rule::forbidden_attr("SEC-003", "Public Access Blocked", "public_read_write")
            .with_description("Storage buckets should not allow public read/write access")
            .with_severity(Severity::Critical)
            .with_types(&["aws_s3_bucket", "google_storage_bucket"])
            .with_recommendation("Remove public access permissions and use IAM policies instead")
            .with_references(&[
                "https://docs.aws.amazon.com/AmazonS3/latest/userguide/access-control-block-public-access.html",
            ]),
    );

    store.add(
        Category::Security,
        Rule::required_attr("SEC-004", "MFA Delete Required", "mfa_delete")
            .with_description("S3 buckets should have MFA delete enabled for additional security")
            .with_severity(Severity::Medium)
            .with_types(&["aws_s3_bucket"])
            .with_recommendation("Enable MFA delete for S3 buckets containing sensitive data")
            .with_snippet("mfa_delete = true")
            .with_references(&[
                "https://docs.aws.amazon.com/AmazonS3/latest/userguide/MultiFactorAuthenticationDelete.html",
            ]),
    );

    store.add(
        Category::Security,
        Rule::attr_value("SEC-005", "HTTPS Only Access", "protocol", json!("HTTPS"))
            .with_description("Load balancers should redirect HTTP traffic to HTTPS")
            .with_severity(Severity::High)
            .with_types(&["aws_lb_listener", "azurerm_lb_rule"])
            .with_recommendation("Configure load balancer listeners to use HTTPS protocol")
            .with_references(&[
                "https://docs.aws.amazon.com/elasticloadbalancing/latest/application/create-https-listener.html",
            ]),
    );
}

fn install_reliability(store: &mut RuleStore) {
    store.add(
        Category::Reliability,
        Rule::required_attr("REL-001", "Multi-AZ Deployment", "multi_az")
            .with_description(
                "Database instances should be deployed across multiple availability zones",
            )
            .with_severity(Severity::High)
            .with_types(&["aws_rds_instance", "aws_elasticache_cluster"])
            .with_recommendation("Enable multi-AZ deployment for high availability")
            .with_snippet("multi_az = true")
            .with_references(&[
                "https://docs.aws.amazon.com/AmazonRDS/latest/UserGuide/Concepts.MultiAZ.html",
            ]),
    );

    store.add(
        Category::Reliability,
        Rule::required_attr("REL-002", "Backup Configuration", "backup_retention_period")
            .with_description("Database instances must have automated backups enabled")
            .with_severity(Severity::High)
            .with_types(&["aws_rds_instance", "azurerm_sql_database"])
            .with_recommendation("Configure automated backups with appropriate retention period")
            .with_snippet("backup_retention_period = 7")
            .with_references(&[
                "https://docs.aws.amazon.com/AmazonRDS/latest/UserGuide/USER_WorkingWithAutomatedBackups.html",
            ]),
    );

    store.add(
        Category::Reliability,
        Rule::required_attr("REL-003", "Versioning Enabled", "versioning")
            .with_description("Storage buckets should have versioning enabled")
            .with_severity(Severity::Medium)
            .with_types(&["aws_s3_bucket", "google_storage_bucket"])
            .with_recommendation("Enable versioning to protect against accidental deletion")
            .with_snippet("versioning {\n    enabled = true\n  }")
            .with_references(&[
                "https://docs.aws.amazon.com/AmazonS3/latest/userguide/Versioning.html",
            ]),
    );

    store.add(
        Category::Reliability,
        Rule::attr_value("REL-004", "Auto Scaling Configuration", "min_size", json!(2))
            .with_description("Auto scaling groups should have appropriate min/max capacity")
            .with_severity(Severity::Medium)
            .with_types(&["aws_autoscaling_group"])
            .with_recommendation("Set minimum capacity to at least 2 for high availability")
            .with_references(&[
                "https://docs.aws.amazon.com/autoscaling/ec2/userguide/AutoScalingGroup.html",
            ]),
    );
}

fn install_performance(store: &mut RuleStore) {
    // advisory only: there is no single correct instance type to demand
    store.add(
        Category::Performance,
        Rule::best_practice("PERF-001", "Instance Type Optimization")
            .with_description("Use appropriate instance types for workload requirements")
            .with_severity(Severity::Medium)
            .with_types(&["aws_instance", "azurerm_virtual_machine"])
            .with_recommendation(
                "Choose instance types based on CPU, memory, and network requirements",
            )
            .with_references(&[
                "https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/instance-types.html",
            ]),
    );

    store.add(
        Category::Performance,
        Rule::required_attr("PERF-002", "EBS Optimization", "ebs_optimized")
            .with_description("EC2 instances should have EBS optimization enabled")
            .with_severity(Severity::Medium)
            .with_types(&["aws_instance"])
            .with_recommendation("Enable EBS optimization for better storage performance")
            .with_snippet("ebs_optimized = true")
            .with_references(&[
                "https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/ebs-optimized.html",
            ]),
    );

    store.add(
        Category::Performance,
        Rule::attr_value("PERF-003", "Storage Type Optimization", "type", json!("gp3"))
            .with_description("Use appropriate storage types for performance requirements")
            .with_severity(Severity::Low)
            .with_types(&["aws_ebs_volume"])
            .with_recommendation("Use gp3 volumes for better price-performance ratio")
            .with_references(&[
                "https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/ebs-volume-types.html",
            ]),
    );
}

fn install_cost(store: &mut RuleStore) {
    store.add(
        Category::Cost,
        Rule::tagging(
            "COST-001",
            "Cost Allocation Tags",
            vec![
                "Environment".to_string(),
                "Project".to_string(),
                "Owner".to_string(),
                "CostCenter".to_string(),
            ],
        )
        .with_description("Resources must have cost allocation tags for billing tracking")
        .with_severity(Severity::Medium)
        .with_types(&["*"])
        .with_recommendation("Add required tags for cost tracking and allocation")
        .with_references(&[
            "https://docs.aws.amazon.com/awsaccountbilling/latest/aboutv2/cost-alloc-tags.html",
        ]),
    );

    store.add(
        Category::Cost,
        Rule::best_practice("COST-002", "Reserved Instance Usage")
            .with_description("Consider using reserved instances for predictable workloads")
            .with_severity(Severity::Info)
            .with_types(&["aws_instance"])
            .with_recommendation("Evaluate reserved instance options for cost savings")
            .with_references(&[
                "https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/ec2-reserved-instances.html",
            ]),
    );

    store.add(
        Category::Cost,
        Rule::required_attr("COST-003", "Lifecycle Configuration", "lifecycle_configuration")
            .with_description("Storage buckets should have lifecycle policies to manage costs")
            .with_severity(Severity::Medium)
            .with_types(&["aws_s3_bucket"])
            .with_recommendation(
                "Configure lifecycle policies to transition objects to cheaper storage classes",
            )
            .with_references(&[
                "https://docs.aws.amazon.com/AmazonS3/latest/userguide/object-lifecycle-mgmt.html",
            ]),
    );
}

fn install_operations(store: &mut RuleStore) {
    store.add(
        Category::Operations,
        Rule::tagging(
            "OPS-001",
            "Operational Tags",
            vec![
                "Environment".to_string(),
                "Application".to_string(),
                "Owner".to_string(),
                "ManagedBy".to_string(),
            ],
        )
        .with_description("Resources must have operational tags for management")
        .with_severity(Severity::Medium)
        .with_types(&["*"])
        .with_recommendation("Add operational tags for resource management and automation")
        .with_references(&[
            "https://docs.aws.amazon.com/general/latest/gr/aws_tagging.html",
        ]),
    );

    store.add(
        Category::Operations,
        Rule::required_attr("OPS-002", "Monitoring Configuration", "monitoring")
            .with_description("Resources should have monitoring and logging enabled")
            .with_severity(Severity::Medium)
            .with_types(&["aws_instance", "aws_rds_instance", "aws_lb"])
            .with_recommendation("Enable detailed monitoring for operational visibility")
            .with_snippet("monitoring = true")
            .with_references(&[
                "https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/using-cloudwatch.html",
            ]),
    );

    store.add(
        Category::Operations,
        Rule::best_practice("OPS-003", "Resource Naming Convention")
            .with_description("Resources should follow consistent naming conventions")
            .with_severity(Severity::Low)
            .with_types(&["*"])
            .with_recommendation("Use consistent naming patterns for all resources")
            .with_references(&[
                "https://docs.aws.amazon.com/general/latest/gr/aws-arns-and-namespaces.html",
            ]),
    );
}

fn install_sustainability(store: &mut RuleStore) {
    store.add(
        Category::Sustainability,
        Rule::best_practice("SUS-001", "Energy Efficient Instance Types")
            .with_description("Use energy-efficient instance types when possible")
            .with_severity(Severity::Low)
            .with_types(&["aws_instance"])
            .with_recommendation(
                "Consider using Graviton-based instances for better energy efficiency",
            )
            .with_references(&["https://aws.amazon.com/ec2/graviton/"]),
    );

    store.add(
        Category::Sustainability,
        Rule::required_attr("SUS-002", "Auto Scaling for Efficiency", "target_group_arns")
            .with_description("Use auto scaling to optimize resource utilization")
            .with_severity(Severity::Medium)
            .with_types(&["aws_autoscaling_group"])
            .with_recommendation("Implement auto scaling to reduce resource waste")
            .with_references(&[
                "https://docs.aws.amazon.com/autoscaling/ec2/userguide/what-is-amazon-ec2-auto-scaling.html",
            ]),
    );

    store.add(
        Category::Sustainability,
        Rule::best_practice("SUS-003", "Right-Sizing Resources")
            .with_description("Ensure resources are appropriately sized for their workload")
            .with_severity(Severity::Medium)
            .with_types(&["aws_instance", "aws_rds_instance"])
            .with_recommendation("Regularly review and right-size resources to minimize waste")
            .with_references(&[
                "https://docs.aws.amazon.com/cost-management/latest/userguide/ce-rightsizing.html",
            ]),
    );
}
