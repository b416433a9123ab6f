//! Integration tests for the RPC client, resource lifecycles, service
//! lookups and data source paging against a mocked endpoint

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yunform_core::provider::Provider;
use yunform_core::resource::{Resource, ResourceId, State, Value};
use yunform_core::retry::Backoff;
use yunform_provider_alicloud::client::{Product, Request, RpcClient, WaitSettings};
use yunform_provider_alicloud::{AlicloudConfig, AlicloudError, AlicloudProvider};

fn client(server: &MockServer) -> RpcClient {
    let mut config = AlicloudConfig::new("cn-hangzhou", "AKID", "secret");
    for product in ["vpc", "alb", "cbn", "dbfs", "sgw", "dts"] {
        config = config.with_endpoint(product, server.uri());
    }
    RpcClient::new(config)
        .unwrap()
        .with_backoff(Backoff::Constant(Duration::from_millis(10)))
        .with_wait_settings(WaitSettings {
            delay: Duration::ZERO,
            poll_interval: Duration::from_millis(10),
            gone_checks: 1,
        })
}

fn action(name: &str) -> wiremock::matchers::BodyContainsMatcher {
    body_string_contains(format!("Action={}&", name))
}

mod client_tests {
    use super::*;

    #[tokio::test]
    async fn requests_are_signed_form_posts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(action("DescribeVpcs"))
            .and(body_string_contains("AccessKeyId=AKID"))
            .and(body_string_contains("SignatureMethod=HMAC-SHA1"))
            .and(body_string_contains("SignatureVersion=1.0"))
            .and(body_string_contains("Format=JSON"))
            .and(body_string_contains("RegionId=cn-hangzhou"))
            .and(body_string_contains("Version=2016-04-28"))
            .and(body_string_contains("Signature="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"RequestId": "r-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .do_request(Product::Vpc, "DescribeVpcs", &Request::new())
            .await
            .unwrap();
        assert_eq!(response["RequestId"], "r-1");
    }

    #[tokio::test]
    async fn api_errors_carry_code_and_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("CreateVpc"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "Code": "InvalidCidrBlock.Malformed",
                "Message": "The CIDR block is malformed.",
                "RequestId": "r-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .request_with_retry(
                Product::Vpc,
                "CreateVpc",
                &Request::new(),
                Duration::from_secs(5),
                &["TaskConflict"],
            )
            .await
            .unwrap_err();
        match err {
            AlicloudError::Api {
                code,
                request_id,
                status,
                ..
            } => {
                assert_eq!(code, "InvalidCidrBlock.Malformed");
                assert_eq!(request_id, "r-2");
                assert_eq!(status, 400);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn success_false_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("ListSnapshot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Success": false,
                "Code": "EntityNotExist.DBFS",
                "Message": "not found"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .do_request(Product::Dbfs, "ListSnapshot", &Request::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("EntityNotExist.DBFS"));
    }

    #[tokio::test]
    async fn listed_codes_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("CreateVpc"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"Code": "TaskConflict"})))
            .up_to_n_times(2)
            .with_priority(1)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("CreateVpc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"VpcId": "vpc-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .request_with_retry(
                Product::Vpc,
                "CreateVpc",
                &Request::new(),
                Duration::from_secs(5),
                &["TaskConflict"],
            )
            .await
            .unwrap();
        assert_eq!(response["VpcId"], "vpc-1");
    }
}

mod resource_tests {
    use super::*;

    fn vpc_body(status: &str) -> serde_json::Value {
        json!({
            "TotalCount": 1,
            "Vpcs": {"Vpc": [{
                "VpcId": "vpc-1",
                "VpcName": "main",
                "CidrBlock": "10.0.0.0/8",
                "Status": status,
                "RouterTableIds": {"RouterTableIds": ["vtb-1"]}
            }]}
        })
    }

    #[tokio::test]
    async fn vpc_create_waits_for_available() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("CreateVpc"))
            .and(body_string_contains("CidrBlock=10.0.0.0%2F8"))
            .and(body_string_contains("ClientToken="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"VpcId": "vpc-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeVpcs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vpc_body("Pending")))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeVpcs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vpc_body("Available")))
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let desired = Resource::new("vpc", "main")
            .with_attribute("cidr_block", Value::String("10.0.0.0/8".to_string()))
            .with_attribute("vpc_name", Value::String("main".to_string()))
            .with_attribute("dry_run", Value::Bool(false));

        let state = provider.create(&desired).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("vpc-1"));
        assert_eq!(state.attributes["status"], Value::String("Available".to_string()));
        assert_eq!(state.attributes["route_table_id"], Value::String("vtb-1".to_string()));
        // Not returned by the API; kept from the desired attributes
        assert_eq!(state.attributes["dry_run"], Value::Bool(false));
    }

    #[tokio::test]
    async fn vanished_vpc_reads_as_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("DescribeVpcs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"TotalCount": 0, "Vpcs": {"Vpc": []}})),
            )
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let state = provider
            .read(&ResourceId::new("vpc", "main"), Some("vpc-1"))
            .await
            .unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn vpc_delete_waits_until_gone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("DeleteVpc"))
            .and(body_string_contains("VpcId=vpc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"RequestId": "r"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeVpcs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Vpcs": {"Vpc": []}})))
            .expect(1..)
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let id = ResourceId::new("vpc", "main");
        let state = State::existing(id.clone(), HashMap::new())
            .with_identifier("vpc-1");
        provider.delete(&id, "vpc-1", &state).await.unwrap();
    }

    #[tokio::test]
    async fn missing_rule_is_not_a_delete_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("DeleteRule"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "Code": "ResourceNotFound.Rule",
                "Message": "The specified resource is not found."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let id = ResourceId::new("alb_rule", "web");
        let state = State::existing(id.clone(), HashMap::new());
        provider.delete(&id, "rule-1", &state).await.unwrap();
    }

    #[tokio::test]
    async fn create_errors_name_the_resource() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("CreateStorageBundle"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "Code": "BadRequest",
                "Message": "name taken"
            })))
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let desired = Resource::new("cloud_storage_gateway_storage_bundle", "bundle")
            .with_attribute("storage_bundle_name", Value::String("b".to_string()));
        let err = provider.create(&desired).await.unwrap_err();
        assert_eq!(
            err.resource_id,
            Some(ResourceId::new("cloud_storage_gateway_storage_bundle", "bundle"))
        );
        assert!(err.to_string().contains("BadRequest"));
    }

    fn ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"RequestId": "r"}))
    }

    fn s(value: &str) -> Value {
        Value::String(value.to_string())
    }

    fn without(text: &'static str) -> impl Fn(&wiremock::Request) -> bool + Send + Sync {
        move |request: &wiremock::Request| !String::from_utf8_lossy(&request.body).contains(text)
    }

    fn cen_body(status: &str) -> serde_json::Value {
        json!({
            "TotalCount": 1,
            "Cens": {"Cen": [{
                "CenId": "cen-1",
                "Name": "core",
                "Description": "backbone",
                "ProtectionLevel": "REDUCED",
                "Status": status
            }]}
        })
    }

    #[tokio::test]
    async fn cen_create_waits_for_active_then_tags() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("CreateCen"))
            .and(body_string_contains("&Name=core&"))
            .and(body_string_contains("Description=backbone"))
            .and(body_string_contains("ProtectionLevel=REDUCED"))
            .and(body_string_contains("ClientToken="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"CenId": "cen-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeCens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cen_body("Creating")))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeCens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cen_body("Active")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("TagResources"))
            .and(body_string_contains("ResourceType=cen"))
            .and(body_string_contains("ResourceId.1=cen-1"))
            .and(body_string_contains("Tag.1.Key=env&Tag.1.Value=prod"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("UntagResources"))
            .respond_with(ok())
            .expect(0)
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let desired = Resource::new("cen_instance", "core")
            .with_attribute("cen_instance_name", s("core"))
            .with_attribute("description", s("backbone"))
            .with_attribute("protection_level", s("REDUCED"))
            .with_attribute("tags", Value::Map(HashMap::from([("env".to_string(), s("prod"))])));

        let state = provider.create(&desired).await.unwrap();
        assert_eq!(state.identifier.as_deref(), Some("cen-1"));
        assert_eq!(state.attributes["status"], s("Active"));
        assert_eq!(state.attributes["cen_instance_name"], s("core"));
    }

    #[tokio::test]
    async fn cen_update_retags_and_modifies_attributes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("UntagResources"))
            .and(body_string_contains("ResourceType=cen"))
            .and(body_string_contains("ResourceId.1=cen-1"))
            .and(body_string_contains("TagKey.1=env&TagKey.2=team"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("TagResources"))
            .and(body_string_contains("Tag.1.Key=env&Tag.1.Value=prod"))
            .and(without("Tag.2.Key"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("ModifyCenAttribute"))
            .and(body_string_contains("CenId=cen-1"))
            .and(body_string_contains("&Name=core&"))
            .and(body_string_contains("Description=backbone"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeCens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cen_body("Active")))
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let id = ResourceId::new("cen_instance", "core");
        let from = State::existing(
            id.clone(),
            HashMap::from([
                ("cen_instance_name".to_string(), s("edge")),
                ("description".to_string(), s("backbone")),
                (
                    "tags".to_string(),
                    Value::Map(HashMap::from([
                        ("env".to_string(), s("dev")),
                        ("team".to_string(), s("net")),
                    ])),
                ),
            ]),
        )
        .with_identifier("cen-1");
        let to = Resource::new("cen_instance", "core")
            .with_attribute("cen_instance_name", s("core"))
            .with_attribute("description", s("backbone"))
            .with_attribute("tags", Value::Map(HashMap::from([("env".to_string(), s("prod"))])));

        let state = provider.update(&id, "cen-1", &from, &to).await.unwrap();
        assert_eq!(state.attributes["cen_instance_name"], s("core"));
    }

    #[tokio::test]
    async fn cen_delete_ignores_unknown_instance_and_waits_until_gone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("DeleteCen"))
            .and(body_string_contains("CenId=cen-1"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DeleteCen"))
            .and(body_string_contains("CenId=cen-2"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "Code": "ParameterCenInstanceId",
                "Message": "The specified CEN instance does not exist."
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeCens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Cens": {"Cen": []}})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let id = ResourceId::new("cen_instance", "core");
        let state = State::existing(id.clone(), HashMap::new());
        provider.delete(&id, "cen-1", &state).await.unwrap();
        provider.delete(&id, "cen-2", &state).await.unwrap();
    }

    fn snapshot_body(status: &str) -> serde_json::Value {
        json!({
            "TotalCount": 1,
            "Snapshots": [{
                "SnapshotId": "s-1",
                "SnapshotName": "nightly",
                "SourceFsId": "dbfs-1",
                "RetentionDays": 30,
                "Status": status
            }]
        })
    }

    #[tokio::test]
    async fn dbfs_snapshot_create_waits_for_accomplished() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("CreateSnapshot"))
            .and(body_string_contains("FsId=dbfs-1"))
            .and(body_string_contains("SnapshotName=nightly"))
            .and(body_string_contains("RetentionDays=30"))
            .and(body_string_contains("ClientToken="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"SnapshotId": "s-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("ListSnapshot"))
            .and(body_string_contains("FilterKey=SnapshotId&FilterValue=s-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body("progressing")))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("ListSnapshot"))
            .and(body_string_contains("FilterKey=SnapshotId&FilterValue=s-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body("accomplished")))
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let desired = Resource::new("dbfs_snapshot", "nightly")
            .with_attribute("fs_id", s("dbfs-1"))
            .with_attribute("snapshot_name", s("nightly"))
            .with_attribute("retention_days", Value::Int(30));

        let state = provider.create(&desired).await.unwrap();
        assert_eq!(state.identifier.as_deref(), Some("s-1"));
        assert_eq!(state.attributes["status"], s("accomplished"));
        assert_eq!(state.attributes["fs_id"], s("dbfs-1"));
    }

    #[tokio::test]
    async fn failed_snapshot_fails_the_create() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("CreateSnapshot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"SnapshotId": "s-1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("ListSnapshot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body("failed")))
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let desired = Resource::new("dbfs_snapshot", "nightly").with_attribute("fs_id", s("dbfs-1"));
        let err = provider.create(&desired).await.unwrap_err();
        assert!(err.to_string().contains("unexpected status failed"));
    }

    #[tokio::test]
    async fn dbfs_snapshot_update_sends_only_changed_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("ModifySnapshotAttribute"))
            .and(body_string_contains("SnapshotId=s-1"))
            .and(body_string_contains("Description=weekly%20copy"))
            .and(without("SnapshotName="))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("ListSnapshot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body("accomplished")))
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let id = ResourceId::new("dbfs_snapshot", "nightly");
        let from = State::existing(
            id.clone(),
            HashMap::from([
                ("fs_id".to_string(), s("dbfs-1")),
                ("snapshot_name".to_string(), s("nightly")),
                ("description".to_string(), s("nightly copy")),
            ]),
        )
        .with_identifier("s-1");
        let to = Resource::new("dbfs_snapshot", "nightly")
            .with_attribute("fs_id", s("dbfs-1"))
            .with_attribute("snapshot_name", s("nightly"))
            .with_attribute("description", s("weekly copy"));

        provider.update(&id, "s-1", &from, &to).await.unwrap();
    }

    #[tokio::test]
    async fn dbfs_snapshot_delete_forces_and_waits_until_gone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("DeleteSnapshot"))
            .and(body_string_contains("Force=true"))
            .and(body_string_contains("SnapshotId=s-1"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("ListSnapshot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"TotalCount": 0, "Snapshots": []})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let id = ResourceId::new("dbfs_snapshot", "nightly");
        let state = State::existing(id.clone(), HashMap::from([("force".to_string(), Value::Bool(true))]))
            .with_identifier("s-1");
        provider.delete(&id, "s-1", &state).await.unwrap();
    }

    fn bundle_body(name: &str) -> serde_json::Value {
        json!({
            "Success": true,
            "StorageBundleId": "sb-1",
            "StorageBundleName": name,
            "Description": "backups",
            "Location": "cn-hangzhou"
        })
    }

    #[tokio::test]
    async fn storage_bundle_lifecycle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("CreateStorageBundle"))
            .and(body_string_contains("StorageBundleName=bundle"))
            .and(body_string_contains("Location=cn-hangzhou"))
            .and(body_string_contains("BackendBucketRegionId=cn-hangzhou"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"StorageBundleId": "sb-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("UpdateStorageBundle"))
            .and(body_string_contains("StorageBundleId=sb-1"))
            .and(body_string_contains("StorageBundleName=renamed"))
            .and(body_string_contains("Description=backups"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeStorageBundle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bundle_body("bundle")))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeStorageBundle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bundle_body("renamed")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DeleteStorageBundle"))
            .and(body_string_contains("StorageBundleId=sb-1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "Code": "StorageBundleNotExist",
                "Message": "The specified storage bundle does not exist."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let desired = Resource::new("cloud_storage_gateway_storage_bundle", "bundle")
            .with_attribute("storage_bundle_name", s("bundle"))
            .with_attribute("description", s("backups"));
        let created = provider.create(&desired).await.unwrap();
        assert_eq!(created.identifier.as_deref(), Some("sb-1"));
        assert_eq!(created.attributes["location"], s("cn-hangzhou"));

        let id = desired.id.clone();
        let to = Resource::new("cloud_storage_gateway_storage_bundle", "bundle")
            .with_attribute("storage_bundle_name", s("renamed"))
            .with_attribute("description", s("backups"));
        let updated = provider.update(&id, "sb-1", &created, &to).await.unwrap();
        assert_eq!(updated.attributes["storage_bundle_name"], s("renamed"));

        // Already gone on the platform side
        provider.delete(&id, "sb-1", &updated).await.unwrap();
    }

    fn dts_body(status: &str) -> serde_json::Value {
        json!({
            "DtsInstanceID": "dtsi-1",
            "DtsJobId": "job-1",
            "DtsJobName": "orders",
            "Status": status,
            "DbObject": "{\"orders\":{\"name\":\"orders\"}}",
            "MigrationMode": {
                "StructureInitialization": true,
                "DataInitialization": true,
                "DataSynchronization": true
            },
            "SourceEndpoint": {"InstanceType": "RDS", "InstanceID": "rm-1", "UserName": "repl"},
            "DestinationEndpoint": {"InstanceType": "RDS", "InstanceID": "rm-2", "UserName": "sink"}
        })
    }

    fn detail_mock(status: &str) -> Mock {
        Mock::given(method("POST"))
            .and(action("DescribeDtsJobDetail"))
            .and(body_string_contains("DtsInstanceID=dtsi-1"))
            .and(body_string_contains("SynchronizationDirection=Forward"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dts_body(status)))
    }

    #[tokio::test]
    async fn dts_job_is_configured_then_deleted_by_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("ConfigureDtsJob"))
            .and(body_string_contains("DtsInstanceId=dtsi-1"))
            .and(body_string_contains("DtsJobName=orders"))
            .and(body_string_contains("JobType=SYNC"))
            .and(body_string_contains("DataSynchronization=true"))
            .and(body_string_contains("SourceEndpointInstanceType=RDS"))
            .and(body_string_contains("SourceEndpointPassword=secret"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        detail_mock("Initializing")
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        detail_mock("Synchronizing").mount(&server).await;
        Mock::given(method("POST"))
            .and(action("SuspendDtsJob"))
            .respond_with(ok())
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DeleteDtsJob"))
            .and(body_string_contains("DtsJobId=job-1"))
            .and(body_string_contains("DtsInstanceId=dtsi-1"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let desired = Resource::new("dts_synchronization_job", "orders")
            .with_attribute("dts_instance_id", s("dtsi-1"))
            .with_attribute("dts_job_name", s("orders"))
            .with_attribute("db_list", s("{\"orders\":{\"name\":\"orders\"}}"))
            .with_attribute("structure_initialization", Value::Bool(true))
            .with_attribute("data_initialization", Value::Bool(true))
            .with_attribute("data_synchronization", Value::Bool(true))
            .with_attribute("source_endpoint_instance_type", s("RDS"))
            .with_attribute("source_endpoint_password", s("secret"))
            .with_attribute("destination_endpoint_instance_type", s("RDS"));

        let state = provider.create(&desired).await.unwrap();
        assert_eq!(state.identifier.as_deref(), Some("dtsi-1"));
        assert_eq!(state.attributes["status"], s("Synchronizing"));
        assert_eq!(state.attributes["destination_endpoint_instance_id"], s("rm-2"));
        // Never returned by the detail call
        assert_eq!(state.attributes["source_endpoint_password"], s("secret"));

        let id = desired.id.clone();
        provider.delete(&id, "dtsi-1", &state).await.unwrap();
    }

    #[tokio::test]
    async fn dts_update_renames_rotates_credentials_upgrades_and_suspends() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("ModifyDtsJobName"))
            .and(body_string_contains("DtsJobId=job-1"))
            .and(body_string_contains("DtsJobName=orders-v2"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("ModifyDtsJobPassword"))
            .and(body_string_contains("DtsJobId=job-1"))
            .and(body_string_contains("Endpoint=Src"))
            .and(body_string_contains("Password=rotated"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("ModifyDtsJobPassword"))
            .and(body_string_contains("DtsJobId=job-1"))
            .and(body_string_contains("Endpoint=Dest"))
            .and(body_string_contains("UserName=writer"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("TransferInstanceClass"))
            .and(body_string_contains("DtsJobId=job-1"))
            .and(body_string_contains("InstanceClass=medium"))
            .and(body_string_contains("OrderType=UPGRADE"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("SuspendDtsJob"))
            .and(body_string_contains("DtsJobId=job-1"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("StartDtsJob"))
            .respond_with(ok())
            .expect(0)
            .mount(&server)
            .await;
        // Job id lookup and the post-upgrade wait see a running job
        detail_mock("Synchronizing")
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        detail_mock("Suspending").mount(&server).await;

        let provider = AlicloudProvider::with_client(client(&server));
        let id = ResourceId::new("dts_synchronization_job", "orders");
        let from = State::existing(
            id.clone(),
            HashMap::from([
                ("dts_instance_id".to_string(), s("dtsi-1")),
                ("dts_job_name".to_string(), s("orders")),
                ("instance_class".to_string(), s("small")),
                ("status".to_string(), s("Synchronizing")),
                ("source_endpoint_password".to_string(), s("secret")),
                ("destination_endpoint_user_name".to_string(), s("sink")),
            ]),
        )
        .with_identifier("dtsi-1");
        let to = Resource::new("dts_synchronization_job", "orders")
            .with_attribute("dts_instance_id", s("dtsi-1"))
            .with_attribute("dts_job_name", s("orders-v2"))
            .with_attribute("instance_class", s("medium"))
            .with_attribute("status", s("Suspending"))
            .with_attribute("source_endpoint_password", s("rotated"))
            .with_attribute("destination_endpoint_user_name", s("writer"));

        let state = provider.update(&id, "dtsi-1", &from, &to).await.unwrap();
        assert_eq!(state.attributes["status"], s("Suspending"));
    }

    #[tokio::test]
    async fn dts_resume_starts_the_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("StartDtsJob"))
            .and(body_string_contains("DtsJobId=job-1"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        detail_mock("Suspending")
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        detail_mock("Synchronizing").mount(&server).await;

        let provider = AlicloudProvider::with_client(client(&server));
        let id = ResourceId::new("dts_synchronization_job", "orders");
        let from = State::existing(id.clone(), HashMap::from([("status".to_string(), s("Suspending"))]))
            .with_identifier("dtsi-1");
        let to = Resource::new("dts_synchronization_job", "orders").with_attribute("status", s("Synchronizing"));

        let state = provider.update(&id, "dtsi-1", &from, &to).await.unwrap();
        assert_eq!(state.attributes["status"], s("Synchronizing"));
    }

    fn listener_body(status: &str) -> serde_json::Value {
        json!({
            "ListenerId": "lsn-1",
            "LoadBalancerId": "alb-1",
            "ListenerPort": 80,
            "ListenerProtocol": "HTTP",
            "ListenerStatus": status
        })
    }

    #[tokio::test]
    async fn listener_created_stopped_is_stopped_after_running() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("CreateListener"))
            .and(body_string_contains("LoadBalancerId=alb-1"))
            .and(body_string_contains("ListenerPort=80"))
            .and(body_string_contains("ListenerProtocol=HTTP"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ListenerId": "lsn-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("GetListenerAttribute"))
            .and(body_string_contains("ListenerId=lsn-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listener_body("Running")))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("GetListenerAttribute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listener_body("Stopped")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("StopListener"))
            .and(body_string_contains("ListenerId=lsn-1"))
            .and(body_string_contains("ClientToken="))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("StartListener"))
            .respond_with(ok())
            .expect(0)
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let desired = Resource::new("alb_listener", "http")
            .with_attribute("load_balancer_id", s("alb-1"))
            .with_attribute("listener_port", Value::Int(80))
            .with_attribute("listener_protocol", s("HTTP"))
            .with_attribute("status", s("Stopped"));

        let state = provider.create(&desired).await.unwrap();
        assert_eq!(state.identifier.as_deref(), Some("lsn-1"));
        assert_eq!(state.attributes["status"], s("Stopped"));
    }
}

mod data_source_tests {
    use super::*;

    fn vswitch(i: usize) -> serde_json::Value {
        json!({
            "VSwitchId": format!("vsw-{}", i),
            "VSwitchName": if i % 2 == 0 { format!("prod-{}", i) } else { format!("dev-{}", i) },
            "VpcId": "vpc-1",
            "ZoneId": "cn-hangzhou-h",
            "CidrBlock": format!("10.0.{}.0/24", i),
            "Status": "Available",
            "AvailableIpAddressCount": 252
        })
    }

    #[tokio::test]
    async fn page_numbers_are_followed_until_a_short_page() {
        let server = MockServer::start().await;
        let first: Vec<_> = (0..50).map(vswitch).collect();
        Mock::given(method("POST"))
            .and(action("DescribeVSwitches"))
            .and(body_string_contains("PageNumber=1&"))
            .and(body_string_contains("VpcId=vpc-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"VSwitches": {"VSwitch": first}})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeVSwitches"))
            .and(body_string_contains("PageNumber=2&"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"VSwitches": {"VSwitch": [vswitch(50)]}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let query = Resource::new("vswitches", "prod")
            .with_read_only(true)
            .with_attribute("vpc_id", Value::String("vpc-1".to_string()))
            .with_attribute("name_regex", Value::String("^prod-".to_string()));
        let state = provider.read_data_source(&query).await.unwrap();

        let ids = state.attributes["ids"].as_list().unwrap();
        assert_eq!(ids.len(), 26);
        assert_eq!(state.attributes["names"].as_list().unwrap().len(), 26);
        let vswitches = state.attributes["vswitches"].as_list().unwrap();
        let last = vswitches.last().unwrap().as_map().unwrap();
        assert_eq!(last["id"], Value::String("vsw-50".to_string()));
        assert_eq!(last["available_ip_address_count"], Value::Int(252));
        assert!(state.identifier.is_some());
    }

    #[tokio::test]
    async fn next_tokens_are_followed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("ListRules"))
            .and(body_string_contains("NextToken=t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Rules": [{"RuleId": "rule-2", "RuleName": "api", "RuleStatus": "Available", "Priority": 2}],
                "NextToken": ""
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("ListRules"))
            .and(body_string_contains("ListenerIds.1=lsn-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Rules": [{"RuleId": "rule-1", "RuleName": "web", "RuleStatus": "Provisioning", "Priority": 1}],
                "NextToken": "t-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AlicloudProvider::with_client(client(&server));
        let query = Resource::new("alb_rules", "all")
            .with_read_only(true)
            .with_attribute(
                "listener_ids",
                Value::List(vec![Value::String("lsn-1".to_string())]),
            )
            .with_attribute("status", Value::String("Available".to_string()));
        let state = provider.read_data_source(&query).await.unwrap();

        assert_eq!(
            state.attributes["ids"],
            Value::List(vec![Value::String("rule-2".to_string())])
        );
        let rules = state.attributes["rules"].as_list().unwrap();
        assert_eq!(rules[0].as_map().unwrap()["priority"], Value::Int(2));
    }
}

mod service_tests {
    use super::*;
    use yunform_provider_alicloud::error::not_found_error;
    use yunform_provider_alicloud::service::{alb, cbn, dbfs, dts, sgw, vpc};

    fn body(value: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(value)
    }

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn alb_rule_is_listed_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("ListRules"))
            .and(body_string_contains("MaxResults=100"))
            .and(body_string_contains("RuleIds.1=rule-1"))
            .respond_with(body(json!({"Rules": [{"RuleId": "rule-1", "RuleStatus": "Available"}]})))
            .expect(1)
            .mount(&server)
            .await;

        let (object, status) = alb::alb_rule_state_refresh(&client(&server), "rule-1", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(object["RuleId"], "rule-1");
        assert_eq!(status, "Available");
    }

    #[tokio::test]
    async fn missing_alb_listener_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("GetListenerAttribute"))
            .and(body_string_contains("ListenerId=lsn-9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "Code": "ResourceNotFound.Listener",
                "Message": "The specified resource is not found."
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = alb::describe_alb_listener(&client(&server), "lsn-9").await.unwrap_err();
        assert!(matches!(err, AlicloudError::NotFound { .. }));
        let gone = alb::alb_listener_state_refresh(&client(&server), "lsn-9", &[]).await;
        assert!(gone.unwrap().is_none());
    }

    #[tokio::test]
    async fn cen_lookup_filters_by_id_with_region() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("DescribeCens"))
            .and(body_string_contains("Filter.1.Key=CenId"))
            .and(body_string_contains("Filter.1.Value.1=cen-1"))
            .and(body_string_contains("RegionId=cn-hangzhou"))
            .and(body_string_contains("Version=2017-09-12"))
            .respond_with(body(json!({"Cens": {"Cen": [{"CenId": "cen-1", "Status": "Active"}]}})))
            .expect(1)
            .mount(&server)
            .await;

        let object = cbn::describe_cen_instance(&client(&server), "cen-1").await.unwrap();
        assert_eq!(object["Status"], "Active");
    }

    #[tokio::test]
    async fn cen_tags_use_untag_resources() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("UntagResources"))
            .and(body_string_contains("ResourceId.1=cen-1&ResourceType=cen"))
            .and(body_string_contains("TagKey.1=owner"))
            .respond_with(body(json!({"RequestId": "r"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("TagResources"))
            .and(body_string_contains("ResourceId.1=cen-1&ResourceType=cen"))
            .and(body_string_contains("Tag.1.Key=env&Tag.1.Value=prod"))
            .respond_with(body(json!({"RequestId": "r"})))
            .expect(1)
            .mount(&server)
            .await;

        let old = tags(&[("owner", "me"), ("acs:system", "x")]);
        let new = tags(&[("env", "prod"), ("acs:system", "x")]);
        cbn::set_resource_tags(&client(&server), "cen-1", Some(&old), Some(&new))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unchanged_tags_make_no_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(body(json!({"RequestId": "r"})))
            .expect(0)
            .mount(&server)
            .await;

        let same = tags(&[("env", "prod")]);
        vpc::set_resource_tags(&client(&server), "VPC", "vpc-1", Some(&same), Some(&same))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dbfs_snapshot_lookup_filters_by_snapshot_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("ListSnapshot"))
            .and(body_string_contains("FilterKey=SnapshotId&FilterValue=s-1"))
            .and(body_string_contains("PageNumber=1&PageSize=100"))
            .respond_with(body(json!({"Snapshots": [{"SnapshotId": "s-1", "Status": "progressing"}]})))
            .expect(1)
            .mount(&server)
            .await;

        let (_, status) = dbfs::dbfs_snapshot_state_refresh(&client(&server), "s-1", &["failed"])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status, "progressing");
    }

    #[tokio::test]
    async fn dts_detail_must_match_the_instance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("DescribeDtsJobDetail"))
            .and(body_string_contains("DtsInstanceID=dtsi-1"))
            .and(body_string_contains("SynchronizationDirection=Forward"))
            .respond_with(body(json!({"DtsInstanceID": "dtsi-2", "Status": "Synchronizing"})))
            .expect(1)
            .mount(&server)
            .await;

        let err = dts::describe_dts_synchronization_job(&client(&server), "dtsi-1")
            .await
            .unwrap_err();
        assert!(not_found_error(&err));
    }

    #[tokio::test]
    async fn dts_fail_states_stop_the_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("DescribeDtsJobDetail"))
            .respond_with(body(json!({"DtsInstanceID": "dtsi-1", "Status": "InitializeFailed"})))
            .mount(&server)
            .await;

        let result = dts::dts_synchronization_job_state_refresh(
            &client(&server),
            "dtsi-1",
            &["Failed", "InitializeFailed"],
        )
        .await;
        assert!(matches!(result, Err(AlicloudError::UnexpectedStatus { .. })));
    }

    #[tokio::test]
    async fn storage_bundle_errors_in_a_success_body_are_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("DescribeStorageBundle"))
            .and(body_string_contains("StorageBundleId=sb-9"))
            .respond_with(body(json!({
                "Success": false,
                "Code": "StorageBundleNotExist",
                "Message": "The specified storage bundle does not exist."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = sgw::describe_storage_bundle(&client(&server), "sb-9").await.unwrap_err();
        assert!(not_found_error(&err));
    }

    #[tokio::test]
    async fn vpc_and_vswitch_lookups() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("DescribeVpcs"))
            .and(body_string_contains("VpcId=vpc-1"))
            .respond_with(body(json!({"Vpcs": {"Vpc": [{"VpcId": "vpc-1", "Status": "Available"}]}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("DescribeVSwitchAttributes"))
            .and(body_string_contains("VSwitchId=vsw-1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "Code": "InvalidVSwitchId.NotFound",
                "Message": "The specified vswitch is not found."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&server);
        let (_, status) = vpc::vpc_state_refresh(&c, "vpc-1", &[]).await.unwrap().unwrap();
        assert_eq!(status, "Available");
        assert!(vpc::vswitch_state_refresh(&c, "vsw-1", &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn vpc_tags_are_listed_across_tokens_and_untagged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(action("ListTagResources"))
            .and(body_string_contains("NextToken=t-1"))
            .respond_with(body(json!({
                "TagResources": {"TagResource": [{"TagKey": "team", "TagValue": "net"}]}
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("ListTagResources"))
            .and(body_string_contains("ResourceId.1=vpc-1&ResourceType=VPC"))
            .respond_with(body(json!({
                "TagResources": {"TagResource": [{"TagKey": "env", "TagValue": "dev"}]},
                "NextToken": "t-1"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(action("UnTagResources"))
            .and(body_string_contains("ResourceId.1=vpc-1&ResourceType=VPC"))
            .and(body_string_contains("TagKey.1=team"))
            .respond_with(body(json!({"RequestId": "r"})))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&server);
        let current = vpc::list_tag_resources(&c, "vpc-1", "VPC").await.unwrap();
        assert_eq!(current, tags(&[("env", "dev"), ("team", "net")]));

        let kept = tags(&[("env", "dev")]);
        vpc::set_resource_tags(&c, "VPC", "vpc-1", Some(&current), Some(&kept))
            .await
            .unwrap();
    }
}
