//! alicloud.dbfs_snapshots

use std::collections::HashMap;

use async_trait::async_trait;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{AlicloudDataSource, Listing, field, list_by_page, scalar_arg};
use crate::client::{Product, Request, RpcClient};
use crate::error::AlicloudResult;

const LISTING: Listing = Listing {
    list_key: "snapshots",
    id_field: "SnapshotId",
    name_field: Some("SnapshotName"),
    status_field: Some("Status"),
};

pub struct DbfsSnapshots;

#[async_trait]
impl AlicloudDataSource for DbfsSnapshots {
    fn name(&self) -> &'static str {
        "dbfs_snapshots"
    }

    fn schema(&self) -> ResourceSchema {
        LISTING.schema(
            self.name(),
            "Snapshots of Database File Systems",
            vec![
                field("snapshot_id", AttributeType::String, "SnapshotId"),
                field("snapshot_name", AttributeType::String, "SnapshotName"),
                field("fs_id", AttributeType::String, "SourceFsId"),
                field("description", AttributeType::String, "Description"),
                field("snapshot_type", AttributeType::String, "SnapshotType"),
                field("progress", AttributeType::String, "Progress"),
                field("retention_days", AttributeType::Int, "RetentionDays"),
                field("source_fs_size", AttributeType::Int, "SourceFsSize"),
                field("created_time", AttributeType::String, "CreatedTime"),
                field("status", AttributeType::String, "Status"),
            ],
            vec![
                AttributeSchema::new("fs_id", AttributeType::String),
                AttributeSchema::new("snapshot_type", types::one_of(&["auto", "user", "all"])),
            ],
        )
    }

    async fn read(
        &self,
        client: &RpcClient,
        args: &HashMap<String, Value>,
    ) -> AlicloudResult<HashMap<String, Value>> {
        let mut request = Request::new();
        for (arg, key) in [("fs_id", "FsId"), ("snapshot_type", "SnapshotType")] {
            if let Some(value) = scalar_arg(args, arg) {
                request.insert(key.to_string(), value);
            }
        }

        let objects =
            list_by_page(client, Product::Dbfs, "ListSnapshot", &request, "$.Snapshots").await?;
        LISTING.finish(&self.schema(), args, objects)
    }
}
