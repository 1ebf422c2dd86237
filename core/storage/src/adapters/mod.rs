//! Provider adapter implementations, one module per provider.
//!
//! The S3-compatible family differs only in endpoint resolution and signing
//! dialect; the vendor blob stores (Azure, Google Cloud, Tencent, Alibaba)
//! go through OpenDAL with presigned-URL read-back; the consumer drives
//! (Dropbox, Google Drive, OneDrive, pCloud) are hand-rolled REST clients.

use std::sync::Arc;

use crate::error::Result;
use crate::provider::StorageAdapter;
use crate::registry::AdapterContext;

pub mod alibaba;
pub mod aws_s3;
pub mod azure;
pub mod backblaze_b2;
pub mod cloudflare;
pub mod do_spaces;
pub mod dropbox;
pub mod exoscale;
pub mod filebase;
pub mod google_cloud;
pub mod google_drive;
pub mod ibm;
pub mod idrive;
pub mod ionos;
pub mod leviia;
pub mod linode;
pub mod onedrive;
pub mod oracle;
pub mod pcloud;
pub mod rackcorp;
pub mod scaleway;
pub mod tencent;
pub mod upcloud;
pub mod vultr;
pub mod wasabi;

/// Every built-in adapter, constructed from the injected context.
pub fn builtin(ctx: &AdapterContext) -> Result<Vec<Arc<dyn StorageAdapter>>> {
    Ok(vec![
        Arc::new(aws_s3::AwsS3Adapter::new(ctx)),
        Arc::new(wasabi::WasabiAdapter::new(ctx)),
        Arc::new(do_spaces::DoSpacesAdapter::new(ctx)),
        Arc::new(filebase::FilebaseAdapter::new(ctx)),
        Arc::new(exoscale::ExoscaleAdapter::new(ctx)),
        Arc::new(backblaze_b2::BackblazeB2Adapter::new(ctx)),
        Arc::new(linode::LinodeAdapter::new(ctx)),
        Arc::new(vultr::VultrAdapter::new(ctx)),
        Arc::new(upcloud::UpCloudAdapter::new(ctx)),
        Arc::new(oracle::OracleAdapter::new(ctx)),
        Arc::new(scaleway::ScalewayAdapter::new(ctx)),
        Arc::new(cloudflare::CloudflareAdapter::new(ctx)),
        Arc::new(leviia::LeviiaAdapter::new(ctx)),
        Arc::new(tencent::TencentAdapter::new(ctx)),
        Arc::new(alibaba::AlibabaAdapter::new(ctx)),
        Arc::new(azure::AzureAdapter::new(ctx)),
        Arc::new(google_cloud::GoogleCloudAdapter::new(ctx)),
        Arc::new(idrive::IDriveAdapter::new(ctx)),
        Arc::new(ionos::IonosAdapter::new(ctx)),
        Arc::new(rackcorp::RackCorpAdapter::new(ctx)),
        Arc::new(ibm::IbmAdapter::new(ctx)),
        Arc::new(dropbox::DropboxAdapter::new(ctx)?),
        Arc::new(google_drive::GoogleDriveAdapter::new(ctx)?),
        Arc::new(onedrive::OneDriveAdapter::new(ctx)?),
        Arc::new(pcloud::PCloudAdapter::new(ctx)),
    ])
}
