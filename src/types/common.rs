//! Common enums and data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// URI of the group that delivers server access logs.
pub const LOG_DELIVERY_GROUP_URI: &str = "http://acs.amazonaws.com/groups/s3/LogDelivery";

/// Canned ACL, sent as the `x-amz-acl` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CannedAcl {
    /// Owner gets FULL_CONTROL. No one else has access rights (default).
    #[default]
    Private,
    /// Owner gets FULL_CONTROL. Everyone else gets READ access.
    PublicRead,
    /// Owner gets FULL_CONTROL. Everyone else gets READ and WRITE access.
    PublicReadWrite,
    /// Owner gets FULL_CONTROL. Authenticated users get READ access.
    AuthenticatedRead,
}

impl CannedAcl {
    /// Returns the API string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
        }
    }
}

impl std::fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket or object owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Canonical user ID.
    pub id: String,
    /// Display name.
    pub display_name: Option<String>,
}

/// ACL permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Full control.
    FullControl,
    /// Write access.
    Write,
    /// Permission to write the ACL.
    WriteAcp,
    /// Read access.
    Read,
    /// Permission to read the ACL.
    ReadAcp,
}

impl Permission {
    /// Returns the API string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::FullControl => "FULL_CONTROL",
            Permission::Write => "WRITE",
            Permission::WriteAcp => "WRITE_ACP",
            Permission::Read => "READ",
            Permission::ReadAcp => "READ_ACP",
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_CONTROL" => Ok(Permission::FullControl),
            "WRITE" => Ok(Permission::Write),
            "WRITE_ACP" => Ok(Permission::WriteAcp),
            "READ" => Ok(Permission::Read),
            "READ_ACP" => Ok(Permission::ReadAcp),
            _ => Err(format!("Unknown permission: {}", s)),
        }
    }
}

/// Recipient of an ACL grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grantee {
    /// Account identified by canonical user ID.
    CanonicalUser {
        /// Canonical user ID.
        id: String,
        /// Display name, when known.
        display_name: Option<String>,
    },
    /// Account identified by e-mail address.
    Email {
        /// E-mail address.
        email_address: String,
    },
    /// Predefined group identified by URI.
    Group {
        /// Group URI.
        uri: String,
    },
}

impl Grantee {
    /// The `xsi:type` of this grantee.
    pub fn xsi_type(&self) -> &'static str {
        match self {
            Grantee::CanonicalUser { .. } => "CanonicalUser",
            Grantee::Email { .. } => "AmazonCustomerByEmail",
            Grantee::Group { .. } => "Group",
        }
    }

    /// The log delivery group.
    pub fn log_delivery() -> Self {
        Grantee::Group {
            uri: LOG_DELIVERY_GROUP_URI.to_string(),
        }
    }
}

/// A single ACL grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Grant recipient.
    pub grantee: Grantee,
    /// Granted permission.
    pub permission: Permission,
}

/// Access control policy of a bucket or object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlPolicy {
    /// Resource owner.
    pub owner: Owner,
    /// Grants.
    pub grants: Vec<Grant>,
}

impl AccessControlPolicy {
    /// Whether a grant for `grantee` with `permission` exists.
    pub fn has_grant(&self, grantee: &Grantee, permission: Permission) -> bool {
        self.grants
            .iter()
            .any(|g| &g.grantee == grantee && g.permission == permission)
    }
}

/// Bucket summary from the bucket list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// Creation date.
    pub creation_date: Option<DateTime<Utc>>,
}

/// Object summary from a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key.
    pub name: String,
    /// Last modification time.
    pub time: Option<DateTime<Utc>>,
    /// Size in bytes.
    pub size: u64,
    /// ETag without surrounding quotes.
    pub hash: String,
}

/// Entry of an object listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingEntry {
    /// An object.
    Object(ObjectInfo),
    /// A common prefix rolled up by the delimiter.
    Prefix(String),
}

impl ListingEntry {
    /// Key or prefix this entry is stored under.
    pub fn name(&self) -> &str {
        match self {
            ListingEntry::Object(info) => &info.name,
            ListingEntry::Prefix(prefix) => prefix,
        }
    }

    /// The object summary, if this entry is an object.
    pub fn as_object(&self) -> Option<&ObjectInfo> {
        match self {
            ListingEntry::Object(info) => Some(info),
            ListingEntry::Prefix(_) => None,
        }
    }
}

/// Server access logging target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingTarget {
    /// Bucket receiving the log files.
    pub bucket: String,
    /// Key prefix of the log files. Defaults to `{source bucket}-`.
    pub prefix: Option<String>,
}

impl LoggingTarget {
    /// Create a target with the default prefix.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
        }
    }

    /// Set the log key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Current server access logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingStatus {
    /// Bucket receiving the log files.
    pub target_bucket: String,
    /// Key prefix of the log files.
    pub target_prefix: String,
}

/// CDN distribution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Origin host, `{bucket}.s3.amazonaws.com`.
    pub origin: String,
    /// Unique reference for idempotent creation.
    pub caller_reference: String,
    /// Alternate domain names.
    pub cnames: Vec<String>,
    /// Free-form comment.
    pub comment: String,
    /// Whether the distribution serves requests.
    pub enabled: bool,
}

/// CDN distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    /// Distribution ID.
    pub id: String,
    /// Deployment status (`InProgress` or `Deployed`).
    pub status: String,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Domain name served by the distribution.
    pub domain_name: String,
    /// Current configuration.
    pub config: DistributionConfig,
    /// ETag of the configuration, required for updates and deletes.
    pub hash: Option<String>,
}
