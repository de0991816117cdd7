//! Service implementations.
//!
//! - Buckets: list, list objects, create, delete, location, access logging
//! - Objects: put, get, head, copy, delete
//! - Acl: access control policies
//! - Presign: authenticated URLs and form-upload policies
//! - Distributions: CDN distribution management

mod acl;
mod buckets;
mod distributions;
mod objects;
mod presign;

pub use acl::AclService;
pub use buckets::BucketsService;
pub use distributions::{DistributionsService, CDN_API_VERSION};
pub use objects::ObjectsService;
pub use presign::PresignService;
