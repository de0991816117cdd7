//! Data types shared by the services.
//!
//! Enums and value types live in `common`; per-operation inputs and outputs
//! in `requests` and `responses`.

mod common;
mod requests;
mod responses;

pub use common::*;
pub use requests::*;
pub use responses::*;
