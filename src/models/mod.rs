//! Records of the relational store. Reverse collections (a user's maintained
//! bases, a base's requests, ...) are queries keyed by the foreign key.

mod package_base;
mod package_keyword;
mod package_request;
mod request_type;
mod session;
mod user;

pub use package_base::{BaseRole, NewPackageBase, PackageBase};
pub use package_keyword::PackageKeyword;
pub use package_request::{NewPackageRequest, PackageRequest, RequestStatus};
pub use request_type::{RequestType, DELETION_ID, MERGE_ID, ORPHAN_ID};
pub use session::Session;
pub use user::{AccountType, NewUser, User};
