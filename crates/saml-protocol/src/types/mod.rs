//! SAML 2.0 types and data structures.
//!
//! This module contains the four protocol messages exchanged during web
//! single sign-on and single logout, the assertions a response carries, and
//! the substructures they share.

mod assertion;
mod authn_request;
mod constants;
mod logout;
mod message;
mod name_id;
mod response;
mod status;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use logout::*;
pub use message::*;
pub use name_id::*;
pub use response::*;
pub use status::*;
