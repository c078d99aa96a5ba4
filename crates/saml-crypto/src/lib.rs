//! # saml-crypto
//!
//! Key material and signature primitives for SAML message protection, built on aws-lc-rs.
//!
//! SAML deployments still lean on RSA PKCS#1 v1.5 with SHA-256 and, for older
//! identity providers, SHA-1. This crate exposes exactly that surface:
//!
//! - [`PrivateKey`] signs with RSA-SHA256/384/512
//! - [`Certificate`] wraps an X.509 certificate and verifies RSA-SHA1/256/384/512
//! - [`digest`] computes the hashes used by XML-DSig references
//!
//! Key material is always supplied as bytes that the caller has already loaded;
//! nothing here touches the filesystem.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod error;
pub mod hash;
pub mod keys;

pub use algorithm::{DigestAlgorithm, RsaAlgorithm};
pub use error::CryptoError;
pub use hash::{digest, sha1, sha256, sha384, sha512};
pub use keys::{Certificate, PrivateKey};
