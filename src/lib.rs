//! `mailpreview`: image attachment preview requests for mail clients.
//!
//! This crate provides the request type a decode task consumes, the
//! resolver seams it resolves through, and two bundled resolvers
//! (in-memory and directory-backed).

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod request;

pub use error::{PreviewError, Result};
pub use request::{DecodeRequest, ImageAttachmentRequest, Resolution};
