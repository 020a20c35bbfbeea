//! # Palisade Core
//!
//! Core types shared by every Palisade pipeline stage.
//!
//! This crate provides the foundational types used throughout Palisade:
//!
//! - [`PipelineError`] - Closed error taxonomy (validation, domain, credential, unknown)
//! - [`AppError`] - Domain error carrying an HTTP status and structured details
//! - [`ErrorFormatter`] - Classifies a [`PipelineError`] into a [`NormalizedError`]
//! - [`ValidationError`] - Ordered list of schema validation issues
//! - [`IdentityClaims`] - Decoded claims of a verified credential
//! - [`message`] - Canonical response message literals
//!
//! ## Error Normalization
//!
//! ```
//! use palisade_core::{AppError, DefaultErrorFormatter, ErrorFormatter, PipelineError};
//! use http::StatusCode;
//!
//! let error = PipelineError::from(AppError::new(StatusCode::CONFLICT, "Email taken"));
//! let normalized = DefaultErrorFormatter.format(&error);
//!
//! assert_eq!(normalized.status, StatusCode::CONFLICT);
//! assert_eq!(normalized.message, "Email taken");
//! ```

#![doc(html_root_url = "https://docs.rs/palisade-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod claims;
mod error;
pub mod formatter;
pub mod message;
pub mod validation;

pub use claims::IdentityClaims;
pub use error::{AppError, CredentialError, ErrorKind, PipelineError, PipelineResult};
pub use formatter::{normalize, DefaultErrorFormatter, ErrorFormatter, NormalizedError};
pub use validation::{IssueMap, IssueSummary, PathSegment, ValidationError, ValidationIssue};
