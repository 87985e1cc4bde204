//! # docstamp-pdf — PDF Marker Stamping
//!
//! [`PdfStamper`] draws a line of text at the top of the first page of a
//! PDF. The input bytes are never modified: the stamper parses them,
//! appends a content stream to the first page and serializes a complete
//! new document. Callers only see output once serialization succeeded.

pub mod error;
pub mod stamp;

pub use error::StampError;
pub use stamp::PdfStamper;
