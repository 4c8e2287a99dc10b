//! Crate-level error types.
//!
//! Stage-specific errors live next to their stage ([`crate::alignment::BaselineError`],
//! [`crate::output::OutputError`]); the types here cover loading runs and the
//! batch pipeline that strings the stages together.

/// Errors raised while loading a chromatogram through a [`crate::scan::ScanSource`]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The file could not be opened or read
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path of the offending file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not a well-formed mzXML document
    #[cfg(feature = "mzxml")]
    #[error("Malformed mzXML file {path}: {source}")]
    MzXml {
        /// Path of the offending file
        path: String,
        /// Underlying parser error
        #[source]
        source: crate::mzxml::MzXmlError,
    },

    /// The source does not know the requested chromatogram
    #[error("Unknown chromatogram: {0}")]
    UnknownRun(String),
}

/// Errors that abort a detection or alignment batch
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A chromatogram could not be loaded
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The reference file has no rows in the peak table
    #[error("Reference file {0} is not present in the peak table")]
    ReferenceMissing(String),

    /// A baseline could not be computed from its blank run
    #[error("Baseline from {path} failed: {source}")]
    Baseline {
        /// Blank run the baseline was computed from
        path: String,
        /// Underlying baseline error
        #[source]
        source: crate::alignment::BaselineError,
    },

    /// Parameters were rejected before any work started
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}
