//! # mzXML Reader Module
//!
//! Streaming reader for mzXML, the XML interchange format GC-MS instrument
//! software commonly exports. Each `<scan>` is turned into a [`crate::scan::Scan`]
//! with its retention time converted to minutes.
//!
//! ## mzXML Structure
//!
//! ```text
//! mzXML
//! ├── msRun
//! │   ├── parentFile*
//! │   ├── msInstrument
//! │   ├── dataProcessing
//! │   └── scan* (many, possibly nested for MSn)
//! │       └── peaks (base64, interleaved m/z-intensity pairs)
//! └── index (optional)
//! ```

mod binary;
mod error;
mod reader;


pub use binary::{BinaryDecodeError, ByteOrder, Compression, PeaksDecoder, Precision};
pub use error::MzXmlError;
pub use reader::{parse_duration_minutes, MzXmlReader, MzXmlSource, ScanIterator};
