/// Errors that can occur during mzXML parsing
#[derive(Debug, thiserror::Error)]
pub enum MzXmlError {
    /// Error parsing XML
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// Error decoding a peak list
    #[error("Binary decode error: {0}")]
    BinaryError(#[from] super::binary::BinaryDecodeError),

    /// Invalid mzXML document structure
    #[error("Invalid mzXML structure: {0}")]
    InvalidStructure(String),

    /// Required XML attribute is missing
    #[error("Missing required attribute: {0}")]
    MissingAttribute(String),

    /// Invalid value for an XML attribute
    #[error("Invalid attribute value: {0}")]
    InvalidAttributeValue(String),

    /// UTF-8 encoding error in attribute content
    #[error("UTF-8 encoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}
