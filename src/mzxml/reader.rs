//! Streaming mzXML parser using quick-xml
//!
//! Pull-based: scans are decoded one at a time as the document is read, so a
//! [`MzXmlReader`] can walk a file without materialising the whole XML tree.
//! Nested `<scan>` elements (MSn children of a survey scan) are flattened in
//! document order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::binary::{ByteOrder, Compression, PeaksDecoder, Precision};
use super::MzXmlError;
use crate::error::SourceError;
use crate::scan::{Run, Scan, ScanSource};

/// Attributes of an open `<scan>` element
#[derive(Debug)]
struct ScanHeader {
    num: u32,
    retention_time: f64,
    peaks_count: Option<usize>,
    emitted: bool,
}

impl ScanHeader {
    fn into_scan(self, mz: Vec<f64>, intensity: Vec<f64>) -> Scan {
        Scan::new(self.num, self.retention_time, mz, intensity)
    }
}

/// Attributes of an open `<peaks>` element and its accumulated text
#[derive(Debug, Default)]
struct PeaksContext {
    precision: Precision,
    byte_order: ByteOrder,
    compression: Compression,
    base64_data: String,
}

/// Streaming parser for mzXML files
pub struct MzXmlReader<R: BufRead> {
    reader: Reader<R>,
    open_scans: Vec<ScanHeader>,
    peaks: Option<PeaksContext>,
    scans_read: u32,
}

impl<R: BufRead> MzXmlReader<R> {
    /// Create a new reader from a BufRead source
    pub fn new(reader: R) -> Self {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);

        Self {
            reader: xml_reader,
            open_scans: Vec::new(),
            peaks: None,
            scans_read: 0,
        }
    }

    /// Read the next scan from the stream
    pub fn next_scan(&mut self) -> Result<Option<Scan>, MzXmlError> {
        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"scan" => {
                        let header = self.parse_scan_header(e)?;
                        self.open_scans.push(header);
                    }
                    b"peaks" => {
                        if !self.open_scans.is_empty() {
                            self.peaks = Some(parse_peaks_attributes(e)?);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                    b"scan" => {
                        let header = self.parse_scan_header(e)?;
                        return Ok(Some(header.into_scan(Vec::new(), Vec::new())));
                    }
                    b"peaks" => {
                        if let Some(scan) = self.finish_peaks(PeaksContext::default())? {
                            return Ok(Some(scan));
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(ref t)) => {
                    if let Some(ref mut ctx) = self.peaks {
                        ctx.base64_data.push_str(&t.unescape()?);
                    }
                }
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"peaks" => {
                        if let Some(ctx) = self.peaks.take() {
                            if let Some(scan) = self.finish_peaks(ctx)? {
                                return Ok(Some(scan));
                            }
                        }
                    }
                    b"scan" => {
                        if let Some(header) = self.open_scans.pop() {
                            if !header.emitted {
                                return Ok(Some(header.into_scan(Vec::new(), Vec::new())));
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => {
                    if !self.open_scans.is_empty() {
                        return Err(MzXmlError::InvalidStructure(
                            "Unexpected EOF in scan".to_string(),
                        ));
                    }
                    return Ok(None);
                }
                Err(e) => return Err(MzXmlError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Read every remaining scan
    pub fn read_all(&mut self) -> Result<Vec<Scan>, MzXmlError> {
        let mut scans = Vec::new();
        while let Some(scan) = self.next_scan()? {
            scans.push(scan);
        }
        Ok(scans)
    }

    /// Iterate over the remaining scans
    pub fn scans(self) -> ScanIterator<R> {
        ScanIterator { reader: self }
    }

    fn parse_scan_header(&mut self, e: &BytesStart) -> Result<ScanHeader, MzXmlError> {
        self.scans_read += 1;

        let num = match get_attribute(e, "num")? {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| MzXmlError::InvalidAttributeValue(format!("num=\"{value}\"")))?,
            None => self.scans_read,
        };

        let retention_time = get_attribute(e, "retentionTime")?
            .ok_or_else(|| MzXmlError::MissingAttribute(format!("retentionTime (scan {num})")))?;
        let retention_time = parse_duration_minutes(&retention_time).ok_or_else(|| {
            MzXmlError::InvalidAttributeValue(format!("retentionTime=\"{retention_time}\""))
        })?;

        let peaks_count = get_attribute(e, "peaksCount")?.and_then(|s| s.trim().parse().ok());

        Ok(ScanHeader {
            num,
            retention_time,
            peaks_count,
            emitted: false,
        })
    }

    /// Decode the peaks of the innermost open scan and mark it emitted.
    fn finish_peaks(&mut self, ctx: PeaksContext) -> Result<Option<Scan>, MzXmlError> {
        let Some(header) = self.open_scans.last_mut() else {
            return Ok(None);
        };
        if header.emitted {
            return Err(MzXmlError::InvalidStructure(format!(
                "scan {} has more than one peaks element",
                header.num
            )));
        }

        let (mz, intensity) = PeaksDecoder::decode(
            &ctx.base64_data,
            ctx.precision,
            ctx.byte_order,
            ctx.compression,
            header.peaks_count,
        )?;
        header.emitted = true;

        Ok(Some(Scan::new(
            header.num,
            header.retention_time,
            mz,
            intensity,
        )))
    }
}

/// Iterator over scans in an mzXML file
pub struct ScanIterator<R: BufRead> {
    reader: MzXmlReader<R>,
}

impl<R: BufRead> Iterator for ScanIterator<R> {
    type Item = Result<Scan, MzXmlError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.next_scan() {
            Ok(Some(scan)) => Some(Ok(scan)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// [`ScanSource`] reading mzXML files from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct MzXmlSource;

impl MzXmlSource {
    /// Read a single mzXML file into a [`Run`]
    pub fn read_file(path: &Path) -> Result<Run, SourceError> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: display.clone(),
            source,
        })?;

        let mut reader = MzXmlReader::new(BufReader::new(file));
        let scans = reader.read_all().map_err(|source| SourceError::MzXml {
            path: display.clone(),
            source,
        })?;
        debug!("Read {} scans from {}", scans.len(), display);

        Ok(Run::new(display, scans))
    }
}

impl ScanSource for MzXmlSource {
    fn load(&self, source: &str) -> Result<Run, SourceError> {
        let mut run = Self::read_file(Path::new(source))?;
        run.source = source.to_string();
        Ok(run)
    }
}

fn parse_peaks_attributes(e: &BytesStart) -> Result<PeaksContext, MzXmlError> {
    let mut ctx = PeaksContext::default();

    if let Some(value) = get_attribute(e, "precision")? {
        ctx.precision = Precision::from_attribute(value.trim())
            .ok_or_else(|| MzXmlError::InvalidAttributeValue(format!("precision=\"{value}\"")))?;
    }
    if let Some(value) = get_attribute(e, "byteOrder")? {
        ctx.byte_order = ByteOrder::from_attribute(value.trim())
            .ok_or_else(|| MzXmlError::InvalidAttributeValue(format!("byteOrder=\"{value}\"")))?;
    }
    if let Some(value) = get_attribute(e, "compressionType")? {
        ctx.compression = Compression::from_attribute(value.trim()).ok_or_else(|| {
            MzXmlError::InvalidAttributeValue(format!("compressionType=\"{value}\""))
        })?;
    }
    for content_attr in ["contentType", "pairOrder"] {
        if let Some(value) = get_attribute(e, content_attr)? {
            if value != "m/z-int" {
                return Err(MzXmlError::InvalidAttributeValue(format!(
                    "{content_attr}=\"{value}\""
                )));
            }
        }
    }

    Ok(ctx)
}

/// Get an attribute value by name
fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, MzXmlError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MzXmlError::XmlError(quick_xml::Error::from(e)))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = std::str::from_utf8(&attr.value)?.to_string();
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Parse an xs:duration retention time (`PT123.4S`, `PT1H2M3S`) into minutes.
///
/// A bare number is read as seconds.
pub fn parse_duration_minutes(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<f64>() {
        return Some(seconds / 60.0);
    }

    let rest = value.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };

    let mut minutes = 0.0;
    let mut seen_component = false;

    let mut number = String::new();
    for c in date_part.chars() {
        match c {
            'D' => {
                minutes += number.parse::<f64>().ok()? * 24.0 * 60.0;
                number.clear();
                seen_component = true;
            }
            c if c.is_ascii_digit() || c == '.' => number.push(c),
            _ => return None,
        }
    }
    if !number.is_empty() {
        return None;
    }

    for c in time_part.chars() {
        let factor = match c {
            'H' => 60.0,
            'M' => 1.0,
            'S' => 1.0 / 60.0,
            c if c.is_ascii_digit() || c == '.' || c == '-' || c == 'e' || c == 'E' => {
                number.push(c);
                continue;
            }
            _ => return None,
        };
        minutes += number.parse::<f64>().ok()? * factor;
        number.clear();
        seen_component = true;
    }
    if !number.is_empty() || !seen_component {
        return None;
    }

    Some(minutes)
}
