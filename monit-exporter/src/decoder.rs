//! Decoder for the monit XML status document.
//!
//! Monit serves `_status?format=xml` with a declared charset that is
//! usually ISO-8859-1, not UTF-8, so the raw bytes are transcoded
//! according to the document's own declaration before parsing.

use encoding_rs::{Encoding, UTF_8};
use serde::Deserialize;
use thiserror::Error;

/// Decoding errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid status document: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("Status document is not valid {encoding}")]
    Charset { encoding: &'static str },
}

/// One monitored entity from the status document.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    /// Numeric service type code (`type` attribute).
    pub type_code: i32,
    /// Check name. Not guaranteed unique across types.
    pub name: String,
    /// Raw monit status code; 0 means OK, everything else is opaque.
    pub status: i64,
    /// Monitoring state (0 = off, 1 = on, 2 = initializing).
    pub monitored: i32,
    pub memory: Option<MemoryStats>,
    pub cpu: Option<CpuStats>,
    pub disk_write: Option<DiskWriteStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStats {
    pub percent: f64,
    pub percent_total: f64,
    pub kilobyte: i64,
    pub kilobyte_total: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CpuStats {
    pub percent: f64,
    pub percent_total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskWriteStats {
    pub count: i64,
    pub count_total: i64,
}

/// Wire shape of the `<monit>` root.
#[derive(Debug, Deserialize)]
struct MonitXml {
    #[serde(rename = "service", default)]
    services: Vec<ServiceXml>,
}

#[derive(Debug, Deserialize)]
struct ServiceXml {
    #[serde(rename = "@type", default)]
    service_type: i32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    monitor: i32,
    // Stat blocks sit directly under <service> for process checks.
    memory: Option<MemoryXml>,
    cpu: Option<CpuXml>,
    write: Option<WriteXml>,
    // The type-5 system check nests its stats one level deeper.
    system: Option<SystemXml>,
}

#[derive(Debug, Deserialize)]
struct SystemXml {
    memory: Option<MemoryXml>,
    cpu: Option<CpuXml>,
}

#[derive(Debug, Deserialize)]
struct MemoryXml {
    #[serde(default)]
    percent: f64,
    #[serde(default)]
    percenttotal: f64,
    #[serde(default)]
    kilobyte: i64,
    #[serde(default)]
    kilobytetotal: i64,
}

#[derive(Debug, Deserialize)]
struct CpuXml {
    #[serde(default)]
    percent: f64,
    #[serde(default)]
    percenttotal: f64,
}

#[derive(Debug, Deserialize)]
struct WriteXml {
    bytes: Option<WriteBytesXml>,
}

#[derive(Debug, Deserialize)]
struct WriteBytesXml {
    #[serde(default)]
    count: i64,
    #[serde(default)]
    total: i64,
}

impl From<MemoryXml> for MemoryStats {
    fn from(m: MemoryXml) -> Self {
        Self {
            percent: m.percent,
            percent_total: m.percenttotal,
            kilobyte: m.kilobyte,
            kilobyte_total: m.kilobytetotal,
        }
    }
}

impl From<CpuXml> for CpuStats {
    fn from(c: CpuXml) -> Self {
        Self {
            percent: c.percent,
            percent_total: c.percenttotal,
        }
    }
}

impl ServiceXml {
    fn into_record(self) -> ServiceRecord {
        let (system_memory, system_cpu) = match self.system {
            Some(system) => (system.memory, system.cpu),
            None => (None, None),
        };

        ServiceRecord {
            type_code: self.service_type,
            name: self.name,
            status: self.status,
            monitored: self.monitor,
            memory: self.memory.or(system_memory).map(MemoryStats::from),
            cpu: self.cpu.or(system_cpu).map(CpuStats::from),
            disk_write: self.write.and_then(|w| w.bytes).map(|b| DiskWriteStats {
                count: b.count,
                count_total: b.total,
            }),
        }
    }
}

/// Decode a raw status document into service records.
///
/// Pure and deterministic; invalid input yields an error and no
/// records, never a partial list.
pub fn decode(bytes: &[u8]) -> Result<Vec<ServiceRecord>, DecodeError> {
    let text = transcode(bytes)?;
    let status: MonitXml = quick_xml::de::from_str(&text)?;
    Ok(status.services.into_iter().map(ServiceXml::into_record).collect())
}

/// Transcode the document to UTF-8 per its own charset declaration.
///
/// BOM wins over the declaration; an unknown or absent declaration
/// falls back to UTF-8. Bytes that are invalid in the selected
/// charset are an error, not a silent replacement character.
fn transcode(bytes: &[u8]) -> Result<String, DecodeError> {
    let encoding = Encoding::for_bom(bytes)
        .map(|(enc, _)| enc)
        .or_else(|| declared_encoding(bytes))
        .unwrap_or(UTF_8);

    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError::Charset {
            encoding: actual.name(),
        });
    }
    Ok(text.into_owned())
}

/// Pull the `encoding="..."` label out of the XML declaration, if any.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let prolog_end = bytes.iter().position(|&b| b == b'>')?;
    let prolog = &bytes[..prolog_end];
    if !prolog.starts_with(b"<?xml") {
        return None;
    }

    let prolog = String::from_utf8_lossy(prolog);
    let start = prolog.find("encoding=")? + "encoding=".len();
    let rest = &prolog[start..];
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let label = &rest[1..rest[1..].find(quote)? + 1];
    Encoding::for_label(label.as_bytes())
}
