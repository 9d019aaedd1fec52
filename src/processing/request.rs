//! Processing request types and their JSON wire form.

use crate::processing::sync::RequestOrigin;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of backend transformation.
///
/// Serialized with the names the backend dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingType {
    #[default]
    Pitch,
    #[serde(rename = "amplification", alias = "amplify")]
    Amplify,
    #[serde(rename = "compression", alias = "compress")]
    Compress,
    Filter,
    Denoise,
}

impl ProcessingType {
    pub const ALL: [ProcessingType; 5] = [
        ProcessingType::Pitch,
        ProcessingType::Amplify,
        ProcessingType::Compress,
        ProcessingType::Filter,
        ProcessingType::Denoise,
    ];

    /// Name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingType::Pitch => "pitch",
            ProcessingType::Amplify => "amplification",
            ProcessingType::Compress => "compression",
            ProcessingType::Filter => "filter",
            ProcessingType::Denoise => "denoise",
        }
    }
}

impl fmt::Display for ProcessingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pitch" => Ok(ProcessingType::Pitch),
            "amplify" | "amplification" | "gain" => Ok(ProcessingType::Amplify),
            "compress" | "compression" => Ok(ProcessingType::Compress),
            "filter" | "bandpass" => Ok(ProcessingType::Filter),
            "denoise" => Ok(ProcessingType::Denoise),
            other => Err(format!(
                "unknown processing type '{}' (expected pitch, amplify, compress, filter or denoise)",
                other
            )),
        }
    }
}

/// Monotonically increasing id of a processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameters relevant to one processing type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessingParams {
    Pitch { factor: f64 },
    Amplify { factor: f64 },
    Compress { threshold_db: f64, ratio: f64 },
    Filter { frequency_hz: f64, bandwidth_hz: f64 },
    Denoise,
}

impl ProcessingParams {
    pub fn processing_type(&self) -> ProcessingType {
        match self {
            ProcessingParams::Pitch { .. } => ProcessingType::Pitch,
            ProcessingParams::Amplify { .. } => ProcessingType::Amplify,
            ProcessingParams::Compress { .. } => ProcessingType::Compress,
            ProcessingParams::Filter { .. } => ProcessingType::Filter,
            ProcessingParams::Denoise => ProcessingType::Denoise,
        }
    }
}

/// A frozen processing job. Built fresh for every submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingRequest {
    token: RequestToken,
    source: String,
    params: ProcessingParams,
}

impl ProcessingRequest {
    pub fn new(token: RequestToken, source: impl Into<String>, params: ProcessingParams) -> Self {
        Self {
            token,
            source: source.into(),
            params,
        }
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn params(&self) -> ProcessingParams {
        self.params
    }

    pub fn processing_type(&self) -> ProcessingType {
        self.params.processing_type()
    }

    /// The context a completion notification must match to be applied.
    pub fn origin(&self) -> RequestOrigin {
        RequestOrigin {
            token: self.token,
            source: self.source.clone(),
        }
    }

    pub fn to_wire(&self) -> WireRequest {
        let mut wire = WireRequest {
            processing_type: self.processing_type(),
            file_path: self.source.clone(),
            pitch_factor: None,
            amplification_factor: None,
            compression_threshold: None,
            compression_ratio: None,
            filter_frequency: None,
            filter_bandwidth: None,
        };
        match self.params {
            ProcessingParams::Pitch { factor } => wire.pitch_factor = Some(factor),
            ProcessingParams::Amplify { factor } => wire.amplification_factor = Some(factor),
            ProcessingParams::Compress {
                threshold_db,
                ratio,
            } => {
                wire.compression_threshold = Some(threshold_db);
                wire.compression_ratio = Some(ratio);
            }
            ProcessingParams::Filter {
                frequency_hz,
                bandwidth_hz,
            } => {
                wire.filter_frequency = Some(frequency_hz);
                wire.filter_bandwidth = Some(bandwidth_hz);
            }
            ProcessingParams::Denoise => {}
        }
        wire
    }
}

/// JSON body of `POST /process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRequest {
    #[serde(rename = "type")]
    pub processing_type: ProcessingType,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplification_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_bandwidth: Option<f64>,
}

/// JSON body of a successful response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireSuccess {
    pub url: String,
}

/// JSON body of a failed response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireFailure {
    pub error: String,
}
