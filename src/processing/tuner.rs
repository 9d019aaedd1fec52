//! Processing parameter panel.
//!
//! Holds the operator's transform parameters, freezes them into a
//! [`ProcessingRequest`] on submission, and publishes the result on the
//! [`ProcessedBus`]. At most one request is in flight at a time.

use crate::config::TunerConfig;
use crate::defaults::{self, ParamBounds};
use crate::error::{LitlistenError, Result};
use crate::player::controller::PlaybackController;
use crate::player::decoder::AudioDecoder;
use crate::processing::request::{ProcessingParams, ProcessingRequest, ProcessingType, RequestToken};
use crate::processing::service::ProcessingService;
use crate::processing::sync::{FileProcessed, ProcessedBus, RequestOrigin};
use std::fmt;
use std::str::FromStr;

/// One adjustable tuner field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    PitchFactor,
    AmplificationFactor,
    CompressionThreshold,
    CompressionRatio,
    FilterFrequency,
    FilterBandwidth,
}

impl Param {
    pub const ALL: [Param; 6] = [
        Param::PitchFactor,
        Param::AmplificationFactor,
        Param::CompressionThreshold,
        Param::CompressionRatio,
        Param::FilterFrequency,
        Param::FilterBandwidth,
    ];

    pub fn bounds(&self) -> ParamBounds {
        match self {
            Param::PitchFactor => defaults::PITCH_FACTOR,
            Param::AmplificationFactor => defaults::AMPLIFICATION_FACTOR,
            Param::CompressionThreshold => defaults::COMPRESSION_THRESHOLD,
            Param::CompressionRatio => defaults::COMPRESSION_RATIO,
            Param::FilterFrequency => defaults::FILTER_FREQUENCY,
            Param::FilterBandwidth => defaults::FILTER_BANDWIDTH,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Param::PitchFactor => "pitch",
            Param::AmplificationFactor => "gain",
            Param::CompressionThreshold => "threshold",
            Param::CompressionRatio => "ratio",
            Param::FilterFrequency => "frequency",
            Param::FilterBandwidth => "bandwidth",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Param {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pitch" | "pitch_factor" => Ok(Param::PitchFactor),
            "gain" | "amplification" | "amplification_factor" => Ok(Param::AmplificationFactor),
            "threshold" | "compression_threshold" => Ok(Param::CompressionThreshold),
            "ratio" | "compression_ratio" => Ok(Param::CompressionRatio),
            "frequency" | "freq" | "filter_frequency" => Ok(Param::FilterFrequency),
            "bandwidth" | "width" | "filter_bandwidth" => Ok(Param::FilterBandwidth),
            other => Err(format!("unknown parameter '{}'", other)),
        }
    }
}

/// Point-in-time view of the tuner, for status output.
#[derive(Debug, Clone, PartialEq)]
pub struct TunerSnapshot {
    pub processing_type: ProcessingType,
    pub values: Vec<(Param, f64)>,
    pub in_flight: Option<RequestToken>,
}

pub struct Tuner {
    processing_type: ProcessingType,
    pitch_factor: f64,
    amplification_factor: f64,
    compression_threshold: f64,
    compression_ratio: f64,
    filter_frequency: f64,
    filter_bandwidth: f64,
    next_token: u64,
    in_flight: Option<RequestToken>,
    bus: ProcessedBus,
}

impl Tuner {
    pub fn new(bus: ProcessedBus) -> Self {
        Self::from_config(&TunerConfig::default(), bus)
    }

    pub fn from_config(config: &TunerConfig, bus: ProcessedBus) -> Self {
        let mut tuner = Self {
            processing_type: config.processing_type,
            pitch_factor: defaults::PITCH_FACTOR.default,
            amplification_factor: defaults::AMPLIFICATION_FACTOR.default,
            compression_threshold: defaults::COMPRESSION_THRESHOLD.default,
            compression_ratio: defaults::COMPRESSION_RATIO.default,
            filter_frequency: defaults::FILTER_FREQUENCY.default,
            filter_bandwidth: defaults::FILTER_BANDWIDTH.default,
            next_token: 0,
            in_flight: None,
            bus,
        };
        tuner.set(Param::PitchFactor, config.pitch_factor);
        tuner.set(Param::AmplificationFactor, config.amplification_factor);
        tuner.set(Param::CompressionThreshold, config.compression_threshold);
        tuner.set(Param::CompressionRatio, config.compression_ratio);
        tuner.set(Param::FilterFrequency, config.filter_frequency);
        tuner.set(Param::FilterBandwidth, config.filter_bandwidth);
        tuner
    }

    pub fn bus(&self) -> &ProcessedBus {
        &self.bus
    }

    pub fn processing_type(&self) -> ProcessingType {
        self.processing_type
    }

    pub fn set_processing_type(&mut self, processing_type: ProcessingType) {
        self.processing_type = processing_type;
    }

    pub fn get(&self, param: Param) -> f64 {
        match param {
            Param::PitchFactor => self.pitch_factor,
            Param::AmplificationFactor => self.amplification_factor,
            Param::CompressionThreshold => self.compression_threshold,
            Param::CompressionRatio => self.compression_ratio,
            Param::FilterFrequency => self.filter_frequency,
            Param::FilterBandwidth => self.filter_bandwidth,
        }
    }

    /// Set a parameter, clamped to its bounds. Non-finite input is ignored.
    ///
    /// Returns the stored value.
    pub fn set(&mut self, param: Param, value: f64) -> f64 {
        if value.is_finite() {
            let value = param.bounds().clamp(value);
            match param {
                Param::PitchFactor => self.pitch_factor = value,
                Param::AmplificationFactor => self.amplification_factor = value,
                Param::CompressionThreshold => self.compression_threshold = value,
                Param::CompressionRatio => self.compression_ratio = value,
                Param::FilterFrequency => self.filter_frequency = value,
                Param::FilterBandwidth => self.filter_bandwidth = value,
            }
        }
        self.get(param)
    }

    /// Token of the request currently awaiting a response.
    pub fn in_flight(&self) -> Option<RequestToken> {
        self.in_flight
    }

    pub fn snapshot(&self) -> TunerSnapshot {
        TunerSnapshot {
            processing_type: self.processing_type,
            values: Param::ALL.iter().map(|p| (*p, self.get(*p))).collect(),
            in_flight: self.in_flight,
        }
    }

    /// Parameters for the active processing type.
    pub fn params(&self) -> ProcessingParams {
        match self.processing_type {
            ProcessingType::Pitch => ProcessingParams::Pitch {
                factor: self.pitch_factor,
            },
            ProcessingType::Amplify => ProcessingParams::Amplify {
                factor: self.amplification_factor,
            },
            ProcessingType::Compress => ProcessingParams::Compress {
                threshold_db: self.compression_threshold,
                ratio: self.compression_ratio,
            },
            ProcessingType::Filter => ProcessingParams::Filter {
                frequency_hz: self.filter_frequency,
                bandwidth_hz: self.filter_bandwidth,
            },
            ProcessingType::Denoise => ProcessingParams::Denoise,
        }
    }

    /// Freeze the current fields into a request with a fresh token.
    pub fn build_request(&mut self, source: &str) -> ProcessingRequest {
        self.next_token += 1;
        ProcessingRequest::new(RequestToken(self.next_token), source, self.params())
    }

    /// Start a submission: pause the player, freeze the request, mark it in
    /// flight. The caller sends the request and reports back via [`finish`].
    ///
    /// [`finish`]: Tuner::finish
    pub fn begin<D: AudioDecoder>(
        &mut self,
        controller: &mut PlaybackController<D>,
    ) -> Result<ProcessingRequest> {
        if let Some(token) = self.in_flight {
            return Err(LitlistenError::ProcessingInFlight { token: token.0 });
        }
        let source = controller.source().ok_or(LitlistenError::NoSource)?.to_string();
        let request = self.build_request(&source);
        controller.prepare_for_processing(request.origin());
        self.in_flight = Some(request.token());
        log::info!(
            target: "processing",
            "request {}: {} on {}",
            request.token(),
            request.processing_type(),
            source
        );
        Ok(request)
    }

    /// Resolve the in-flight request.
    ///
    /// On success publishes a [`FileProcessed`] event and returns it. On
    /// failure nothing is published and the error is returned unchanged.
    pub fn finish(&mut self, origin: RequestOrigin, outcome: Result<String>) -> Result<FileProcessed> {
        if self.in_flight != Some(origin.token) {
            return Err(LitlistenError::Other(format!(
                "no processing request {} in flight",
                origin.token
            )));
        }
        self.in_flight = None;
        match outcome {
            Ok(locator) => {
                log::info!(target: "processing", "request {} done: {}", origin.token, locator);
                let event = FileProcessed::for_request(origin, locator);
                self.bus.publish(event.clone());
                Ok(event)
            }
            Err(e) => {
                log::warn!(target: "processing", "request {} failed: {}", origin.token, e);
                Err(e)
            }
        }
    }

    /// Submit in one step: pause, call the backend, publish the result.
    ///
    /// The controller is only told about failures; successful results reach
    /// it through the bus.
    pub async fn submit<D: AudioDecoder>(
        &mut self,
        controller: &mut PlaybackController<D>,
        service: &dyn ProcessingService,
    ) -> Result<FileProcessed> {
        let request = self.begin(controller)?;
        let outcome = service.process(&request).await;
        let result = self.finish(request.origin(), outcome);
        if let Err(e) = &result {
            controller.abandon_processing(request.token(), &e.to_string());
        }
        result
    }
}
