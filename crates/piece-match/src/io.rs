//! JSON configuration, reference libraries and match reports.

use std::fs;
use std::path::Path;

use piece_match_core::{ColorSample, NormRect, RecognizedText, ReferenceDescriptor, ReferenceId};
use piece_match_detect::{MatchParams, PieceCandidate};
use piece_match_reference::{ExtractParams, ExtractionResult, SegmentationStrategy};
use serde::{Deserialize, Serialize};

#[cfg(feature = "image")]
use crate::cpu::CpuBackendParams;

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn read_json<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T, IoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_pretty<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Settings for both pipelines and the CPU backend. Every section is
/// optional and falls back to its defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PieceMatchConfig {
    #[serde(default)]
    pub extract: Option<ExtractParams>,
    #[serde(default)]
    pub matching: Option<MatchParams>,
    #[cfg(feature = "image")]
    #[serde(default)]
    pub cpu: Option<CpuBackendParams>,
}

impl PieceMatchConfig {
    /// Config with every section filled with defaults.
    pub fn with_defaults() -> Self {
        Self {
            extract: Some(ExtractParams::default()),
            matching: Some(MatchParams::default()),
            #[cfg(feature = "image")]
            cpu: Some(CpuBackendParams::default()),
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        read_json(path)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        write_pretty(self, path)
    }

    pub fn extract_params(&self) -> ExtractParams {
        self.extract.clone().unwrap_or_default()
    }

    pub fn match_params(&self) -> MatchParams {
        self.matching.clone().unwrap_or_default()
    }

    #[cfg(feature = "image")]
    pub fn cpu_params(&self) -> CpuBackendParams {
        self.cpu.clone().unwrap_or_default()
    }
}

/// Reference descriptors saved after extraction, ready to be matched
/// against later frames.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceLibrary {
    pub strategy: SegmentationStrategy,
    pub references: Vec<ReferenceDescriptor>,
}

impl ReferenceLibrary {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        read_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        write_pretty(self, path)
    }
}

impl From<ExtractionResult> for ReferenceLibrary {
    fn from(result: ExtractionResult) -> Self {
        Self {
            strategy: result.strategy,
            references: result.descriptors,
        }
    }
}

/// Human-readable outline of one extracted reference.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceSummary {
    pub id: ReferenceId,
    pub source_region: NormRect,
    pub color: ColorSample,
    pub display_color: Option<[u8; 3]>,
    pub compactness: f64,
    pub embeddings: usize,
}

impl From<&ReferenceDescriptor> for ReferenceSummary {
    fn from(d: &ReferenceDescriptor) -> Self {
        Self {
            id: d.id(),
            source_region: d.source_region(),
            color: *d.color(),
            display_color: d.display_color(),
            compactness: d.shape().compactness,
            embeddings: d.embeddings().len(),
        }
    }
}

/// What an extraction run found, without the embeddings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub strategy: SegmentationStrategy,
    /// Search cells in the upright, downsampled photo.
    pub cells: Vec<NormRect>,
    pub references: Vec<ReferenceSummary>,
}

impl ExtractReport {
    pub fn from_result(photo: Option<String>, result: &ExtractionResult) -> Self {
        Self {
            photo,
            strategy: result.strategy,
            cells: result.cells.clone(),
            references: result.descriptors.iter().map(ReferenceSummary::from).collect(),
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        read_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        write_pretty(self, path)
    }
}

/// Recognized text supplied from a file instead of an OCR backend.
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<RecognizedText>, IoError> {
    read_json(path)
}

/// Candidates found in one frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    pub width: usize,
    pub height: usize,
    pub candidates: Vec<PieceCandidate>,
}

impl MatchReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        read_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        write_pretty(self, path)
    }
}
