//! One user's working set: the chosen images and the latest analysis.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone, Utc};
use moments_core::limits::{CLIENT_MIN_IMAGES, MAX_IMAGES};
use moments_core::{build_report_markdown, AnalysisEnvelope, AnalysisReport};
use serde_json::Value;

use crate::client::{ClientError, GatewayClient};
use crate::compress::{compress_image, default_target_bytes, CompressedImage, CompressionSettings, ImageEncoder};
use crate::export::{write_report, ExportError};
use crate::upload::{AddOutcome, ImageAsset, ImageCollection};

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub min_images: usize,
    pub max_images: usize,
    pub target_bytes: usize,
    pub compression: CompressionSettings,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            min_images: CLIENT_MIN_IMAGES,
            max_images: MAX_IMAGES,
            target_bytes: default_target_bytes(),
            compression: CompressionSettings::default(),
        }
    }
}

impl AnalyzeOptions {
    /// Per-image budget in KB; absurd values saturate instead of wrapping.
    pub fn with_target_kb(mut self, kb: usize) -> Self {
        self.target_bytes = kb.saturating_mul(1024);
        self
    }
}

/// What a successful gateway response turned into.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Structured {
        report: AnalysisReport,
        data: Value,
        raw: String,
    },
    /// Only the model's narrative text was usable.
    Narrative(String),
}

impl AnalysisOutcome {
    pub const NARRATIVE_NOTICE: &'static str = "已展示模型原始文本结果";

    pub fn from_envelope(envelope: AnalysisEnvelope) -> Result<Self, ClientError> {
        match envelope.data {
            Some(data) if is_present(&data) => Ok(Self::Structured {
                report: AnalysisReport::from_value(&data),
                data,
                raw: envelope.raw,
            }),
            _ if !envelope.raw.trim().is_empty() => Ok(Self::Narrative(envelope.raw)),
            _ => Err(ClientError::MalformedResult),
        }
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            Self::Structured { report, .. } => Some(report),
            Self::Narrative(_) => None,
        }
    }

    pub fn narrative(&self) -> Option<&str> {
        match self {
            Self::Structured { .. } => None,
            Self::Narrative(text) => Some(text),
        }
    }

    /// The report with its generation time shown as wall-clock time in the
    /// zone of `generated_at`.
    pub fn to_markdown<Tz: TimeZone>(&self, generated_at: &DateTime<Tz>) -> String {
        build_report_markdown(self.report(), self.narrative(), generated_at.naive_local())
    }

    /// The envelope form, suitable for saving and rendering later.
    pub fn to_envelope(&self) -> AnalysisEnvelope {
        match self {
            Self::Structured { data, raw, .. } => AnalysisEnvelope::success(raw.clone(), Some(data.clone())),
            Self::Narrative(text) => AnalysisEnvelope::success(text.clone(), None),
        }
    }
}

/// Mirrors a truthiness check: null, false, zero and empty strings are absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Default)]
pub struct AnalysisSession {
    images: ImageCollection,
    outcome: Option<AnalysisOutcome>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds files; any previous result is discarded once something is added.
    pub fn add_paths<P: AsRef<Path>>(&mut self, paths: impl IntoIterator<Item = P>) -> AddOutcome {
        let outcome = self.images.add_paths(paths);
        if outcome.added > 0 {
            self.outcome = None;
        }
        outcome
    }

    pub fn remove(&mut self, id: &str) -> Option<ImageAsset> {
        self.images.remove(id)
    }

    pub fn remove_by_name(&mut self, name: &str) -> Option<ImageAsset> {
        self.images.remove_by_name(name)
    }

    pub fn images(&self) -> &ImageCollection {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut ImageCollection {
        &mut self.images
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    pub fn set_outcome(&mut self, outcome: AnalysisOutcome) {
        self.outcome = Some(outcome);
    }

    /// Compresses the leading images one at a time, sends them to the
    /// gateway, and stores the interpreted result.
    ///
    /// `on_compressed` is called after each image is ready.
    pub async fn analyze<E, F>(
        &mut self,
        client: &GatewayClient,
        options: &AnalyzeOptions,
        encoder: &E,
        mut on_compressed: F,
    ) -> Result<&AnalysisOutcome, ClientError>
    where
        E: ImageEncoder + ?Sized,
        F: FnMut(&ImageAsset, &CompressedImage),
    {
        if self.images.len() < options.min_images {
            return Err(ClientError::TooFewImages(options.min_images));
        }
        self.outcome = None;

        let selected = self.images.selected(options.max_images);
        let mut payload = Vec::with_capacity(selected.len());
        for asset in selected {
            let compressed = compress_image(asset, options.target_bytes, &options.compression, encoder)?;
            on_compressed(asset, &compressed);
            payload.push(compressed.data_url);
        }

        let envelope = client.analyze(&payload).await?;
        let outcome = AnalysisOutcome::from_envelope(envelope)?;
        Ok(self.outcome.insert(outcome))
    }

    pub fn report_markdown(&self, generated_at: DateTime<Utc>) -> Result<String, ExportError> {
        let outcome = self.outcome.as_ref().ok_or(ExportError::NothingToExport)?;
        Ok(outcome.to_markdown(&generated_at.with_timezone(&Local)))
    }

    pub fn export(&self, dir: &Path, generated_at: DateTime<Utc>) -> Result<PathBuf, ExportError> {
        let markdown = self.report_markdown(generated_at)?;
        write_report(dir, &markdown, generated_at)
    }
}
