pub mod client;
pub mod compress;
pub mod export;
pub mod render;
pub mod session;
pub mod upload;

pub use client::{ClientError, GatewayClient};
pub use compress::{compress_image, CompressedImage, CompressionSettings, ImageEncoder, JpegReencoder};
pub use export::{default_output_dir, report_file_name, write_report, ExportError};
pub use session::{AnalysisOutcome, AnalysisSession, AnalyzeOptions};
pub use upload::{AddOutcome, ImageAsset, ImageCollection, ImageKind, UploadError};
