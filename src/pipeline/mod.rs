//! Background analysis: debounced, cancellable validation passes whose
//! results are published per document version.
//!
//! ```text
//! AnalysisHost::set_file_content ─► AnalysisPipeline::notify
//!                                        │  (channel)
//!                                        ▼
//!                                  worker thread: debounce ─► DocumentAnalyzer
//!                                        │
//!                                        ▼
//!                                  DiagnosticsPublisher ─► DiagnosticSink
//! ```

mod publisher;
mod worker;

pub use publisher::{ChannelSink, DiagnosticBatch, DiagnosticSink, DiagnosticsPublisher};
pub use worker::{AnalysisPipeline, AnalysisRequest, DocumentAnalyzer, SemanticAnalyzer};
