use thiserror::Error;

use billforge_core::DomainError;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format '{0}'; expected one of csv, xlsx, pdf")]
    UnsupportedFormat(String),

    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("pdf error: {0}")]
    Pdf(#[from] printpdf::Error),
}
