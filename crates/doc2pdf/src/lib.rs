pub mod config;
pub mod delegate;
pub mod error;
pub mod ir;
pub mod output;
pub mod parser;
pub mod record;
pub mod render;

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use config::{ConvertOptions, Format, PageGeometry, Strategy};
use error::{ConvertError, RenderError};
use record::ConversionRecord;

/// One conversion attempt.
///
/// `declared_file_name` is the name the document was submitted under; it
/// alone decides the format and the output name. `input_path` is where its
/// bytes were stored and may be named differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input_path: PathBuf,
    pub declared_file_name: String,
}

impl ConversionRequest {
    pub fn new(input_path: impl Into<PathBuf>, declared_file_name: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            declared_file_name: declared_file_name.into(),
        }
    }

    /// A request declared under the input file's own name.
    pub fn from_path(input_path: impl Into<PathBuf>) -> Self {
        let input_path = input_path.into();
        let declared_file_name = input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            input_path,
            declared_file_name,
        }
    }

    /// The declared name without any directory components.
    pub fn base_name(&self) -> &str {
        base_name(&self.declared_file_name)
    }
}

/// Successful outcome of [`convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub output_path: PathBuf,
    pub file_name: String,
    pub format: Format,
    pub strategy: Strategy,
}

impl Conversion {
    /// History entry for this conversion, stamped now.
    pub fn record(&self) -> ConversionRecord {
        ConversionRecord::now(self.file_name.clone(), self.format)
    }
}

fn base_name(file_name: &str) -> &str {
    file_name.rsplit(['/', '\\']).next().unwrap_or(file_name)
}

/// Output location for a declared file name: `<output_dir>/<base name>.pdf`.
pub fn output_path_for(output_dir: &Path, declared_file_name: &str) -> PathBuf {
    output_dir.join(format!("{}.pdf", base_name(declared_file_name)))
}

/// Convert one document to PDF, writing `<output_dir>/<declared name>.pdf`.
///
/// Unrecognized names fail before the input or the output directory is
/// touched. On any failure no file is left under the output name by this
/// attempt.
#[instrument(skip(options), fields(file_name = %request.declared_file_name))]
pub fn convert(
    request: &ConversionRequest,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    let file_name = request.base_name();
    let format = Format::classify(file_name)
        .ok_or_else(|| ConvertError::UnsupportedFormat(file_name.to_string()))?;
    let strategy = format.strategy();
    let output_path = output_path_for(&options.output_dir, file_name);
    info!(%format, ?strategy, output = %output_path.display(), "converting");

    let result = match strategy {
        Strategy::Native => render_to_file(request, format, &output_path, options),
        Strategy::Delegate => delegate::convert_with_engine(
            &request.input_path,
            &output_path,
            &options.delegate,
            options.cancel.as_ref(),
        )
        .map(drop)
        .map_err(ConvertError::from),
    };
    if let Err(e) = &result {
        warn!(%format, error = %e, "conversion failed");
    }
    result?;

    info!(output = %output_path.display(), "conversion complete");
    Ok(Conversion {
        output_path,
        file_name: file_name.to_string(),
        format,
        strategy,
    })
}

fn render_to_file(
    request: &ConversionRequest,
    format: Format,
    output_path: &Path,
    options: &ConvertOptions,
) -> Result<(), ConvertError> {
    let data = std::fs::read(&request.input_path).map_err(RenderError::from)?;
    let bytes = convert_bytes(&data, format, request.base_name(), &options.page)?;
    output::write_atomic(output_path, &bytes).map_err(RenderError::from)?;
    Ok(())
}

/// Render the bytes of a natively supported format to PDF bytes.
///
/// `title` is used as the document title when the source has none.
pub fn convert_bytes(
    data: &[u8],
    format: Format,
    title: &str,
    page: &PageGeometry,
) -> Result<Vec<u8>, ConvertError> {
    let parser = parser::parser_for(format).ok_or_else(|| {
        ConvertError::UnsupportedFormat(format!("{format} needs the external conversion engine"))
    })?;
    let doc = parser.parse(data)?;
    render_document(&doc, title, page)
}

/// Render an IR Document to PDF bytes.
pub fn render_document(
    doc: &ir::Document,
    title: &str,
    page: &PageGeometry,
) -> Result<Vec<u8>, ConvertError> {
    Ok(render::render_document(doc, page, title)?)
}
