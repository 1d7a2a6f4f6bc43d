//! Content normalization
//!
//! Turns whatever the user supplied into exactly one of: a single PDF
//! document, an ordered list of images, or pasted text. Anything else is
//! rejected here, before a single network call is made.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use festa_domain::{ContentKind, OperationKind, SourceDescriptor};
use tracing::{debug, warn};

use crate::ExtractionError;

/// MIME type of the one accepted document format
pub const DOCUMENT_MIME: &str = "application/pdf";

/// Accepted image MIME types
pub const IMAGE_MIMES: [&str; 2] = ["image/jpeg", "image/png"];

/// Display name given to pasted text
pub const PASTED_TEXT_NAME: &str = "pasted-text.txt";

/// One uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// File name as supplied
    pub name: String,
    /// MIME type
    pub mime: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl InputFile {
    /// Create an input file
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| {
            ExtractionError::InvalidInputComposition(format!("cannot read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("input")
            .to_string();
        let mime = guess_mime(&name).unwrap_or("application/octet-stream");
        Ok(Self::new(name, mime, bytes))
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: self.name.clone(),
            mime: self.mime.clone(),
            size: self.bytes.len(),
        }
    }
}

/// Guess an accepted MIME type from a file name
pub fn guess_mime(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(DOCUMENT_MIME),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// What the user handed in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSet {
    /// Uploaded files
    Files(Vec<InputFile>),
    /// Pasted text
    Text(String),
}

impl InputSet {
    /// Operation kind this input runs under
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            InputSet::Files(_) => OperationKind::ExtractFile,
            InputSet::Text(_) => OperationKind::ExtractText,
        }
    }
}

/// Normalized payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A single PDF
    Document(InputFile),
    /// Images in user order
    Images(Vec<InputFile>),
    /// Text, verbatim
    Text(String),
}

/// A validated content set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    /// Kind of content
    pub kind: ContentKind,
    /// The content itself
    pub payload: Payload,
    /// One descriptor per input file, empty for text
    pub descriptors: Vec<SourceDescriptor>,
    /// Name shown for the whole set
    pub display_name: String,
}

/// Validates input sets and holds the active one per operation kind
pub struct ContentNormalizer {
    max_images: usize,
    active: Mutex<HashMap<OperationKind, Arc<NormalizedContent>>>,
}

impl ContentNormalizer {
    /// Create a normalizer accepting up to `max_images` images
    pub fn new(max_images: usize) -> Self {
        Self {
            max_images,
            active: Mutex::new(HashMap::new()),
        }
    }

    fn active(&self) -> MutexGuard<'_, HashMap<OperationKind, Arc<NormalizedContent>>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Validate `input` and make it the active set for its operation kind
    ///
    /// The previous set of that kind is dropped whether or not validation
    /// succeeds.
    pub fn normalize(&self, input: InputSet) -> Result<Arc<NormalizedContent>, ExtractionError> {
        let kind = input.operation_kind();
        self.active().remove(&kind);

        let content = Arc::new(self.validate(input)?);
        debug!(
            "Normalized {} input '{}' ({} descriptor(s))",
            content.kind,
            content.display_name,
            content.descriptors.len()
        );
        self.active().insert(kind, Arc::clone(&content));
        Ok(content)
    }

    /// The active content set for an operation kind
    pub fn current(&self, kind: OperationKind) -> Option<Arc<NormalizedContent>> {
        self.active().get(&kind).cloned()
    }

    /// Drop the active content set for an operation kind
    pub fn clear(&self, kind: OperationKind) {
        self.active().remove(&kind);
    }

    fn validate(&self, input: InputSet) -> Result<NormalizedContent, ExtractionError> {
        match input {
            InputSet::Text(text) => {
                if text.trim().is_empty() {
                    return Err(invalid("text is empty"));
                }
                Ok(NormalizedContent {
                    kind: ContentKind::Text,
                    payload: Payload::Text(text),
                    descriptors: Vec::new(),
                    display_name: PASTED_TEXT_NAME.to_string(),
                })
            }
            InputSet::Files(files) => self.validate_files(files),
        }
    }

    fn validate_files(&self, mut files: Vec<InputFile>) -> Result<NormalizedContent, ExtractionError> {
        if files.is_empty() {
            return Err(invalid("no files selected"));
        }
        if let Some(bad) = files
            .iter()
            .find(|f| f.mime != DOCUMENT_MIME && !IMAGE_MIMES.contains(&f.mime.as_str()))
        {
            warn!("Rejected unsupported input '{}' ({})", bad.name, bad.mime);
            return Err(invalid(&format!(
                "unsupported file type {} for '{}'; use one PDF or JPG/PNG images",
                bad.mime, bad.name
            )));
        }

        let documents = files.iter().filter(|f| f.mime == DOCUMENT_MIME).count();
        if documents > 0 && files.len() > 1 {
            return Err(invalid(
                "only a single PDF can be processed; multiple files must all be images",
            ));
        }

        let descriptors: Vec<SourceDescriptor> = files.iter().map(InputFile::descriptor).collect();

        if documents == 1 {
            let file = files.remove(0);
            return Ok(NormalizedContent {
                kind: ContentKind::Document,
                display_name: file.name.clone(),
                payload: Payload::Document(file),
                descriptors,
            });
        }

        if files.len() > self.max_images {
            return Err(invalid(&format!(
                "{} images selected, at most {} are allowed",
                files.len(),
                self.max_images
            )));
        }

        let display_name = if files.len() > 1 {
            format!("{} (+{} more)", files[0].name, files.len() - 1)
        } else {
            files[0].name.clone()
        };

        Ok(NormalizedContent {
            kind: ContentKind::Images,
            payload: Payload::Images(files),
            descriptors,
            display_name,
        })
    }
}

fn invalid(reason: &str) -> ExtractionError {
    ExtractionError::InvalidInputComposition(reason.to_string())
}
