use std::path::Path;

/// Extensions accepted for import, lowercase, without the leading dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "txt", "pdf", "docx", "md", "jpg", "jpeg", "png", "tif", "tiff", "bmp", "gif",
];

/// Decides whether a document can be handed to the ingestion pipeline.
pub trait DocumentTypeClassifier: Send + Sync {
    fn is_supported(&self, file_name: &str) -> bool;
}

/// Classifies by file extension, ignoring case.
#[derive(Debug, Clone)]
pub struct ExtensionClassifier {
    extensions: Vec<String>,
}

impl ExtensionClassifier {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Default for ExtensionClassifier {
    fn default() -> Self {
        Self::new(SUPPORTED_EXTENSIONS)
    }
}

impl DocumentTypeClassifier for ExtensionClassifier {
    fn is_supported(&self, file_name: &str) -> bool {
        let Some(ext) = Path::new(file_name).extension() else {
            return false;
        };
        let ext = ext.to_string_lossy().to_ascii_lowercase();
        self.extensions.iter().any(|e| *e == ext)
    }
}
