//! Document loading: extension → loader mapping and directory scan.
//!
//! Only `.pdf` and `.txt` files are recognized as ingestible; anything else
//! in the documents directory is filtered out, not errored. A missing
//! directory behaves as an empty corpus. PDF sources are paginated: each
//! page becomes its own [`Document`] so citations can point at a page.

use std::path::Path;
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};
use crate::models::Document;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// Capability implemented per file format.
pub trait DocumentLoader {
    /// Load one file into one or more documents.
    fn load(&self, path: &Path) -> Result<Vec<Document>>;
}

/// Loader for the given extension (lowercase, without the dot), if the
/// extension is recognized.
pub fn loader_for(ext: &str) -> Option<&'static dyn DocumentLoader> {
    match ext {
        "txt" => Some(&TextLoader),
        "pdf" => Some(&PdfLoader),
        _ => None,
    }
}

/// Plain-text loader: the whole file is one document.
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(vec![Document {
            content,
            source: file_name(path),
            page: None,
        }])
    }
}

/// Paginated PDF loader: one document per page, 1-based page numbers.
/// Blank pages are skipped.
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| PipelineError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let source = file_name(path);
        Ok(pages
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| Document {
                content: text,
                source: source.clone(),
                page: Some(i as u32 + 1),
            })
            .collect())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// List recognized document filenames in `dir`, sorted for deterministic
/// fingerprinting. A nonexistent directory yields an empty list.
pub fn list_document_names(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|e| PipelineError::Load {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if extension_of(path)
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
        {
            names.push(file_name(path));
        }
    }

    names.sort();
    Ok(names)
}

/// Load every recognized document in `dir`, in sorted filename order.
pub fn load_documents(dir: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for name in list_document_names(dir)? {
        let path = dir.join(&name);
        let ext = extension_of(&path).unwrap_or_default();
        if let Some(loader) = loader_for(&ext) {
            let loaded = loader.load(&path)?;
            tracing::debug!(file = %name, documents = loaded.len(), "loaded");
            documents.extend(loaded);
        }
    }
    Ok(documents)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Write a small but valid PDF with one page per entry in `pages`,
    /// each showing its text in Helvetica. An empty entry becomes a page
    /// with an empty content stream.
    fn write_pdf(path: &Path, pages: &[&str]) {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut pdf = lopdf::Document::with_version("1.5");
        let pages_id = pdf.new_object_id();
        let font_id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = pdf.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id =
                pdf.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = pdf.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        pdf.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = pdf.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        pdf.trailer.set("Root", catalog_id);
        pdf.save(path).unwrap();
    }

    #[test]
    fn lists_only_supported_extensions_sorted() {
        let tmp = TempDir::new().unwrap();
        for name in ["notes.txt", "doc2.pdf", "image.png", "doc1.txt"] {
            fs::write(tmp.path().join(name), "content").unwrap();
        }
        let names = list_document_names(tmp.path()).unwrap();
        assert_eq!(names, vec!["doc1.txt", "doc2.pdf", "notes.txt"]);
    }

    #[test]
    fn nonexistent_directory_is_empty() {
        let names = list_document_names(Path::new("/nonexistent/docqa-test")).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("REPORT.TXT"), "upper").unwrap();
        let names = list_document_names(tmp.path()).unwrap();
        assert_eq!(names, vec!["REPORT.TXT"]);
    }

    #[test]
    fn text_loader_reads_whole_file_as_one_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.txt");
        fs::write(&path, "This is a test document about AI engineering.").unwrap();

        let docs = TextLoader.load(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].content.contains("AI engineering"));
        assert_eq!(docs[0].source, "test.txt");
        assert_eq!(docs[0].page, None);
    }

    #[test]
    fn load_documents_skips_unsupported_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        fs::write(tmp.path().join("b.md"), "ignored").unwrap();
        let docs = load_documents(tmp.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "a.txt");
    }

    #[test]
    fn subdirectories_are_not_scanned() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested").join("deep.txt"), "hidden").unwrap();
        fs::write(tmp.path().join("top.txt"), "visible").unwrap();
        let names = list_document_names(tmp.path()).unwrap();
        assert_eq!(names, vec!["top.txt"]);
    }

    #[test]
    fn unknown_extension_has_no_loader() {
        assert!(loader_for("png").is_none());
        assert!(loader_for("txt").is_some());
        assert!(loader_for("pdf").is_some());
    }

    #[test]
    fn pdf_loader_yields_one_document_per_page() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manual.pdf");
        write_pdf(&path, &["alpha page text", "beta page text"]);

        let docs = PdfLoader.load(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].content.contains("alpha page text"));
        assert!(docs[1].content.contains("beta page text"));
        assert_eq!(docs[0].page, Some(1));
        assert_eq!(docs[1].page, Some(2));
        assert!(docs.iter().all(|d| d.source == "manual.pdf"));
    }

    #[test]
    fn pdf_loader_skips_blank_pages_keeping_real_numbers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gappy.pdf");
        write_pdf(&path, &["first page text", "", "third page text"]);

        let docs = PdfLoader.load(&path).unwrap();
        assert_eq!(docs.len(), 2);
        // The blank page is dropped, not renumbered.
        assert_eq!(docs[0].page, Some(1));
        assert_eq!(docs[1].page, Some(3));
        assert!(docs[1].content.contains("third page text"));
    }

    #[test]
    fn invalid_pdf_returns_load_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.pdf");
        fs::write(&path, "not a pdf").unwrap();
        let err = PdfLoader.load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
    }
}
