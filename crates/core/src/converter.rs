//! PDF to Markdown batch conversion.

use crate::error::ConvertError;
use crate::models::{ConversionEvent, ConversionFailure, ConversionResult, ConvertedFile};
use lopdf::Document;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const HEADING_PATTERN: &str = r"^\d+(?:\.\d+)*\.?\s+[A-Z][^.!?]{0,80}$";

pub trait DocumentConverter {
    /// Converts one PDF into Markdown text.
    fn convert(&self, path: &Path) -> Result<String, ConvertError>;
}

/// Converter backed by lopdf text extraction.
pub struct LopdfConverter {
    heading_re: Regex,
}

impl LopdfConverter {
    pub fn new() -> Result<Self, ConvertError> {
        let heading_re = Regex::new(HEADING_PATTERN)
            .map_err(|error| ConvertError::ConverterInit(error.to_string()))?;
        Ok(Self { heading_re })
    }
}

impl DocumentConverter for LopdfConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        let document =
            Document::load(path).map_err(|error| ConvertError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| ConvertError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(render_page_markdown(&text, &self.heading_re));
            }
        }

        if pages.is_empty() {
            return Err(ConvertError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(pages.join("\n\n"))
    }
}

/// Turns extracted page text into Markdown paragraphs, promoting numbered
/// section lines to level-two headings.
pub fn render_page_markdown(page_text: &str, heading_re: &Regex) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    let flush = |paragraph: &mut Vec<&str>, blocks: &mut Vec<String>| {
        if !paragraph.is_empty() {
            blocks.push(paragraph.join(" "));
            paragraph.clear();
        }
    };

    for line in page_text.lines().map(str::trim) {
        if line.is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else if heading_re.is_match(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(format!("## {line}"));
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph, &mut blocks);

    blocks
        .into_iter()
        .map(|block| block.replace('\u{a0}', " "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Lists `*.pdf` files directly inside `folder`, sorted by name.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    files.sort_unstable();
    files
}

/// Converts every PDF in `input_dir` into `<stem>.md` inside `output_dir`.
///
/// Setup problems (missing input directory, uncreatable output directory,
/// converter initialisation) are returned as errors before any file is
/// touched. A failure on one file is recorded and the batch continues.
pub fn convert_batch<C, F, E>(
    input_dir: &Path,
    output_dir: &Path,
    init: F,
    mut on_event: E,
) -> Result<ConversionResult, ConvertError>
where
    C: DocumentConverter,
    F: FnOnce() -> Result<C, ConvertError>,
    E: FnMut(&ConversionEvent),
{
    if !input_dir.is_dir() {
        return Err(ConvertError::InputNotDirectory(input_dir.to_path_buf()));
    }

    fs::create_dir_all(output_dir).map_err(|source| ConvertError::CreateOutput {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let converter = init().map_err(|error| match error {
        ConvertError::ConverterInit(details) => ConvertError::ConverterInit(details),
        other => ConvertError::ConverterInit(other.to_string()),
    })?;

    on_event(&ConversionEvent::Started {
        input: input_dir.to_path_buf(),
        output: output_dir.to_path_buf(),
    });
    info!(input = %input_dir.display(), output = %output_dir.display(), "starting batch conversion");

    let mut result = ConversionResult::default();

    for pdf_file in discover_pdf_files(input_dir) {
        let source_name = pdf_file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        match convert_one(&converter, &pdf_file, output_dir) {
            Ok(output) => {
                let output_name = output
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default();
                info!(source = %source_name, output = %output_name, "converted pdf");
                on_event(&ConversionEvent::Converted {
                    source_name,
                    output_name,
                });
                result.converted_count += 1;
                result.converted.push(ConvertedFile {
                    source: pdf_file,
                    output,
                });
            }
            Err(error) => {
                let failure = ConversionFailure {
                    file_name: source_name,
                    reason: error.to_string(),
                };
                warn!(file = %failure.file_name, reason = %failure.reason, "pdf conversion failed");
                on_event(&ConversionEvent::Failed(failure.clone()));
                result.errors.push(failure);
            }
        }
    }

    Ok(result)
}

fn convert_one<C: DocumentConverter>(
    converter: &C,
    pdf_file: &Path,
    output_dir: &Path,
) -> Result<PathBuf, ConvertError> {
    let markdown = converter.convert(pdf_file)?;
    let stem = pdf_file
        .file_stem()
        .ok_or_else(|| ConvertError::PdfParse(format!("no file stem: {}", pdf_file.display())))?;

    let mut file_name = stem.to_os_string();
    file_name.push(".md");
    let output = output_dir.join(file_name);
    fs::write(&output, markdown)?;
    Ok(output)
}

/// String-only entry point: every outcome, including setup errors, comes
/// back as printable text.
pub fn convert_batch_summary<C, F, E>(
    input_dir: &Path,
    output_dir: &Path,
    init: F,
    on_event: E,
) -> String
where
    C: DocumentConverter,
    F: FnOnce() -> Result<C, ConvertError>,
    E: FnMut(&ConversionEvent),
{
    match convert_batch(input_dir, output_dir, init, on_event) {
        Ok(result) => result.summary(),
        Err(error) => format!("Error: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct FakeConverter;

    impl DocumentConverter for FakeConverter {
        fn convert(&self, path: &Path) -> Result<String, ConvertError> {
            let bytes = fs::read(path)?;
            if bytes.starts_with(b"%PDF") {
                Ok(format!("# {}\n\nbody", path.display()))
            } else {
                Err(ConvertError::PdfParse("not a pdf".to_string()))
            }
        }
    }

    fn fake_init() -> Result<FakeConverter, ConvertError> {
        Ok(FakeConverter)
    }

    #[test]
    fn batch_converts_valid_and_records_corrupt() -> Result<(), Box<dyn std::error::Error>> {
        let input = tempdir()?;
        let output = tempdir()?;
        fs::write(input.path().join("a.pdf"), b"%PDF-1.4 a")?;
        fs::write(input.path().join("b.pdf"), b"%PDF-1.4 b")?;
        fs::write(input.path().join("broken.pdf"), b"garbage")?;
        fs::write(input.path().join("notes.txt"), b"%PDF but wrong extension")?;

        let mut events = Vec::new();
        let result = convert_batch(input.path(), output.path(), fake_init, |event| {
            events.push(format!("{event:?}"))
        })?;

        assert_eq!(result.converted_count, 2);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.errors[0].file_name, "broken.pdf");
        assert!(output.path().join("a.md").exists());
        assert!(output.path().join("b.md").exists());
        assert!(!output.path().join("broken.md").exists());
        assert_eq!(fs::read_dir(output.path())?.count(), 2);
        // started + three per-file events
        assert_eq!(events.len(), 4);

        let summary = result.summary();
        assert!(summary.contains("Successfully converted 2 PDF file(s)"));
        assert!(summary.contains("1 file(s) failed to convert"));
        assert!(summary.contains("  1. Error converting broken.pdf: pdf parse error: not a pdf"));
        Ok(())
    }

    #[test]
    fn dotted_stems_keep_distinct_outputs() -> Result<(), Box<dyn std::error::Error>> {
        let input = tempdir()?;
        let output = tempdir()?;
        fs::write(input.path().join("report.v1.pdf"), b"%PDF-1.4 one")?;
        fs::write(input.path().join("report.v2.pdf"), b"%PDF-1.4 two")?;

        let result = convert_batch(input.path(), output.path(), fake_init, |_| {})?;

        let outputs: Vec<_> = result
            .converted
            .iter()
            .filter_map(|file| file.output.file_name().and_then(|name| name.to_str()))
            .collect();
        assert_eq!(outputs, vec!["report.v1.md", "report.v2.md"]);
        assert_eq!(fs::read_dir(output.path())?.count(), 2);
        Ok(())
    }

    #[test]
    fn missing_input_dir_is_reported_without_output() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempdir()?;
        let missing = root.path().join("missing");
        let output = root.path().join("out");

        let summary = convert_batch_summary(&missing, &output, fake_init, |_| {});

        assert!(summary.starts_with("Error: Input path"));
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn empty_input_dir_reports_zero() -> Result<(), Box<dyn std::error::Error>> {
        let input = tempdir()?;
        let output = input.path().join("nested").join("out");

        let result = convert_batch(input.path(), &output, fake_init, |_| {})?;

        assert_eq!(result.converted_count, 0);
        assert!(result.errors.is_empty());
        assert!(output.is_dir());
        assert!(!result.summary().contains("Warnings"));
        Ok(())
    }

    #[test]
    fn converter_init_failure_processes_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let input = tempdir()?;
        let output = tempdir()?;
        fs::write(input.path().join("a.pdf"), b"%PDF-1.4 a")?;

        let result = convert_batch(
            input.path(),
            output.path(),
            || Err::<FakeConverter, _>(ConvertError::ConverterInit("backend missing".into())),
            |_| {},
        );

        assert!(matches!(result, Err(ConvertError::ConverterInit(_))));
        assert_eq!(fs::read_dir(output.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn lopdf_converter_rejects_corrupt_pdf() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let converter = LopdfConverter::new()?;
        assert!(matches!(converter.convert(&path), Err(ConvertError::PdfParse(_))));
        Ok(())
    }

    #[test]
    fn discovery_is_sorted_and_not_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(dir.path().join("nested").join("c.pdf"), b"x")?;
        fs::write(dir.path().join("b.PDF"), b"x")?;
        fs::write(dir.path().join("a.pdf"), b"x")?;

        let names: Vec<_> = discover_pdf_files(dir.path())
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()).map(String::from))
            .collect();

        assert_eq!(names, vec!["a.pdf", "b.PDF"]);
        Ok(())
    }

    #[test]
    fn page_text_becomes_markdown_blocks() {
        let heading_re = Regex::new(HEADING_PATTERN).unwrap();
        let page = "1.2 Pump Maintenance\nCheck the seals\nevery month.\n\nReplace filters.";
        let markdown = render_page_markdown(page, &heading_re);
        assert_eq!(
            markdown,
            "## 1.2 Pump Maintenance\n\nCheck the seals every month.\n\nReplace filters."
        );
    }
}
