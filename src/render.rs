//! Aggregator: renders the included file set of one repository into a single
//! artifact, either marked-up text or a structured PDF document.

use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use tracing::{info, warn};

/// Interchangeable rendering strategies for the per-repository artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderFormat {
    /// One text stream: a heading line plus a fenced code block per file.
    Markdown,
    /// Titled document with a table of contents and one page-broken section
    /// per file.
    Pdf,
}

impl RenderFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            RenderFormat::Markdown => "md",
            RenderFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderFormat::Markdown => write!(f, "markdown"),
            RenderFormat::Pdf => write!(f, "pdf"),
        }
    }
}

#[derive(Debug)]
pub enum RenderError {
    Io(std::io::Error),
    Pdf(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Io(e) => write!(f, "failed to write artifact: {e}"),
            RenderError::Pdf(e) => write!(f, "failed to render PDF: {e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Io(e) => Some(e),
            RenderError::Pdf(_) => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e)
    }
}

/// Renders one artifact for a repository and writes it to
/// `<output_dir>/<repo_name>.<ext>`, overwriting any prior artifact.
///
/// `included` holds repository-relative paths in traversal order. Every file
/// is re-read at render time; a file that disappeared since classification
/// is skipped with a warning, never aborting the artifact.
pub fn render_artifact(
    repo_name: &str,
    repo_root: &Path,
    included: &[PathBuf],
    format: RenderFormat,
    output_dir: &Path,
) -> Result<PathBuf, RenderError> {
    fs::create_dir_all(output_dir)?;
    let dest = output_dir.join(format!("{repo_name}.{}", format.extension()));
    match format {
        RenderFormat::Markdown => render_markdown(repo_root, included, &dest)?,
        RenderFormat::Pdf => render_pdf(repo_name, repo_root, included, &dest)?,
    }
    info!(
        artifact = %dest.display(),
        files = included.len(),
        "Wrote artifact"
    );
    Ok(dest)
}

/// Lossy read: undecodable bytes are replaced, a vanished file yields `None`.
fn read_file_lossy(repo_root: &Path, rel_path: &Path) -> Option<String> {
    match fs::read(repo_root.join(rel_path)) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            warn!(
                path = %rel_path.display(),
                error = %e,
                "Skipping file that could not be read at render time"
            );
            None
        }
    }
}

fn rel_display(rel_path: &Path) -> String {
    rel_path.to_string_lossy().replace('\\', "/")
}

fn render_markdown(repo_root: &Path, included: &[PathBuf], dest: &Path) -> Result<(), RenderError> {
    let mut out = String::new();
    for rel_path in included {
        let content = match read_file_lossy(repo_root, rel_path) {
            Some(content) => content,
            None => continue,
        };
        out.push_str("## ");
        out.push_str(&rel_display(rel_path));
        out.push_str("\n\n```\n");
        out.push_str(&content);
        if !content.is_empty() && !content.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n\n");
    }
    fs::write(dest, out)?;
    Ok(())
}

// Layout constants for the PDF renderer, in millimetres on A4.
const MARGIN: f64 = 15.0;
const PAGE_HEIGHT: f64 = 297.0;
const PAGE_WIDTH: f64 = 210.0;
const HEADING_STEP: f64 = 7.0;
const BODY_STEP: f64 = 4.2;
// Courier at 9pt fits roughly this many columns between the margins.
const MAX_COLS: usize = 105;

struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f64,
}

impl<'a> PageWriter<'a> {
    fn page_break(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "content");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_room(&mut self) {
        if self.y < MARGIN {
            self.page_break();
        }
    }

    fn heading(&mut self, text: &str, font: &IndirectFontRef) {
        self.ensure_room();
        self.layer.use_text(
            sanitize_line(text),
            12.0,
            Mm(MARGIN as f32),
            Mm(self.y as f32),
            font,
        );
        self.y -= HEADING_STEP;
    }

    fn body(&mut self, text: &str, font: &IndirectFontRef) {
        self.ensure_room();
        self.layer.use_text(
            text.to_string(),
            9.0,
            Mm(MARGIN as f32),
            Mm(self.y as f32),
            font,
        );
        self.y -= BODY_STEP;
    }

    fn blank(&mut self) {
        self.y -= BODY_STEP;
    }
}

/// Builtin PDF fonts only cover a latin subset; anything outside printable
/// ASCII is replaced rather than risking a corrupt content stream.
fn sanitize_line(line: &str) -> String {
    line.replace('\t', "    ")
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '?'
            }
        })
        .collect()
}

fn wrap_line(line: &str, max_cols: usize) -> Vec<String> {
    let cleaned = sanitize_line(line);
    if cleaned.len() <= max_cols {
        return vec![cleaned];
    }
    cleaned
        .chars()
        .collect::<Vec<_>>()
        .chunks(max_cols)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn render_pdf(
    repo_name: &str,
    repo_root: &Path,
    included: &[PathBuf],
    dest: &Path,
) -> Result<(), RenderError> {
    let title = format!("Repository: {repo_name}");
    let (doc, page, layer) = PdfDocument::new(
        title.clone(),
        Mm(PAGE_WIDTH as f32),
        Mm(PAGE_HEIGHT as f32),
        "content",
    );
    let body_font = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let heading_font = doc
        .add_builtin_font(BuiltinFont::CourierBold)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    let mut writer = PageWriter {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT - MARGIN,
    };

    writer.heading(&title, &heading_font);
    writer.blank();
    writer.heading("Table of Contents", &heading_font);
    for rel_path in included {
        writer.body(&sanitize_line(&format!("- {}", rel_display(rel_path))), &body_font);
    }

    for rel_path in included {
        let content = match read_file_lossy(repo_root, rel_path) {
            Some(content) => content,
            None => continue,
        };
        writer.page_break();
        writer.heading(&rel_display(rel_path), &heading_font);
        writer.blank();
        for line in content.lines() {
            for piece in wrap_line(line, MAX_COLS) {
                writer.body(&piece, &body_font);
            }
        }
    }
    drop(writer);

    let file = File::create(dest)?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| RenderError::Pdf(e.to_string()))
}
