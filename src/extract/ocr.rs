// file: src/extract/ocr.rs
// description: pdf and image text via external poppler and tesseract binaries
// reference: embedded pdf text first, rasterize + ocr when the pdf has none

use crate::error::{RouterError, Result};
use crate::extract::{TextExtractor, extension_of};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage};
use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Page segmentation modes tried on standalone images; the longest result wins.
const IMAGE_PSMS: [&str; 4] = ["1", "3", "6", "4"];
/// Modes tried on the low-resolution first-page retry.
const FALLBACK_PSMS: [&str; 4] = ["4", "6", "12", "8"];
/// Automatic segmentation, then single-block when the first finds nothing.
const PAGE_PSMS: [&str; 2] = ["1", "6"];

const MAX_DIMENSION: u32 = 2000;
const BINARIZE_THRESHOLD: u8 = 200;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Stands in for the text of a page whose OCR ran out of time.
pub const PAGE_TIMEOUT_MARKER: &str = "[OCR timeout - page skipped]";

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub language: String,
    pub max_pages: u32,
    pub dpi: u32,
    pub fallback_dpi: u32,
    pub preprocess: bool,
    /// Limit for one pdftotext or pdftoppm run.
    pub render_timeout: Duration,
    /// Budget shared by every tesseract run on one pdf page.
    pub page_timeout: Duration,
    /// Limit for a single tesseract run on an image or fallback page.
    pub attempt_timeout: Duration,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            max_pages: 3,
            dpi: 150,
            fallback_dpi: 100,
            preprocess: true,
            render_timeout: Duration::from_secs(60),
            page_timeout: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

enum PageOutcome {
    Text(String),
    TimedOut,
}

#[derive(Debug, Clone, Default)]
pub struct OcrExtractor {
    config: OcrConfig,
}

impl OcrExtractor {
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Whether each external OCR binary can be launched.
    pub fn tool_availability() -> Vec<(&'static str, bool)> {
        [
            ("pdftotext", "-v"),
            ("pdftoppm", "-v"),
            ("tesseract", "--version"),
        ]
        .into_iter()
        .map(|(program, flag)| {
            let available = Command::new(program).arg(flag).output().is_ok();
            (program, available)
        })
        .collect()
    }

    /// Runs `command` to completion, killing it once `timeout` has passed.
    ///
    /// Output goes to files named on the command line; only stderr is kept
    /// for the error message.
    fn run(program: &str, command: &mut Command, timeout: Duration) -> Result<()> {
        let mut child = match command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RouterError::ExtractorUnavailable(format!(
                    "{} not found in PATH",
                    program
                )));
            }
            Err(e) => return Err(RouterError::Io(e)),
        };

        // drained on its own thread so a chatty tool never blocks on a full pipe
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RouterError::Timeout(format!(
                    "{} killed after {:.1}s",
                    program,
                    timeout.as_secs_f64()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        };

        if status.success() {
            return Ok(());
        }

        let stderr = stderr
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        Err(RouterError::ExternalTool(format!(
            "{} exited with {}: {}",
            program,
            status,
            stderr.trim()
        )))
    }

    fn embedded_pdf_text(&self, path: &Path, scratch: &Path) -> Result<String> {
        let last_page = self.config.max_pages.to_string();
        let output = scratch.join("embedded.txt");
        Self::run(
            "pdftotext",
            Command::new("pdftotext")
                .args(["-f", "1", "-l", &last_page, "-layout"])
                .arg(path)
                .arg(&output),
            self.config.render_timeout,
        )?;
        Ok(String::from_utf8_lossy(&fs::read(&output)?).into_owned())
    }

    fn rasterize_pdf(
        &self,
        path: &Path,
        output_dir: &Path,
        last_page: u32,
        dpi: u32,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(output_dir)?;
        let last_page = last_page.to_string();
        let dpi = dpi.to_string();
        let prefix = output_dir.join("page");

        Self::run(
            "pdftoppm",
            Command::new("pdftoppm")
                .args(["-png", "-r", &dpi, "-f", "1", "-l", &last_page])
                .arg(path)
                .arg(&prefix),
            self.config.render_timeout,
        )?;

        let mut pages: Vec<PathBuf> = fs::read_dir(output_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| extension_of(p).as_deref() == Some("png"))
            .collect();
        // pdftoppm zero-pads page numbers, so lexical order is page order
        pages.sort();
        Ok(pages)
    }

    fn tesseract(
        &self,
        image: &Path,
        output_base: &Path,
        psm: &str,
        timeout: Duration,
    ) -> Result<String> {
        Self::run(
            "tesseract",
            Command::new("tesseract")
                .arg(image)
                .arg(output_base)
                .args(["-l", &self.config.language, "--psm", psm]),
            timeout,
        )?;

        let mut output: OsString = output_base.as_os_str().to_owned();
        output.push(".txt");
        let text = fs::read(PathBuf::from(output))?;
        Ok(String::from_utf8_lossy(&text).trim().to_string())
    }

    /// Writes the preprocessed copy of `source` into `scratch`, or hands back
    /// the original when preprocessing is off or the image cannot be decoded.
    fn prepared_image(&self, source: &Path, scratch: &Path, tag: &str) -> PathBuf {
        if !self.config.preprocess {
            return source.to_path_buf();
        }

        let prepared = scratch.join(format!("{}-prepared.png", tag));
        let result = image::open(source)
            .map(prepare_for_ocr)
            .and_then(|gray| gray.save(&prepared));

        match result {
            Ok(()) => prepared,
            Err(e) => {
                debug!("Preprocessing skipped for {}: {}", source.display(), e);
                source.to_path_buf()
            }
        }
    }

    /// Runs every mode in parallel and keeps the longest text.
    fn best_of(&self, image: &Path, psms: &[&str], scratch: &Path, tag: &str) -> Result<String> {
        let timeout = self.config.attempt_timeout;
        let results: Vec<Result<String>> = thread::scope(|scope| {
            let handles: Vec<_> = psms
                .iter()
                .map(|psm| {
                    let base = scratch.join(format!("{}-psm{}", tag, psm));
                    scope.spawn(move || self.tesseract(image, &base, psm, timeout))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(RouterError::ExternalTool("tesseract worker panicked".to_string()))
                    })
                })
                .collect()
        });

        longest_text(results)
    }

    fn ocr_image(&self, path: &Path) -> Result<String> {
        let scratch = TempDir::new()?;
        let image = self.prepared_image(path, scratch.path(), "image");
        let text = self.best_of(&image, &IMAGE_PSMS, scratch.path(), "image")?;

        if text.is_empty() {
            return Err(RouterError::Extraction {
                path: path.to_path_buf(),
                message: "no text found in image".to_string(),
            });
        }
        Ok(text)
    }

    /// OCR for one rasterized page; every attempt shares the page deadline.
    fn ocr_page(&self, page: &Path, scratch: &Path, number: usize) -> Result<PageOutcome> {
        let deadline = Instant::now() + self.config.page_timeout;
        let tag = format!("page{}", number);
        let image = self.prepared_image(page, scratch, &tag);

        for psm in PAGE_PSMS {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(PageOutcome::TimedOut);
            }

            let base = scratch.join(format!("{}-psm{}", tag, psm));
            match self.tesseract(&image, &base, psm, remaining) {
                Ok(text) if !text.is_empty() => return Ok(PageOutcome::Text(text)),
                Ok(_) => debug!("No text on page {} with --psm {}", number, psm),
                Err(RouterError::Timeout(_)) => return Ok(PageOutcome::TimedOut),
                Err(e) => return Err(e),
            }
        }

        Ok(PageOutcome::Text(String::new()))
    }

    /// Page 1 again at low resolution, scored across several segmentation modes.
    fn fallback_first_page(&self, path: &Path, scratch: &Path) -> Result<String> {
        let dir = scratch.join("fallback");
        let pages = self.rasterize_pdf(path, &dir, 1, self.config.fallback_dpi)?;
        let Some(page) = pages.first() else {
            return Ok(String::new());
        };

        let image = self.prepared_image(page, &dir, "fallback");
        self.best_of(&image, &FALLBACK_PSMS, &dir, "fallback")
    }

    fn extract_pdf(&self, path: &Path) -> Result<String> {
        let scratch = TempDir::new()?;

        match self.embedded_pdf_text(path, scratch.path()) {
            Ok(text) if !text.trim().is_empty() => {
                debug!("Using embedded text from {}", path.display());
                return Ok(text.trim().to_string());
            }
            Ok(_) => debug!("No embedded text in {}, falling back to OCR", path.display()),
            Err(e @ RouterError::ExtractorUnavailable(_)) => return Err(e),
            Err(e) => debug!("Embedded text extraction failed: {}", e),
        }

        let pages_dir = scratch.path().join("pages");
        let pages = self.rasterize_pdf(path, &pages_dir, self.config.max_pages, self.config.dpi)?;
        if pages.is_empty() {
            return Err(RouterError::Extraction {
                path: path.to_path_buf(),
                message: "pdf produced no page images".to_string(),
            });
        }

        let outcomes: Vec<Result<PageOutcome>> = thread::scope(|scope| {
            let handles: Vec<_> = pages
                .iter()
                .enumerate()
                .map(|(index, page)| {
                    let dir = pages_dir.as_path();
                    scope.spawn(move || self.ocr_page(page, dir, index + 1))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(RouterError::ExternalTool("tesseract worker panicked".to_string()))
                    })
                })
                .collect()
        });

        let mut sections = Vec::with_capacity(outcomes.len());
        let mut timed_out = false;
        let mut found_text = false;

        for (index, outcome) in outcomes.into_iter().enumerate() {
            let number = index + 1;
            let text = match outcome {
                Ok(PageOutcome::Text(text)) => {
                    found_text |= !text.is_empty();
                    text
                }
                Ok(PageOutcome::TimedOut) => {
                    warn!("OCR timeout on page {} of {}, skipping", number, path.display());
                    timed_out = true;
                    PAGE_TIMEOUT_MARKER.to_string()
                }
                Err(e @ RouterError::ExtractorUnavailable(_)) => return Err(e),
                Err(e) => {
                    warn!("OCR failed on page {} of {}: {}", number, path.display(), e);
                    String::new()
                }
            };
            sections.push(format_page(number, &text));
        }

        let primary = sections.join("\n");
        if found_text && !timed_out {
            info!("OCR extracted {} page(s) from {}", pages.len(), path.display());
            return Ok(primary);
        }

        info!("Attempting fallback OCR on {}", path.display());
        match self.fallback_first_page(path, scratch.path()) {
            Ok(text) if !text.is_empty() => return Ok(format_fallback_page(&text)),
            Ok(_) => debug!("Fallback OCR found no text in {}", path.display()),
            Err(e) => warn!("Fallback OCR failed for {}: {}", path.display(), e),
        }

        if found_text {
            return Ok(primary);
        }

        Err(RouterError::Extraction {
            path: path.to_path_buf(),
            message: if timed_out {
                "every page timed out during OCR".to_string()
            } else {
                "no text found in pdf".to_string()
            },
        })
    }
}

/// Downscales so neither side exceeds 2000px, converts to grayscale and
/// binarizes: values below 200 become black, the rest white.
pub fn prepare_for_ocr(image: DynamicImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let image = if width > MAX_DIMENSION || height > MAX_DIMENSION {
        let ratio = (MAX_DIMENSION as f64 / width as f64).min(MAX_DIMENSION as f64 / height as f64);
        let new_width = ((width as f64 * ratio) as u32).max(1);
        let new_height = ((height as f64 * ratio) as u32).max(1);
        image.resize_exact(new_width, new_height, FilterType::Lanczos3)
    } else {
        image
    };

    let mut gray = image.to_luma8();
    for pixel in gray.pixels_mut() {
        pixel.0[0] = if pixel.0[0] < BINARIZE_THRESHOLD { 0 } else { 255 };
    }
    gray
}

/// Longest trimmed text among the attempts. A missing binary fails the whole
/// batch; other failures count as empty.
fn longest_text(results: Vec<Result<String>>) -> Result<String> {
    let mut best = String::new();
    for result in results {
        match result {
            Ok(text) => {
                let text = text.trim();
                if text.len() > best.len() {
                    best = text.to_string();
                }
            }
            Err(e @ RouterError::ExtractorUnavailable(_)) => return Err(e),
            Err(e) => debug!("OCR attempt failed: {}", e),
        }
    }
    Ok(best)
}

pub fn format_page(number: usize, text: &str) -> String {
    format!("--- Page {} ---\n{}", number, text.trim())
}

fn format_fallback_page(text: &str) -> String {
    format!("--- Page 1 (Fallback Method) ---\n{}", text.trim())
}

impl TextExtractor for OcrExtractor {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pdf", "png", "jpg", "jpeg", "tif", "tiff"]
    }

    fn extract(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(RouterError::FileOperation {
                path: path.to_path_buf(),
                source: std::io::Error::new(ErrorKind::NotFound, "file not found"),
            });
        }

        match extension_of(path).as_deref() {
            Some("pdf") => self.extract_pdf(path),
            _ => self.ocr_image(path),
        }
    }
}
