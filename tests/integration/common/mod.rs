//! Shared helpers for the integration tests.
//!
//! Test PDFs are generated on the fly. Each page gets a distinct MediaBox
//! width so that the merged page order can be read back.

use filetime::FileTime;
use lopdf::{Document, Object, dictionary};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use returnscan::Config;
use returnscan::config::DisposalMode;
use returnscan::merge::Merger;
use returnscan::merge::pages::{PageRotation, page_rotation_degrees};
use returnscan::osd::{OrientationDetector, OsdError, PageRenderer, RotationDetector};
use returnscan::watch::Watcher;

/// Write a PDF whose pages have the given MediaBox widths.
pub fn write_pdf(dir: &Path, name: &str, widths: &[i64]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = widths
        .iter()
        .map(|&width| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), 800.into()],
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => widths.len() as i64,
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).expect("Failed to write test PDF");
    path
}

/// Backdate the modification time of `path` by `age`.
pub fn set_age(path: &Path, age: Duration) {
    let modified = SystemTime::now() - age;
    filetime::set_file_mtime(path, FileTime::from_system_time(modified))
        .expect("Failed to set modification time");
}

/// MediaBox widths of a PDF's pages, in page order.
pub fn page_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).expect("Failed to load merged PDF");
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}

/// `/Rotate` of a PDF's pages, in page order.
pub fn page_rotations(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).expect("Failed to load merged PDF");
    doc.get_pages()
        .values()
        .map(|&id| page_rotation_degrees(doc.get_dictionary(id).unwrap()))
        .collect()
}

/// PDFs in `dir` whose names start with `merged_`.
pub fn merged_outputs(dir: &Path) -> Vec<PathBuf> {
    let mut outputs: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "pdf")
                && path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with("merged_"))
        })
        .collect();
    outputs.sort();
    outputs
}

/// Renderer that writes a placeholder image instead of running pdftoppm.
#[derive(Debug, Clone, Copy)]
pub struct StubRenderer;

impl PageRenderer for StubRenderer {
    async fn render_page(
        &self,
        _pdf: &Path,
        _page: u32,
        _dpi: u32,
        out_dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, OsdError> {
        let image = out_dir.join(format!("{stem}.png"));
        tokio::fs::write(&image, b"png").await?;
        Ok(image)
    }
}

/// Orientation detector answering from a table keyed by image stem
/// (`front_0001`, `back_0003`, ...). Unlisted pages are upright.
#[derive(Debug, Clone, Default)]
pub struct StubOsd {
    angles: HashMap<String, PageRotation>,
}

impl StubOsd {
    pub fn with(mut self, stem: &str, rotation: PageRotation) -> Self {
        self.angles.insert(stem.to_string(), rotation);
        self
    }
}

impl OrientationDetector for StubOsd {
    async fn detect(&self, image: &Path) -> Result<PageRotation, OsdError> {
        let stem = image
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.angles.get(&stem).copied().unwrap_or_default())
    }
}

/// Configuration for a single-cycle run over `dir`.
pub fn test_config(dir: &Path, disposal: DisposalMode) -> Config {
    let mut config = Config::new(dir);
    config.disposal = disposal;
    config.once = true;
    config.jobs = Some(2);
    config
}

/// Watcher backed by the stub renderer and detector.
pub fn stub_watcher(config: Config, osd: StubOsd) -> Watcher<StubRenderer, StubOsd> {
    let merger = Merger::new(RotationDetector::new(StubRenderer, osd)).with_jobs(2);
    Watcher::new(config, merger)
}

/// Collects formatted log lines emitted on the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route warnings and errors into this buffer until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines_containing(&self, needle: &str) -> Vec<String> {
        let buffer = self.0.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_owned)
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
