use anyhow::{Context, Result};
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::{merged_file_name, split_part_name, PDF_CONTENT_TYPE};
use crate::page_range::{every_n_pages, parse_split_points, PageSelection};
use crate::pdf::tools::{self, inspect, PageItem, PageListing};
use crate::pdf::{merge_sources, PdfDocument};
use crate::rh::compile::{self, JoinSummary};
use crate::rh::persons::{save_persons, scan_or_load_persons, scan_persons, PersonRecord};
use crate::rh::scan::{scan, MonthReport, ScanResult, Sufficiency};
use crate::rh::session::Session;
use crate::rh::store::FsStore;
use crate::rh::{month_label, Layout};
use crate::source::SourceFile;

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfMergeRequest {
    #[schemars(description = "PDF, JPEG or PNG files in output order (at least two)")]
    pub inputs: Vec<String>,
    #[schemars(description = "Output file path (default: merged_<timestamp>.pdf)")]
    pub output: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfExtractRequest {
    #[schemars(description = "Path to the source PDF file")]
    pub path: String,
    #[schemars(description = "Page ranges (e.g., '1-3,5,8-10')")]
    pub pages: String,
    #[schemars(description = "Output file path")]
    pub output: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfSplitRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
    #[schemars(description = "Pages that start a new part (e.g., '3,6')")]
    pub pages: Option<String>,
    #[schemars(description = "Start a new part every N pages")]
    pub every: Option<usize>,
    #[schemars(description = "Output directory")]
    pub output_dir: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfRotateRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
    #[schemars(description = "Page ranges, or 'all'")]
    pub pages: String,
    #[schemars(description = "Clockwise rotation: 0, 90, 180 or 270")]
    pub degrees: i64,
    #[schemars(description = "Output file path")]
    pub output: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfMixRequest {
    #[schemars(description = "First PDF; its pages come first in each pair")]
    pub first: String,
    #[schemars(description = "Second PDF")]
    pub second: String,
    #[schemars(description = "Output file path")]
    pub output: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ArrangePage {
    #[schemars(description = "Path to the source PDF file")]
    pub file: String,
    #[schemars(description = "Page number in that file (1-based)")]
    pub page: usize,
    #[schemars(description = "Degrees added to the page's rotation (default: 0)")]
    #[serde(default)]
    pub rotation: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfArrangeRequest {
    #[schemars(description = "Pages in output order")]
    pub pages: Vec<ArrangePage>,
    #[schemars(description = "Output file path")]
    pub output: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RhRootRequest {
    #[schemars(description = "Root folder holding the numbered folders")]
    pub root: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RhMonthsRequest {
    #[schemars(description = "Root folder holding the numbered folders")]
    pub root: String,
    #[schemars(description = "Year of the month labels, e.g. '2025'")]
    pub year: String,
    #[schemars(description = "Months as '1'-'12' or 'MM_YYYY'")]
    pub months: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RhBaseRequest {
    #[schemars(description = "Root folder holding the numbered folders")]
    pub root: String,
    #[schemars(description = "Year of the month labels, e.g. '2025'")]
    pub year: String,
    #[schemars(description = "Months as '1'-'12' or 'MM_YYYY'")]
    pub months: Vec<String>,
    #[schemars(description = "Compile months with fewer than half the groups (default: false)")]
    #[serde(default)]
    pub allow_insufficient: bool,
    #[schemars(description = "Compile all months into a single document (default: false)")]
    #[serde(default)]
    pub combine: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RhFinalRequest {
    #[schemars(description = "Root folder holding the numbered folders")]
    pub root: String,
    #[schemars(description = "Year of the month labels, e.g. '2025'")]
    pub year: String,
    #[schemars(description = "Months as '1'-'12' or 'MM_YYYY'")]
    pub months: Vec<String>,
    #[schemars(description = "Only these people (default: everyone found)")]
    #[serde(default)]
    pub persons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PdfServer {
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

impl PdfServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for PdfServer {
    fn default() -> Self {
        Self::new()
    }
}

fn respond<T: Serialize>(result: Result<T>) -> String {
    match result {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|e| format!("Error: {}", e)),
        Err(e) => format!("Error: {:#}", e),
    }
}

fn write_pdf(doc: &mut lopdf::Document, output: &Path) -> Result<WrittenFile> {
    let page_count = doc.get_pages().len();
    PdfDocument::save(doc, output)?;
    Ok(WrittenFile {
        output_path: output.display().to_string(),
        page_count,
        content_type: PDF_CONTENT_TYPE,
    })
}

fn open_root(root: &str) -> Result<FsStore> {
    let root = Path::new(root);
    anyhow::ensure!(root.is_dir(), "Root folder not found: {}", root.display());
    Ok(FsStore::new(root))
}

fn session(year: &str, months: &[String]) -> Session {
    let months = months.iter().map(|m| month_label(year, m)).collect();
    Session::new(year, months)
}

#[tool_router]
impl PdfServer {
    #[tool(description = "Get PDF metadata including title, author, creator, producer, creation date, page count and the page list")]
    fn pdf_info(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        respond(PdfDocument::open(&path).map(|doc| {
            let info = doc.get_info();
            PdfInfoResult {
                listing: inspect(&doc),
                title: info.title,
                author: info.author,
                creator: info.creator,
                producer: info.producer,
                creation_date: info.creation_date,
            }
        }))
    }

    #[tool(description = "Merge PDF, JPEG and PNG files into one PDF. PDFs are copied whole; each image becomes one A4 page.")]
    fn pdf_merge(&self, Parameters(req): Parameters<PdfMergeRequest>) -> String {
        respond((|| -> Result<WrittenFile> {
            anyhow::ensure!(req.inputs.len() >= 2, "At least two files are required to merge");
            let sources = req
                .inputs
                .iter()
                .map(SourceFile::read)
                .collect::<Result<Vec<_>>>()?;
            let mut merged = merge_sources(&sources)?;
            let output = req
                .output
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(merged_file_name(chrono::Local::now())));
            write_pdf(&mut merged, &output)
        })())
    }

    #[tool(description = "Extract specific pages from a PDF and save them to a new file, in the order listed")]
    fn pdf_extract(&self, Parameters(req): Parameters<PdfExtractRequest>) -> String {
        respond((|| -> Result<WrittenFile> {
            let doc = PdfDocument::open(&req.path)?;
            let mut new_doc = tools::extract(&doc, &req.pages)?;
            write_pdf(&mut new_doc, Path::new(&req.output))
        })())
    }

    #[tool(description = "Split a PDF into consecutive parts, either at given pages or every N pages")]
    fn pdf_split(&self, Parameters(req): Parameters<PdfSplitRequest>) -> String {
        respond((|| -> Result<Vec<WrittenFile>> {
            let doc = PdfDocument::open(&req.path)?;
            let total = doc.page_count();
            let points = match (&req.pages, req.every) {
                (Some(pages), _) => parse_split_points(pages, total),
                (None, Some(n)) if n > 0 => every_n_pages(n, total),
                _ => anyhow::bail!("Either 'pages' or a positive 'every' is required"),
            };

            let dir = Path::new(&req.output_dir);
            let input = Path::new(&req.path);
            tools::split(&doc, &points)?
                .into_iter()
                .enumerate()
                .map(|(i, mut part)| write_pdf(&mut part, &dir.join(split_part_name(input, i + 1))))
                .collect::<Result<Vec<_>>>()
        })())
    }

    #[tool(description = "Rotate pages of a PDF clockwise by 0, 90, 180 or 270 degrees")]
    fn pdf_rotate(&self, Parameters(req): Parameters<PdfRotateRequest>) -> String {
        respond((|| -> Result<WrittenFile> {
            let mut doc = PdfDocument::open(&req.path)?;
            tools::rotate(&mut doc, &PageSelection::parse(&req.pages), req.degrees)?;
            write_pdf(&mut doc.doc, Path::new(&req.output))
        })())
    }

    #[tool(description = "Interleave two PDFs page by page (A1, B1, A2, B2, ...); leftover pages of the longer one follow")]
    fn pdf_mix(&self, Parameters(req): Parameters<PdfMixRequest>) -> String {
        respond((|| -> Result<WrittenFile> {
            let first = PdfDocument::open(&req.first)?;
            let second = PdfDocument::open(&req.second)?;
            let mut mixed = tools::mix(&first, &second)?;
            write_pdf(&mut mixed, Path::new(&req.output))
        })())
    }

    #[tool(description = "Build a PDF from single pages of several PDFs, each optionally rotated. Pages that cannot be read are skipped and listed.")]
    fn pdf_arrange(&self, Parameters(req): Parameters<PdfArrangeRequest>) -> String {
        respond((|| -> Result<ArrangeResult> {
            let items: Vec<PageItem> = req
                .pages
                .into_iter()
                .map(|p| PageItem {
                    file: PathBuf::from(p.file),
                    page_number: p.page,
                    rotation: p.rotation,
                })
                .collect();
            let mut arrangement = tools::arrange(&items)?;
            anyhow::ensure!(
                arrangement.placed > 0,
                "None of the {} pages could be placed",
                items.len()
            );
            let written = write_pdf(&mut arrangement.document, Path::new(&req.output))?;
            Ok(ArrangeResult {
                written,
                skipped: arrangement.skipped,
            })
        })())
    }

    #[tool(description = "Scan the HR group folders (2-13) for the given months and report which groups have files and what changed since the last scan")]
    fn rh_scan(&self, Parameters(req): Parameters<RhMonthsRequest>) -> String {
        respond((|| -> Result<ScanResult> {
            let store = open_root(&req.root)?;
            let session = session(&req.year, &req.months);
            scan(&store, &store, &Layout::default(), &session.year, &session.selected_months)
        })())
    }

    #[tool(description = "Compile the base document of each month from the HR group folders")]
    fn rh_base(&self, Parameters(req): Parameters<RhBaseRequest>) -> String {
        respond((|| -> Result<JoinSummary> {
            let store = open_root(&req.root)?;
            let layout = Layout::default();
            let session = session(&req.year, &req.months);
            let result = scan(&store, &store, &layout, &session.year, &session.selected_months)?;
            let mut confirm = |_: &MonthReport, _: Sufficiency| req.allow_insufficient;
            Ok(if req.combine {
                compile::join_combined(&store, &layout, &result, &mut confirm)
            } else {
                compile::join_all(&store, &layout, &result, &mut confirm)
            })
        })())
    }

    #[tool(description = "List the months that already have a compiled base document")]
    fn rh_bases(&self, Parameters(RhRootRequest { root }): Parameters<RhRootRequest>) -> String {
        respond(open_root(&root).map(|store| compile::available_base_months(&store, &Layout::default())))
    }

    #[tool(description = "Find the people with documents in folder 1 for the given months and flag similar names")]
    fn rh_persons(&self, Parameters(req): Parameters<RhMonthsRequest>) -> String {
        respond((|| -> Result<Vec<PersonRecord>> {
            let store = open_root(&req.root)?;
            let layout = Layout::default();
            let session = session(&req.year, &req.months);
            let persons = scan_persons(&store, &layout, &session.selected_months)?;
            save_persons(&store, &layout, &persons)?;
            Ok(persons)
        })())
    }

    #[tool(description = "Join each person's document with the month's base document into a final PDF")]
    fn rh_final(&self, Parameters(req): Parameters<RhFinalRequest>) -> String {
        respond((|| -> Result<JoinSummary> {
            let store = open_root(&req.root)?;
            let layout = Layout::default();
            let session = session(&req.year, &req.months);
            let persons = scan_or_load_persons(&store, &layout, &session.selected_months)
                .context("No person list available")?;
            let session = session.with_persons(persons).with_selected_persons(req.persons.clone());
            Ok(compile::join_final(
                &store,
                &layout,
                &session.target_persons(),
                &session.selected_months,
            ))
        })())
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfInfoResult {
    #[serde(flatten)]
    pub listing: PageListing,
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenFile {
    pub output_path: String,
    pub page_count: usize,
    pub content_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ArrangeResult {
    #[serde(flatten)]
    pub written: WrittenFile,
    /// Items left out, as `file:page`.
    pub skipped: Vec<String>,
}

impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF assembly tools. Use pdf_info to inspect a document, pdf_merge to combine PDFs \
                 and images, pdf_extract, pdf_split, pdf_rotate, pdf_mix and pdf_arrange to rework pages. \
                 The rh_* tools run the HR workflow over a numbered folder tree: rh_scan, then \
                 rh_base to compile monthly base documents, rh_persons and rh_final for the \
                 per-person documents."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server() -> Result<()> {
    let server = PdfServer::new();

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{page_labels, sample_pdf, sample_png};

    #[test]
    fn test_merge_tool_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.png");
        std::fs::write(&a, sample_pdf(2, "A")).unwrap();
        std::fs::write(&b, sample_png(3, 2, false)).unwrap();
        let out = dir.path().join("out.pdf");

        let response = PdfServer::new().pdf_merge(Parameters(PdfMergeRequest {
            inputs: vec![a.display().to_string(), b.display().to_string()],
            output: Some(out.display().to_string()),
        }));
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["pageCount"], 3);
        assert_eq!(json["contentType"], "application/pdf");
        assert_eq!(page_labels(&std::fs::read(&out).unwrap()), vec!["A1", "A2", ""]);
    }

    #[test]
    fn test_errors_are_reported_as_text() {
        let response = PdfServer::new().pdf_info(Parameters(PathRequest {
            path: "/nonexistent/file.pdf".to_string(),
        }));
        assert!(response.starts_with("Error: "));
    }

    #[test]
    fn test_arrange_tool_skips_unreadable_pages() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        std::fs::write(&a, sample_pdf(3, "A")).unwrap();
        let out = dir.path().join("out.pdf");
        let page = |file: &Path, page| ArrangePage {
            file: file.display().to_string(),
            page,
            rotation: 0,
        };

        let response = PdfServer::new().pdf_arrange(Parameters(PdfArrangeRequest {
            pages: vec![page(&a, 3), page(&dir.path().join("missing.pdf"), 1), page(&a, 1)],
            output: out.display().to_string(),
        }));
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["pageCount"], 2);
        assert_eq!(json["skipped"].as_array().unwrap().len(), 1);
        assert_eq!(page_labels(&std::fs::read(&out).unwrap()), vec!["A3", "A1"]);
    }

    #[test]
    fn test_rh_bases_lists_months() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("14")).unwrap();
        std::fs::write(dir.path().join("14/base_02_2025.pdf"), sample_pdf(1, "B")).unwrap();

        let response = PdfServer::new().rh_bases(Parameters(RhRootRequest {
            root: dir.path().display().to_string(),
        }));
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json, serde_json::json!(["02_2025"]));
    }

    #[test]
    fn test_rh_base_respects_allow_insufficient() {
        let dir = tempfile::tempdir().unwrap();
        let month_dir = dir.path().join("2/03_2025");
        std::fs::create_dir_all(&month_dir).unwrap();
        std::fs::write(month_dir.join("doc.pdf"), sample_pdf(1, "D")).unwrap();

        let request = |allow_insufficient| RhBaseRequest {
            root: dir.path().display().to_string(),
            year: "2025".to_string(),
            months: vec!["3".to_string()],
            allow_insufficient,
            combine: false,
        };

        let response = PdfServer::new().rh_base(Parameters(request(false)));
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["created"].as_array().unwrap().len(), 0);
        assert_eq!(json["skipped"][0]["target"], "03_2025");

        let response = PdfServer::new().rh_base(Parameters(request(true)));
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["created"][0], "14/base_03_2025.pdf");
        assert!(dir.path().join("14/base_03_2025.pdf").is_file());
    }
}
