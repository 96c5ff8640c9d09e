use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::pdf::tools::PageItem;

#[derive(Parser)]
#[command(name = "pdfcompile")]
#[command(about = "Assemble PDFs and images into documents, with an HR payroll workflow and MCP server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server
    Mcp,

    /// Display PDF metadata
    Info {
        /// PDF file to inspect
        path: PathBuf,

        /// Print the page listing and metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Combine PDFs and images into one PDF
    #[command(alias = "compile")]
    Merge {
        /// PDF, JPEG or PNG files, in output order
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,

        /// Output file (default: merged_<timestamp>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract page ranges to a new PDF
    #[command(alias = "cat")]
    Extract {
        /// PDF file to extract from
        path: PathBuf,

        /// Page ranges (e.g., "1-3,5,8-10")
        pages: String,

        /// Output file (default: extracted.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Split a PDF into consecutive parts
    #[command(alias = "burst")]
    Split {
        /// PDF file to split
        path: PathBuf,

        /// Pages that start a new part (e.g., "3,6")
        #[arg(long, conflicts_with = "every", required_unless_present = "every")]
        pages: Option<String>,

        /// Start a new part every N pages
        #[arg(long)]
        every: Option<usize>,

        /// Output directory (default: current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Rotate pages
    Rotate {
        /// PDF file to rotate
        path: PathBuf,

        /// Page ranges, or "all"
        pages: String,

        /// Clockwise rotation: 0, 90, 180 or 270
        #[arg(short, long, allow_negative_numbers = true)]
        degrees: i64,

        /// Output file (default: rotated.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interleave the pages of two PDFs
    Mix {
        first: PathBuf,
        second: PathBuf,

        /// Output file (default: mixed.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a PDF from individual pages of several files
    Arrange {
        /// Pages as FILE:PAGE[:ROTATION]
        #[arg(required = true)]
        items: Vec<PageItem>,

        /// Output file (default: arranged.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// HR document workflow over a numbered folder tree
    Rh {
        #[command(subcommand)]
        command: RhCommands,
    },
}

#[derive(Args)]
pub struct RootArgs {
    /// Root folder holding the numbered folders
    #[arg(long, env = "PDFCOMPILE_ROOT")]
    pub root: PathBuf,

    /// Year of the month labels
    #[arg(long, default_value_t = chrono::Local::now().year())]
    pub year: i32,
}

#[derive(Args)]
pub struct MonthArgs {
    /// Months as 1-12 or MM_YYYY, comma separated or repeated
    #[arg(short, long, required = true, value_delimiter = ',')]
    pub months: Vec<String>,
}

#[derive(Subcommand)]
pub enum RhCommands {
    /// Scan the group folders and report changes since the last scan
    Scan {
        #[command(flatten)]
        root: RootArgs,
        #[command(flatten)]
        months: MonthArgs,
        #[arg(long)]
        json: bool,
    },

    /// Compile the base document of each month
    Base {
        #[command(flatten)]
        root: RootArgs,
        #[command(flatten)]
        months: MonthArgs,

        /// Compile months with too few groups without asking
        #[arg(short, long)]
        yes: bool,

        /// Compile all months into a single document
        #[arg(long)]
        combine: bool,
    },

    /// List the months that have a base document
    Bases {
        /// Root folder holding the numbered folders
        #[arg(long, env = "PDFCOMPILE_ROOT")]
        root: PathBuf,
    },

    /// Find the people with documents in the selected months
    Persons {
        #[command(flatten)]
        root: RootArgs,
        #[command(flatten)]
        months: MonthArgs,
        #[arg(long)]
        json: bool,
    },

    /// Join each person's document with the month's base document
    Final {
        #[command(flatten)]
        root: RootArgs,
        #[command(flatten)]
        months: MonthArgs,

        /// Only these people (default: everyone found)
        #[arg(short, long)]
        person: Vec<String>,
    },
}
