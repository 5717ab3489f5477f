// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Docflow document analysis CLI
#[derive(Parser, Debug)]
#[command(name = "docflow")]
#[command(version)]
#[command(about = "Classify, segment, OCR and extract fields from documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print how the document's text would be obtained
    Kind(FileArgs),

    /// Print the page count and page sizes
    Pages(FileArgs),

    /// Decode QR codes on every page
    Codes(CodesArgs),

    /// Print layout regions per page as JSON
    Segment(FileArgs),

    /// Write region crops for labels or class ids
    Crop(CropArgs),

    /// Print the document text
    Text(TextArgs),

    /// Extract named fields as JSON
    Extract(ExtractArgs),
}

/// Arguments for commands taking only a document
#[derive(Args, Debug)]
pub struct FileArgs {
    /// Document path (PDF, image or text file)
    pub file: PathBuf,
}

/// Arguments for the codes command
#[derive(Args, Debug)]
pub struct CodesArgs {
    /// Document path
    pub file: PathBuf,

    /// Also write each code crop as PNG into this directory
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

/// Arguments for the crop command
#[derive(Args, Debug)]
#[command(group(
    clap::ArgGroup::new("selector")
        .required(true)
        .multiple(true)
        .args(["labels", "class_ids"])
))]
pub struct CropArgs {
    /// Document path
    pub file: PathBuf,

    /// Region label to crop (repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Region class id to crop (repeatable)
    #[arg(long = "class-id")]
    pub class_ids: Vec<u32>,

    /// Directory receiving the PNG crops
    #[arg(long)]
    pub out_dir: PathBuf,
}

/// Text extraction backend selection
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OcrBackend {
    /// Local OCR program (DOCFLOW_OCR_COMMAND)
    #[default]
    Local,
    /// Remote document intelligence service
    Remote,
}

/// Arguments for the text command
#[derive(Args, Debug)]
pub struct TextArgs {
    /// Document path
    pub file: PathBuf,

    /// OCR backend for scanned pages and images
    #[arg(long, value_enum, default_value_t = OcrBackend::Local)]
    pub ocr: OcrBackend,
}

/// Arguments for the extract command
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Document path
    pub file: PathBuf,

    /// Comma-separated list of field names
    #[arg(long, value_delimiter = ',', required = true)]
    pub fields: Vec<String>,

    /// OCR backend for scanned pages and images
    #[arg(long, value_enum, default_value_t = OcrBackend::Local)]
    pub ocr: OcrBackend,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Kind(args) => commands::kind(args).await,
        Commands::Pages(args) => commands::pages(args).await,
        Commands::Codes(args) => commands::codes(args).await,
        Commands::Segment(args) => commands::segment(args).await,
        Commands::Crop(args) => commands::crop(args).await,
        Commands::Text(args) => commands::text(args).await,
        Commands::Extract(args) => commands::extract(args).await,
    }
}

/// Line printed to stderr when a command fails, with the context chain
pub fn error_line(err: &anyhow::Error) -> String {
    format!("❌ Error: {:#}", err)
}
