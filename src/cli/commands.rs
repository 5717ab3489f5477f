// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::{CodesArgs, CropArgs, ExtractArgs, FileArgs, OcrBackend, TextArgs};
use crate::analyzer::DocumentAnalyzer;
use crate::config::DocflowConfig;
use crate::document::PageImage;
use crate::extraction::{
    ChatCompletionsModel, DocumentIntelligenceExtractor, ExtractionError, FieldExtractor,
    FieldResult, LocalOcrExtractor, TextExtractor, TwoStageExtractor,
};
use crate::segmentation::{
    load_segmentation_model, ClassId, LabelTable, SegmentationError, SegmentationModel,
    SegmentationResult,
};

/// Print the file kind
pub async fn kind(args: FileArgs) -> Result<()> {
    let config = load_config()?;
    let analyzer = analyzer(&config, Stages::default())?;
    println!("{}", analyzer.determine_file_kind(args.file.as_path())?);
    Ok(())
}

/// Print page count and per-page dimensions
pub async fn pages(args: FileArgs) -> Result<()> {
    let config = load_config()?;
    let pages = config.normalizer().normalize(args.file.as_path())?;

    println!("📄 {} page(s)", pages.len());
    for (index, page) in pages.iter().enumerate() {
        println!("  page {}: {}x{}", index + 1, page.width(), page.height());
    }
    Ok(())
}

/// Print decoded QR payloads, optionally saving the crops
pub async fn codes(args: CodesArgs) -> Result<()> {
    let config = load_config()?;
    let analyzer = analyzer(&config, Stages::default())?;

    let crops = analyzer.extract_codes(args.file.as_path())?;
    if crops.is_empty() {
        println!("No codes found");
        return Ok(());
    }

    let scanner = crate::vision::CodeScanner::new();
    for crop in &crops {
        match scanner.decode(crop) {
            Some(payload) => println!("{}", payload),
            None => warn!("Code region found but not decoded"),
        }
    }

    if let Some(dir) = &args.out_dir {
        let written = write_crops(&crops, dir, "code")?;
        println!("✅ Wrote {} crop(s) to {}", written, dir.display());
    }
    Ok(())
}

/// Print per-page regions as JSON
pub async fn segment(args: FileArgs) -> Result<()> {
    let config = load_config()?;
    let analyzer = analyzer(
        &config,
        Stages {
            segmentation: true,
            ..Stages::default()
        },
    )?;

    let results = analyzer.segment_document(args.file.as_path())?;
    let pages: Vec<Value> = results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            json!({
                "page": index + 1,
                "regions": regions_json(result.as_ref(), analyzer.labels()),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&pages)?);
    Ok(())
}

/// Write crops for the selected labels and class ids
pub async fn crop(args: CropArgs) -> Result<()> {
    let config = load_config()?;
    let analyzer = analyzer(
        &config,
        Stages {
            segmentation: true,
            ..Stages::default()
        },
    )?;

    let inverse = analyzer.labels().inverse();
    let mut class_ids: Vec<ClassId> = args.class_ids.clone();
    for label in &args.labels {
        match inverse.get(label) {
            Some(id) => class_ids.push(*id),
            None => warn!("Unknown label '{}'", label),
        }
    }

    match analyzer.get_by_id(args.file.as_path(), &class_ids)? {
        Some(crops) => {
            let written = write_crops(&crops, &args.out_dir, "region")?;
            println!("✅ Wrote {} crop(s) to {}", written, args.out_dir.display());
        }
        None => println!("No matching regions"),
    }
    Ok(())
}

/// Print the document text
pub async fn text(args: TextArgs) -> Result<()> {
    let config = load_config()?;
    let analyzer = analyzer(
        &config,
        Stages {
            ocr: Some(args.ocr),
            ..Stages::default()
        },
    )?;

    println!("{}", analyzer.extract_text(args.file.as_path()).await?);
    Ok(())
}

/// Print extracted fields as pretty JSON
pub async fn extract(args: ExtractArgs) -> Result<()> {
    let config = load_config()?;
    let analyzer = analyzer(
        &config,
        Stages {
            ocr: Some(args.ocr),
            fields: true,
            ..Stages::default()
        },
    )?;

    let result = analyzer.extract_fields(args.file.as_path(), &args.fields).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn load_config() -> Result<DocflowConfig> {
    let config = DocflowConfig::from_env();
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

/// Stages a command needs configured backends for
#[derive(Debug, Default, Clone, Copy)]
struct Stages {
    segmentation: bool,
    ocr: Option<OcrBackend>,
    fields: bool,
}

/// Build an analyzer wiring only the requested stages
///
/// Stages not requested get a stand-in that reports itself unconfigured,
/// so commands never load a model or contact a service they do not use.
fn analyzer(config: &DocflowConfig, stages: Stages) -> Result<DocumentAnalyzer> {
    let segmentation: Arc<dyn SegmentationModel> = if stages.segmentation {
        load_segmentation_model(&config.segmentation.model, &config.segmentation)?
    } else {
        Arc::new(Unconfigured)
    };

    let text: Arc<dyn TextExtractor> = match stages.ocr {
        Some(OcrBackend::Local) => {
            let model = config
                .ocr_model()
                .ok_or_else(|| anyhow!("DOCFLOW_OCR_COMMAND is empty"))?;
            info!("Local OCR: {}", model.program());
            Arc::new(LocalOcrExtractor::new(model))
        }
        Some(OcrBackend::Remote) => Arc::new(
            DocumentIntelligenceExtractor::from_config(&config.document_intelligence)
                .context("Remote OCR requires DOCUMENT_INTELLIGENCE_ENDPOINT and _KEY")?,
        ),
        None => Arc::new(Unconfigured),
    };

    if stages.fields {
        let model = ChatCompletionsModel::from_config(&config.llm)
            .context("Field extraction requires LLM_ENDPOINT")?;
        let extractor = Arc::new(TwoStageExtractor::new(text, Arc::new(model)));
        return Ok(DocumentAnalyzer::with_two_stage(
            config.normalizer(),
            segmentation,
            extractor,
        ));
    }

    Ok(DocumentAnalyzer::new(
        config.normalizer(),
        segmentation,
        text,
        Arc::new(Unconfigured),
    ))
}

fn regions_json(result: Option<&SegmentationResult>, labels: &LabelTable) -> Value {
    let Some(result) = result else {
        return Value::Array(Vec::new());
    };
    Value::Array(
        result
            .iter()
            .flat_map(|(class_id, boxes)| {
                boxes.iter().map(move |bbox| {
                    json!({
                        "class_id": class_id,
                        "label": labels.label(class_id),
                        "box": bbox,
                    })
                })
            })
            .collect(),
    )
}

fn write_crops(crops: &[PageImage], dir: &Path, prefix: &str) -> Result<usize> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    for (index, crop) in crops.iter().enumerate() {
        let path = dir.join(format!("{}_{:03}.png", prefix, index + 1));
        crop.image()
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(crops.len())
}

/// Stand-in for stages a command does not use
struct Unconfigured;

impl SegmentationModel for Unconfigured {
    fn labels(&self) -> &LabelTable {
        static EMPTY: std::sync::OnceLock<LabelTable> = std::sync::OnceLock::new();
        EMPTY.get_or_init(LabelTable::default)
    }

    fn segment(&self, _image: &PageImage) -> Result<Option<SegmentationResult>, SegmentationError> {
        Err(SegmentationError::Inference(
            "no segmentation backend configured".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

#[async_trait]
impl TextExtractor for Unconfigured {
    async fn extract_text(&self, _images: &[PageImage]) -> Result<String, ExtractionError> {
        Err(ExtractionError::backend(
            "unconfigured",
            "no OCR backend configured",
        ))
    }

    fn name(&self) -> &'static str {
        "unconfigured"
    }
}

#[async_trait]
impl FieldExtractor for Unconfigured {
    async fn extract_fields(
        &self,
        _text: &str,
        _fields: &[String],
    ) -> Result<FieldResult, ExtractionError> {
        Err(ExtractionError::backend(
            "unconfigured",
            "no language model configured",
        ))
    }
}
