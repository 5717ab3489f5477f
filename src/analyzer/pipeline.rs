// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document analysis orchestration

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::codes;
use super::file_kind::{classify, FileKind};
use super::preprocess::{IdentityPreprocessor, ImagePreprocessor};
use super::types::AnalyzerError;
use crate::document::{DocumentHandle, FileNormalizer, LoadedDocument, PageImage};
use crate::extraction::{FieldExtractor, FieldResult, TextExtractor, TwoStageExtractor};
use crate::segmentation::{ClassId, LabelTable, SegmentationModel, SegmentationResult};
use crate::vision::RegionCropper;

/// Composes normalization, segmentation, cropping and extraction
///
/// Holds no per-call state; one instance can serve concurrent calls.
#[derive(Clone)]
pub struct DocumentAnalyzer {
    normalizer: FileNormalizer,
    segmentation: Arc<dyn SegmentationModel>,
    text_extractor: Arc<dyn TextExtractor>,
    field_extractor: Arc<dyn FieldExtractor>,
    preprocessor: Arc<dyn ImagePreprocessor>,
    cropper: RegionCropper,
}

impl std::fmt::Debug for DocumentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAnalyzer")
            .field("normalizer", &self.normalizer)
            .field("segmentation", &self.segmentation.name())
            .field("text_extractor", &self.text_extractor.name())
            .finish_non_exhaustive()
    }
}

impl DocumentAnalyzer {
    pub fn new(
        normalizer: FileNormalizer,
        segmentation: Arc<dyn SegmentationModel>,
        text_extractor: Arc<dyn TextExtractor>,
        field_extractor: Arc<dyn FieldExtractor>,
    ) -> Self {
        info!(
            "Document analyzer: segmentation={}, text={}",
            segmentation.name(),
            text_extractor.name()
        );
        Self {
            normalizer,
            segmentation,
            text_extractor,
            field_extractor,
            preprocessor: Arc::new(IdentityPreprocessor),
            cropper: RegionCropper::new(),
        }
    }

    /// Analyzer whose text and field stages share one two-stage extractor
    pub fn with_two_stage(
        normalizer: FileNormalizer,
        segmentation: Arc<dyn SegmentationModel>,
        extractor: Arc<TwoStageExtractor>,
    ) -> Self {
        Self::new(normalizer, segmentation, extractor.clone(), extractor)
    }

    /// Run pages through `preprocessor` before segmentation and OCR
    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn ImagePreprocessor>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn normalizer(&self) -> &FileNormalizer {
        &self.normalizer
    }

    /// Label table of the segmentation backend
    pub fn labels(&self) -> &LabelTable {
        self.segmentation.labels()
    }

    pub fn determine_file_kind(
        &self,
        handle: impl Into<DocumentHandle>,
    ) -> Result<FileKind, AnalyzerError> {
        let document = LoadedDocument::load(handle.into())?;
        Ok(classify(&document, self.normalizer.pdf_backend())?.kind)
    }

    pub fn page_count(&self, handle: impl Into<DocumentHandle>) -> Result<usize, AnalyzerError> {
        Ok(self.normalizer.page_count(handle)?)
    }

    pub fn normalize(
        &self,
        handle: impl Into<DocumentHandle>,
    ) -> Result<Vec<PageImage>, AnalyzerError> {
        Ok(self.normalizer.normalize(handle)?)
    }

    /// Full document text
    ///
    /// Native PDF text layers and text files are read directly. Everything
    /// else is rasterized, preprocessed and OCR'd one page per task, with
    /// page texts joined by newlines in page order. Loading, PDF access and
    /// rasterization run on the blocking pool.
    pub async fn extract_text(
        &self,
        handle: impl Into<DocumentHandle>,
    ) -> Result<String, AnalyzerError> {
        let handle = handle.into();
        let normalizer = self.normalizer.clone();
        let preprocessor = Arc::clone(&self.preprocessor);

        let source = tokio::task::spawn_blocking(move || {
            load_text_source(&normalizer, preprocessor.as_ref(), handle)
        })
        .await
        .map_err(|e| AnalyzerError::TaskFailed(e.to_string()))??;

        match source {
            TextSource::Ready(text) => Ok(text),
            TextSource::Pages(pages) => self.ocr_pages(pages).await,
        }
    }

    /// Extract named fields from a document
    ///
    /// The result holds every requested field exactly once, in request
    /// order; fields the model did not find are `None`.
    pub async fn extract_fields<S: AsRef<str>>(
        &self,
        handle: impl Into<DocumentHandle>,
        fields: &[S],
    ) -> Result<FieldResult, AnalyzerError> {
        let fields = dedupe_fields(fields);
        let text = self.extract_text(handle).await?;
        if text.trim().is_empty() {
            warn!("No text extracted; requesting fields from empty content");
        }
        Ok(self.field_extractor.extract_fields(&text, &fields).await?)
    }

    /// Per-page segmentation, in page order
    pub fn segment_document(
        &self,
        handle: impl Into<DocumentHandle>,
    ) -> Result<Vec<Option<SegmentationResult>>, AnalyzerError> {
        let document = LoadedDocument::load(handle.into())?;
        let (_, results) = self.segment_loaded(&document)?;
        Ok(results)
    }

    /// Crops of every region whose class id is in `class_ids`
    ///
    /// Crops come out in page order, then class order within a page, then
    /// box order. `None` when nothing matched.
    pub fn get_by_id(
        &self,
        handle: impl Into<DocumentHandle>,
        class_ids: &[ClassId],
    ) -> Result<Option<Vec<PageImage>>, AnalyzerError> {
        let wanted: BTreeSet<ClassId> = class_ids.iter().copied().collect();
        let document = LoadedDocument::load(handle.into())?;
        let (pages, results) = self.segment_loaded(&document)?;

        let mut crops = Vec::new();
        for (page, result) in pages.iter().zip(&results) {
            let Some(result) = result else { continue };
            for (class_id, boxes) in result.iter() {
                if wanted.contains(&class_id) {
                    crops.extend(self.cropper.crop(page, boxes));
                }
            }
        }

        debug!("{} crop(s) for class ids {:?}", crops.len(), wanted);
        Ok(if crops.is_empty() { None } else { Some(crops) })
    }

    /// Same as [`get_by_id`](Self::get_by_id) with labels resolved through
    /// the label table; unknown labels are ignored
    pub fn get_by_label<S: AsRef<str>>(
        &self,
        handle: impl Into<DocumentHandle>,
        labels: &[S],
    ) -> Result<Option<Vec<PageImage>>, AnalyzerError> {
        let inverse = self.labels().inverse();
        let class_ids: Vec<ClassId> = labels
            .iter()
            .filter_map(|label| {
                let id = inverse.get(label.as_ref()).copied();
                if id.is_none() {
                    debug!("Ignoring unknown label {:?}", label.as_ref());
                }
                id
            })
            .collect();
        self.get_by_id(handle, &class_ids)
    }

    /// See [`codes::extract_codes`]
    pub fn extract_codes(
        &self,
        handle: impl Into<DocumentHandle>,
    ) -> Result<Vec<PageImage>, AnalyzerError> {
        Ok(codes::extract_codes(&self.normalizer, handle)?)
    }

    /// See [`codes::extract_codes_decoded`]
    pub fn extract_codes_decoded(
        &self,
        handle: impl Into<DocumentHandle>,
    ) -> Result<Vec<String>, AnalyzerError> {
        Ok(codes::extract_codes_decoded(&self.normalizer, handle)?)
    }

    /// Normalized pages and their segmentation
    ///
    /// Segmentation sees preprocessed pages; the returned pages are the
    /// untouched ones so crops keep full source fidelity.
    fn segment_loaded(
        &self,
        document: &LoadedDocument,
    ) -> Result<(Vec<PageImage>, Vec<Option<SegmentationResult>>), AnalyzerError> {
        let pages = self.normalizer.normalize_loaded(document)?;
        let prepared = self.preprocessor.preprocess(pages.clone());
        if prepared.len() != pages.len() {
            warn!(
                "Preprocessing changed page count from {} to {}",
                pages.len(),
                prepared.len()
            );
        }

        let results = prepared
            .iter()
            .map(|page| self.segmentation.segment(page))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((pages, results))
    }

    /// OCR each page concurrently and join the texts in page order
    async fn ocr_pages(&self, pages: Vec<PageImage>) -> Result<String, AnalyzerError> {
        let page_count = pages.len();
        let mut tasks = JoinSet::new();
        for (index, page) in pages.into_iter().enumerate() {
            let extractor = Arc::clone(&self.text_extractor);
            tasks.spawn(async move {
                let text = extractor.extract_text(std::slice::from_ref(&page)).await;
                (index, text)
            });
        }

        let mut texts = Vec::with_capacity(page_count);
        while let Some(joined) = tasks.join_next().await {
            let (index, text) = joined.map_err(|e| AnalyzerError::TaskFailed(e.to_string()))?;
            texts.push((index, text?));
        }
        texts.sort_by_key(|(index, _)| *index);

        debug!("OCR finished for {} page(s)", page_count);
        Ok(texts
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Requested field names with later duplicates removed
fn dedupe_fields<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    fields
        .iter()
        .map(|f| f.as_ref())
        .filter(|f| seen.insert(*f))
        .map(str::to_string)
        .collect()
}

/// Text available without OCR, or the pages still to be read
enum TextSource {
    Ready(String),
    Pages(Vec<PageImage>),
}

fn load_text_source(
    normalizer: &FileNormalizer,
    preprocessor: &dyn ImagePreprocessor,
    handle: DocumentHandle,
) -> Result<TextSource, AnalyzerError> {
    let document = LoadedDocument::load(handle)?;
    let classification = classify(&document, normalizer.pdf_backend())?;
    debug!(
        "{} classified as {}",
        document.name().unwrap_or("document"),
        classification.kind
    );

    if let Some(text) = classification.native_text() {
        return Ok(TextSource::Ready(text));
    }
    if classification.kind == FileKind::TextFile {
        return Ok(TextSource::Ready(document.text()?));
    }

    let pages = normalizer.normalize_loaded(&document)?;
    Ok(TextSource::Pages(preprocessor.preprocess(pages)))
}
