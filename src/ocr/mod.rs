//! Multi-stage OCR: preprocess → extract → organize → script-correct.
//!
//! Stages are strictly ordered. Preprocessing and organizing degrade on
//! failure instead of aborting the job; extraction is the only stage whose
//! failure fails the whole job.

pub mod hangul;

use base64::{engine::general_purpose::STANDARD, Engine};
use futures::future::join_all;

use crate::error::EngineError;
use crate::imaging::{self, NormalizeMode};
use crate::models::EncodedImage;
use crate::providers::Provider;

/// Returned when extraction finishes normally but the pages carry no text.
pub const NO_TEXT_FOUND: &str = "No text was found in the provided images.";

const EXTRACT_PROMPT: &str = "Transcribe every page image below into a hierarchical outline. \
Start with the document title as a level-1 heading, then each major section as a nested \
heading with the page number it appears on in parentheses. Cover every image; do not \
summarize or skip content. Respond with the transcription only.";

const ORGANIZE_PROMPT: &str = "Reformat the raw transcription below into a clean nested \
outline: document title, then major parts, then chapters, then bulleted topics each with \
its page reference. Drop duplicate headings. Keep the original language of the text. \
Respond with the outline only.";

pub struct OcrPipeline<'a> {
    provider: &'a dyn Provider,
}

impl<'a> OcrPipeline<'a> {
    pub fn new(provider: &'a dyn Provider) -> Self {
        Self { provider }
    }

    /// Run the full pipeline over a batch of page images and return the
    /// final corrected text. Intermediate products are not persisted.
    pub async fn run(&self, images: &[EncodedImage]) -> Result<String, EngineError> {
        let job = uuid::Uuid::new_v4();
        log::info!("ocr job {}: {} image(s)", job, images.len());

        let prepared = preprocess(images).await;

        let raw = self.provider.extract_text(&prepared, EXTRACT_PROMPT).await?;
        if raw.trim().is_empty() {
            log::info!("ocr job {}: no text detected", job);
            return Ok(NO_TEXT_FOUND.to_string());
        }

        let organized = self.organize(&raw).await;

        let finished = if hangul::contains_hangul(&organized) {
            hangul::correct(&organized)
        } else {
            organized
        };

        log::info!("ocr job {}: finished, {} chars", job, finished.len());
        Ok(finished)
    }

    /// Second provider pass that cleans up the structure. Skippable: any
    /// failure or empty reply passes the raw transcription through.
    async fn organize(&self, raw: &str) -> String {
        let prompt = format!("{}\n\n{}", ORGANIZE_PROMPT, raw);
        match self.provider.complete(&prompt, 0.2).await {
            Ok(text) if !text.trim().is_empty() => dedup_headings(&text),
            Ok(_) => raw.to_string(),
            Err(e) => {
                log::warn!("organize stage failed, keeping raw transcription: {}", e);
                raw.to_string()
            }
        }
    }
}

/// Normalize every image for OCR independently. A failing image falls back
/// to its original encoding; it never takes its siblings down with it.
async fn preprocess(images: &[EncodedImage]) -> Vec<EncodedImage> {
    let tasks = images.iter().enumerate().map(|(i, img)| async move {
        let bytes = match STANDARD.decode(&img.data) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("image #{}: undecodable base64, using original ({})", i + 1, e);
                return img.clone();
            }
        };
        match imaging::normalize(&bytes, NormalizeMode::Ocr) {
            Ok(normalized) => normalized,
            Err(e) => {
                log::warn!("image #{}: preprocessing failed, using original ({})", i + 1, e);
                img.clone()
            }
        }
    });
    join_all(tasks).await
}

/// Drop heading lines that already appeared earlier in the outline. The
/// model is asked to do this too; the sweep makes it deterministic.
fn dedup_headings(text: &str) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut kept: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            let key = trimmed.trim_start_matches('#').trim().to_string();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
        }
        kept.push(line);
    }

    kept.join("\n")
}
