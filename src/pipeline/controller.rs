//! Stage controller: drives one page through Stage 1, 2 and 3.
//!
//! Providers are borrowed trait objects, so the controller stays testable with the
//! mocks in `providers`. Stage 1 failures abort the request; anything after that
//! degrades a single field and leaves a diagnostic.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enrichment::{analyze, detect_cross_references, enhance_descriptions, summarize};
use crate::evaluation::validation::validate_elements;
use crate::language::{LanguageEnsemble, Vote};
use crate::models::{
    BBox, DescriptionSource, Element, ElementClass, PageImage, Stage, Stage1Result, Stage2Fields,
    Stage2Result, Stage3Fields, Stage3Result, StageResult, TextRegion, VisualDescription,
};

use super::config::PipelineConfig;
use super::diagnostics::{Diagnostics, Step};
use super::error::PipelineError;
use super::invoke::{invoke, CallError};
use super::providers::{Detector, Generator, Recognizer};

/// Confidence attached to a template description.
const TEMPLATE_CONFIDENCE: f32 = 0.5;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One processed page: the requested stage's result and every non-fatal failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub document_id: Uuid,
    pub result: StageResult,
    pub diagnostics: Diagnostics,
    pub created_at: DateTime<Utc>,
}

/// Stage 2 output for one element, plus the failures met producing it.
enum ElementOutput {
    Text(TextRegion),
    Visual(VisualDescription),
}

struct ElementWork {
    output: ElementOutput,
    failures: Vec<(Step, CallError)>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Class- and shape-based description used when the generator fails.
fn template_description(class: ElementClass, bbox: &BBox) -> String {
    let aspect = if bbox.h > 0.0 { bbox.w / bbox.h } else { 1.0 };
    match class {
        ElementClass::Table if aspect > 1.5 => {
            "This is a wide table with many columns displaying structured data.".into()
        }
        ElementClass::Table if aspect < 0.7 => {
            "This is a tall table with many rows displaying structured data.".into()
        }
        ElementClass::Table => "This is a table displaying structured data in a balanced format.".into(),
        ElementClass::Figure if aspect > 1.5 => {
            "This is a wide figure displaying data in a horizontal format.".into()
        }
        ElementClass::Figure if aspect < 0.7 => {
            "This is a tall figure displaying data in a vertical format.".into()
        }
        ElementClass::Figure => "This is a figure displaying data with balanced proportions.".into(),
        other => format!(
            "This is a {} element displaying visual information.",
            other.as_str().to_lowercase()
        ),
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct StageController<'p> {
    detector: &'p dyn Detector,
    recognizer: &'p dyn Recognizer,
    generator: &'p dyn Generator,
    ensemble: &'p LanguageEnsemble,
    config: PipelineConfig,
}

impl<'p> StageController<'p> {
    pub fn new(
        detector: &'p dyn Detector,
        recognizer: &'p dyn Recognizer,
        generator: &'p dyn Generator,
        ensemble: &'p LanguageEnsemble,
        config: PipelineConfig,
    ) -> Self {
        Self {
            detector,
            recognizer,
            generator,
            ensemble,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Layout detection. Any failure here is fatal for the request.
    pub fn stage1(&self, page: &PageImage) -> Result<Stage1Result, PipelineError> {
        let size = page.size();
        if size.is_empty() {
            return Err(PipelineError::detection("page image has zero width or height"));
        }

        let elements = invoke(self.config.call_timeout(), || self.detector.detect(page))
            .map_err(|e| PipelineError::detection(e.to_string()))?;
        validate_elements(&elements, "detection").map_err(|e| PipelineError::detection(e.to_string()))?;

        tracing::info!(
            elements = elements.len(),
            width = size.w,
            height = size.h,
            "Stage 1 complete"
        );
        Ok(Stage1Result::new(elements, size, page.preprocess_meta()))
    }

    /// Text, language and visual descriptions for every element of `stage1`.
    pub fn stage2(&self, stage1: Stage1Result, page: &PageImage, diagnostics: &mut Diagnostics) -> Stage2Result {
        let work: Vec<Option<ElementWork>> = if self.config.parallel_elements {
            stage1.elements.par_iter().map(|el| self.process_element(el, page)).collect()
        } else {
            stage1.elements.iter().map(|el| self.process_element(el, page)).collect()
        };

        let mut text_regions = Vec::new();
        let mut visual_descriptions = Vec::new();
        for (element, item) in stage1.elements.iter().zip(work) {
            let Some(item) = item else { continue };
            for (step, error) in &item.failures {
                diagnostics.record(Stage::Stage2, *step, Some(element.id), error);
            }
            match item.output {
                ElementOutput::Text(region) => text_regions.push(region),
                ElementOutput::Visual(desc) => visual_descriptions.push(desc),
            }
        }

        // Detected languages by region count, with the mean ensemble confidence of each.
        let mut per_language: Vec<(String, usize, f32)> = Vec::new();
        for region in &text_regions {
            let (Some(lang), Some(conf)) = (&region.lang, region.lang_confidence) else {
                continue;
            };
            match per_language.iter_mut().find(|(l, _, _)| l == lang) {
                Some(entry) => {
                    entry.1 += 1;
                    entry.2 += conf;
                }
                None => per_language.push((lang.clone(), 1, conf)),
            }
        }
        per_language.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let language_confidence = per_language
            .iter()
            .map(|(l, n, sum)| (l.clone(), sum / *n as f32))
            .collect();
        let detected_languages: Vec<String> = per_language.into_iter().map(|(l, _, _)| l).collect();

        tracing::info!(
            text_regions = text_regions.len(),
            visual_descriptions = visual_descriptions.len(),
            languages = ?detected_languages,
            failures = diagnostics.failed_steps(Stage::Stage2).len(),
            "Stage 2 complete"
        );

        stage1.extend(Stage2Fields {
            text_regions,
            visual_descriptions,
            detected_languages,
            language_confidence,
        })
    }

    fn process_element(&self, element: &Element, page: &PageImage) -> Option<ElementWork> {
        if element.class.is_textual() {
            Some(self.read_text(element, page))
        } else if element.class.is_visual() {
            Some(self.describe_visual(element, page))
        } else {
            None
        }
    }

    fn read_text(&self, element: &Element, page: &PageImage) -> ElementWork {
        let timeout = self.config.call_timeout();
        let mut failures = Vec::new();
        let mut region = TextRegion {
            element_id: element.id,
            bbox: element.bbox,
            text: None,
            lang: None,
            score: None,
            lang_confidence: None,
            low_language_confidence: false,
        };

        match invoke(timeout, || self.recognizer.recognize(page, element.bbox)) {
            Ok(recognition) => {
                let text = normalize_whitespace(&recognition.text);
                region.score = Some(recognition.confidence.clamp(0.0, 1.0));
                if !text.is_empty() {
                    let decision = self.ensemble.identify_within(&text, timeout);
                    let broken: Vec<CallError> =
                        decision.per_method_votes.iter().filter_map(Vote::call_error).collect();
                    // Only a total failure leaves the language empty.
                    let all_broken = !broken.is_empty() && broken.len() == decision.per_method_votes.len();
                    if !all_broken {
                        region.lang = Some(decision.language);
                        region.lang_confidence = Some(decision.confidence);
                        region.low_language_confidence = decision.low_confidence;
                    }
                    failures.extend(broken.into_iter().map(|e| (Step::LanguageIdentification, e)));
                }
                region.text = Some(text);
            }
            Err(e) => failures.push((Step::Recognition, e)),
        }

        ElementWork {
            output: ElementOutput::Text(region),
            failures,
        }
    }

    fn describe_visual(&self, element: &Element, page: &PageImage) -> ElementWork {
        let mut failures = Vec::new();
        let mut desc = VisualDescription {
            element_id: element.id,
            bbox: element.bbox,
            element_type: element.class,
            generated_text: None,
            confidence: None,
            source: None,
        };

        match invoke(self.config.call_timeout(), || {
            self.generator.describe(page, element.bbox, element.class)
        }) {
            Ok(generation) => {
                desc.generated_text = Some(generation.text.trim().to_string());
                desc.confidence = Some(generation.confidence.clamp(0.0, 1.0));
                desc.source = Some(DescriptionSource::Generator);
            }
            Err(e) => {
                if self.config.template_fallback {
                    desc.generated_text = Some(template_description(element.class, &element.bbox));
                    desc.confidence = Some(TEMPLATE_CONFIDENCE);
                    desc.source = Some(DescriptionSource::Template);
                }
                failures.push((Step::Generation, e));
            }
        }

        ElementWork {
            output: ElementOutput::Visual(desc),
            failures,
        }
    }

    /// Run one enrichment sub-step; a failure is recorded and yields `None`.
    fn guarded<T, E: Display>(
        &self,
        diagnostics: &mut Diagnostics,
        step: Step,
        call: impl FnOnce() -> Result<T, E>,
    ) -> Option<T> {
        match invoke(self.config.call_timeout(), call) {
            Ok(value) => Some(value),
            Err(e) => {
                diagnostics.record(Stage::Stage3, step, None, &e);
                None
            }
        }
    }

    /// Semantic enrichment over a finished Stage 2 result.
    pub fn stage3(&self, stage2: Stage2Result, diagnostics: &mut Diagnostics) -> Stage3Result {
        let config = &self.config.enrichment;

        let cross_references = self
            .guarded(diagnostics, Step::CrossReference, || detect_cross_references(&stage2, config))
            .unwrap_or_default();
        let semantic_analysis = self.guarded(diagnostics, Step::SemanticAnalysis, || analyze(&stage2, config));
        let enhanced_descriptions = self
            .guarded(diagnostics, Step::Enhancement, || {
                enhance_descriptions(&stage2, &cross_references, config)
            })
            .unwrap_or_default();

        let failed: Vec<&str> = diagnostics
            .failed_steps(Stage::Stage3)
            .iter()
            .map(Step::as_str)
            .collect();
        let summary = self.guarded(diagnostics, Step::Summary, || {
            summarize(&stage2, &cross_references, &failed, config)
        });

        tracing::info!(
            cross_references = cross_references.len(),
            enhanced = enhanced_descriptions.len(),
            has_analysis = semantic_analysis.is_some(),
            has_summary = summary.is_some(),
            "Stage 3 complete"
        );

        stage2.extend(Stage3Fields {
            enhanced_descriptions,
            semantic_analysis,
            cross_references,
            summary,
        })
    }

    /// Run every stage up to `stage`, in order.
    pub fn process(&self, page: &PageImage, stage: Stage) -> Result<DocumentOutcome, PipelineError> {
        let document_id = Uuid::new_v4();
        let span = tracing::info_span!("document", %document_id, %stage);
        let _guard = span.enter();

        let mut diagnostics = Diagnostics::new();
        let stage1 = self.stage1(page)?;
        let result = match stage {
            Stage::Stage1 => StageResult::Stage1(stage1),
            Stage::Stage2 => StageResult::Stage2(Box::new(self.stage2(stage1, page, &mut diagnostics))),
            Stage::Stage3 => {
                let stage2 = self.stage2(stage1, page, &mut diagnostics);
                StageResult::Stage3(Box::new(self.stage3(stage2, &mut diagnostics)))
            }
        };

        Ok(DocumentOutcome {
            document_id,
            result,
            diagnostics,
            created_at: Utc::now(),
        })
    }

    /// `process` with a numeric stage, as received from a request.
    pub fn process_request(&self, page: &PageImage, stage: u8) -> Result<DocumentOutcome, PipelineError> {
        let stage = Stage::try_from(stage)?;
        self.process(page, stage)
    }
}
