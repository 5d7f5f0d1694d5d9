//! Context-augmented rewrites of Stage 2 visual descriptions.

use crate::models::{
    BBox, CrossReference, DescriptionContext, ElementClass, EnhancedDescription, PagePosition, PageSize,
    Stage2Result,
};

use super::semantic::{dominant_languages, language_distribution};
use super::{EnrichmentConfig, EnrichmentError};

fn page_position(bbox: &BBox, page: PageSize) -> PagePosition {
    let (_, cy) = bbox.center();
    let rel = cy / page.h as f32;
    if rel < 1.0 / 3.0 {
        PagePosition::Top
    } else if rel < 2.0 / 3.0 {
        PagePosition::Middle
    } else {
        PagePosition::Bottom
    }
}

fn distance(a: &BBox, b: &BBox) -> f32 {
    let (ax, ay) = a.center();
    let (bx, by) = b.center();
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Type-specific lead-in, skipped when the generator already wrote one.
fn with_lead_in(class: ElementClass, text: &str) -> String {
    let lead = match class {
        ElementClass::Table => "This table contains",
        ElementClass::Figure => "This figure shows",
        _ => return text.to_string(),
    };
    let trimmed = text.trim().trim_end_matches('.');
    if trimmed.to_lowercase().starts_with("this ") {
        format!("{}.", trimmed)
    } else {
        format!("{} {}.", lead, lowercase_first(trimmed))
    }
}

fn position_phrase(position: PagePosition) -> &'static str {
    match position {
        PagePosition::Top => "top",
        PagePosition::Middle => "middle",
        PagePosition::Bottom => "bottom",
    }
}

/// One enhanced description per visual description that has base text.
pub fn enhance_descriptions(
    stage2: &Stage2Result,
    cross_references: &[CrossReference],
    config: &EnrichmentConfig,
) -> Result<Vec<EnhancedDescription>, EnrichmentError> {
    let page = stage2.size();
    if page.is_empty() {
        return Err(EnrichmentError::EmptyPage);
    }
    let language = dominant_languages(&language_distribution(stage2)).into_iter().next();

    let mut out = Vec::new();
    for desc in &stage2.visual_descriptions {
        let Some(base) = desc.generated_text.as_deref().filter(|t| !t.trim().is_empty()) else {
            continue;
        };

        let mut nearby: Vec<(f32, &str)> = stage2
            .text_regions
            .iter()
            .filter_map(|r| r.text.as_deref().map(|t| (distance(&desc.bbox, &r.bbox), t)))
            .collect();
        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));
        let nearby_text: Vec<String> = nearby
            .into_iter()
            .take(config.max_nearby_text)
            .map(|(_, t)| t.to_string())
            .collect();

        let mut refs: Vec<&CrossReference> = cross_references
            .iter()
            .filter(|r| r.visual_element_id == desc.element_id)
            .collect();
        refs.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        let referenced_by: Vec<usize> = refs.iter().map(|r| r.text_element_id).collect();

        let position = page_position(&desc.bbox, page);
        let mut enhanced_text = with_lead_in(desc.element_type, base);
        enhanced_text.push_str(&format!(
            " It appears at the {} of the page.",
            position_phrase(position)
        ));
        if let Some(label) = refs
            .iter()
            .find_map(|r| r.keyword.as_ref().zip(r.reference_number))
            .map(|(k, n)| format!("{} {}", k, n))
        {
            enhanced_text.push_str(&format!(" The text refers to it as \"{}\".", label));
        } else if !referenced_by.is_empty() {
            enhanced_text.push_str(&format!(
                " It is referenced by {} text region(s).",
                referenced_by.len()
            ));
        }

        out.push(EnhancedDescription {
            element_id: desc.element_id,
            bbox: desc.bbox,
            element_type: desc.element_type,
            base_text: base.to_string(),
            enhanced_text,
            confidence: desc.confidence.unwrap_or(0.0),
            context: DescriptionContext {
                page_position: position,
                nearby_text,
                referenced_by,
                language: language.clone(),
            },
        });
    }

    tracing::debug!(
        descriptions = stage2.visual_descriptions.len(),
        enhanced = out.len(),
        "Descriptions enhanced"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DescriptionSource, Element, PreprocessMeta, Stage1Result, Stage2Fields, TextRegion, VisualDescription,
    };

    fn region(id: usize, y: f32, text: &str) -> TextRegion {
        TextRegion {
            element_id: id,
            bbox: BBox::new(0.0, y, 100.0, 20.0),
            text: Some(text.to_string()),
            lang: Some("en".into()),
            score: Some(0.9),
            lang_confidence: Some(0.9),
            low_language_confidence: false,
        }
    }

    fn visual(id: usize, y: f32, class: ElementClass, text: Option<&str>) -> VisualDescription {
        VisualDescription {
            element_id: id,
            bbox: BBox::new(0.0, y, 100.0, 100.0),
            element_type: class,
            generated_text: text.map(str::to_string),
            confidence: text.map(|_| 0.7),
            source: text.map(|_| DescriptionSource::Generator),
        }
    }

    fn doc(size: PageSize, regions: Vec<TextRegion>, visuals: Vec<VisualDescription>) -> Stage2Result {
        let elements = regions
            .iter()
            .map(|r| Element::new(r.element_id, r.bbox, ElementClass::Text, 0.9))
            .chain(visuals.iter().map(|v| Element::new(v.element_id, v.bbox, v.element_type, 0.9)))
            .collect();
        Stage1Result::new(
            elements,
            size,
            PreprocessMeta {
                color_type: "Rgb8".into(),
                deskew_angle: None,
                source: None,
            },
        )
        .extend(Stage2Fields {
            text_regions: regions,
            visual_descriptions: visuals,
            ..Stage2Fields::default()
        })
    }

    fn page() -> PageSize {
        PageSize { w: 600, h: 900 }
    }

    #[test]
    fn table_gets_lead_in_position_and_reference() {
        let d = doc(
            page(),
            vec![
                region(0, 10.0, "Title"),
                region(1, 820.0, "See Table 2 below"),
                region(2, 600.0, "Totals"),
                region(3, 860.0, "Footer"),
            ],
            vec![visual(4, 700.0, ElementClass::Table, Some("Quarterly sales figures"))],
        );
        let refs = vec![CrossReference {
            text_element_id: 1,
            visual_element_id: 4,
            strength: 0.9,
            proximity: 0.8,
            lexical: 1.0,
            keyword: Some("table".into()),
            reference_number: Some(2),
        }];
        let out = enhance_descriptions(&d, &refs, &EnrichmentConfig::default()).unwrap();

        assert_eq!(out.len(), 1);
        let e = &out[0];
        assert_eq!(e.base_text, "Quarterly sales figures");
        assert_eq!(
            e.enhanced_text,
            "This table contains quarterly sales figures. It appears at the bottom of the page. \
             The text refers to it as \"table 2\"."
        );
        assert_eq!(e.context.page_position, PagePosition::Bottom);
        assert_eq!(e.context.referenced_by, vec![1]);
        // center y 750: Totals (610) 140, See Table (830) 80, Footer (870) 120
        assert_eq!(e.context.nearby_text, vec!["See Table 2 below", "Footer", "Totals"]);
        assert_eq!(e.context.language.as_deref(), Some("en"));
    }

    #[test]
    fn skips_missing_descriptions_and_keeps_existing_lead_in() {
        let d = doc(
            page(),
            vec![],
            vec![
                visual(0, 0.0, ElementClass::Figure, None),
                visual(1, 350.0, ElementClass::Figure, Some("This chart plots revenue.")),
            ],
        );
        let out = enhance_descriptions(&d, &[], &EnrichmentConfig::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].enhanced_text,
            "This chart plots revenue. It appears at the middle of the page."
        );
        assert_eq!(out[0].context.page_position, PagePosition::Middle);
        assert!(out[0].context.nearby_text.is_empty());
        assert_eq!(out[0].context.language, None);
    }

    #[test]
    fn zero_sized_page_fails() {
        let d = doc(PageSize { w: 0, h: 0 }, vec![], vec![]);
        assert_eq!(
            enhance_descriptions(&d, &[], &EnrichmentConfig::default()),
            Err(EnrichmentError::EmptyPage)
        );
    }
}
