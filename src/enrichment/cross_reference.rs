//! Links between text regions and the tables/figures they talk about.
//!
//! Two signals per (text region, visual element) pair:
//! - proximity: `1 - min(1, d / sqrt(2))` where `d` is the distance between bbox
//!   centers with x scaled by page width and y by page height;
//! - lexical: 1.0 when the text names the visual's class followed by a number
//!   ("Figure 2", "तालिका ३"), 0.8 for the bare keyword, else 0.
//!
//! Keywords are looked up in the region's language and in English.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{BBox, CrossReference, ElementClass, PageSize, Stage2Result};

use super::{EnrichmentConfig, EnrichmentError};

const LEXICAL_WITH_NUMBER: f32 = 1.0;
const LEXICAL_KEYWORD_ONLY: f32 = 0.8;

struct KeywordPattern {
    lang: &'static str,
    class: ElementClass,
    regex: Regex,
}

static KEYWORDS: LazyLock<Vec<KeywordPattern>> = LazyLock::new(|| {
    vec![
        latin("en", ElementClass::Figure, "figures?|figs?|charts?|graphs?|diagrams?|images?"),
        latin("en", ElementClass::Table, "tables?|tabs?"),
        // Devanagari (Hindi and Nepali share these)
        attached("hi", ElementClass::Figure, "चित्र|आरेख|ग्राफ"),
        attached("hi", ElementClass::Table, "तालिका|सारणी"),
        attached("ne", ElementClass::Figure, "चित्र|रेखाचित्र|ग्राफ"),
        attached("ne", ElementClass::Table, "तालिका"),
        // Arabic script: allow attached prefixes such as ال and و
        attached("ar", ElementClass::Figure, "شكل|صورة|رسم"),
        attached("ar", ElementClass::Table, "جدول"),
        attached("ur", ElementClass::Figure, "شکل|تصویر|خاکہ"),
        attached("ur", ElementClass::Table, "جدول"),
        attached("fa", ElementClass::Figure, "شکل|تصویر|نمودار"),
        attached("fa", ElementClass::Table, "جدول"),
    ]
});

const NUMBER_SUFFIX: &str = r"(?:\s*(?:no\.?|#|رقم|نمبر|شماره)?\s*(?P<num>\d+))?";

/// Whole-word keyword, optional trailing period ("Fig. 3").
fn latin(lang: &'static str, class: ElementClass, alternatives: &str) -> KeywordPattern {
    let pattern = format!(r"(?i)\b(?P<kw>{alternatives})(?:\.|\b){NUMBER_SUFFIX}");
    KeywordPattern {
        lang,
        class,
        regex: Regex::new(&pattern).expect("invalid cross-reference keyword pattern"),
    }
}

/// Keyword that may carry attached prefixes or suffixes.
fn attached(lang: &'static str, class: ElementClass, alternatives: &str) -> KeywordPattern {
    let pattern = format!(r"(?P<kw>{alternatives})\S*{NUMBER_SUFFIX}");
    KeywordPattern {
        lang,
        class,
        regex: Regex::new(&pattern).expect("invalid cross-reference keyword pattern"),
    }
}

/// Parse ASCII, Devanagari, Arabic-Indic or Extended Arabic-Indic digits.
fn parse_digits(s: &str) -> Option<u32> {
    let mut value: u32 = 0;
    for c in s.chars() {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '\u{0966}'..='\u{096F}' => c as u32 - 0x0966,
            '\u{0660}'..='\u{0669}' => c as u32 - 0x0660,
            '\u{06F0}'..='\u{06F9}' => c as u32 - 0x06F0,
            _ => return None,
        };
        value = value.checked_mul(10)?.checked_add(digit)?;
    }
    Some(value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexicalMatch {
    pub score: f32,
    pub keyword: Option<String>,
    pub number: Option<u32>,
}

/// Best keyword evidence in `text` for `class`.
pub fn lexical_signal(text: &str, lang: Option<&str>, class: ElementClass) -> LexicalMatch {
    let mut found = LexicalMatch {
        score: 0.0,
        keyword: None,
        number: None,
    };

    let wanted = |p: &&KeywordPattern| p.class == class && (p.lang == "en" || Some(p.lang) == lang);
    for pattern in KEYWORDS.iter().filter(wanted) {
        for caps in pattern.regex.captures_iter(text) {
            let keyword = caps.name("kw").map(|m| m.as_str().to_lowercase());
            let number = caps.name("num").and_then(|m| parse_digits(m.as_str()));
            let score = if number.is_some() {
                LEXICAL_WITH_NUMBER
            } else {
                LEXICAL_KEYWORD_ONLY
            };
            if score > found.score {
                found = LexicalMatch { score, keyword, number };
            }
            if found.score >= LEXICAL_WITH_NUMBER {
                return found;
            }
        }
    }
    found
}

/// Center-distance proximity in [0, 1]; 1 for coincident centers.
pub fn proximity(a: &BBox, b: &BBox, page: PageSize) -> f32 {
    let (ax, ay) = a.center();
    let (bx, by) = b.center();
    let dx = (ax - bx) / page.w as f32;
    let dy = (ay - by) / page.h as f32;
    let d = (dx * dx + dy * dy).sqrt() / std::f32::consts::SQRT_2;
    1.0 - d.min(1.0)
}

pub fn detect_cross_references(
    stage2: &Stage2Result,
    config: &EnrichmentConfig,
) -> Result<Vec<CrossReference>, EnrichmentError> {
    let page = stage2.size();
    if page.is_empty() {
        return Err(EnrichmentError::EmptyPage);
    }

    let mut refs = Vec::new();
    for region in &stage2.text_regions {
        let Some(text) = region.text.as_deref().filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        for visual in &stage2.visual_descriptions {
            let prox = proximity(&region.bbox, &visual.bbox, page);
            let lex = lexical_signal(text, region.lang.as_deref(), visual.element_type);
            let strength =
                (config.proximity_weight * prox + config.lexical_weight * lex.score).clamp(0.0, 1.0);

            if strength > config.cross_reference_threshold {
                refs.push(CrossReference {
                    text_element_id: region.element_id,
                    visual_element_id: visual.element_id,
                    strength,
                    proximity: prox,
                    lexical: lex.score,
                    keyword: lex.keyword,
                    reference_number: lex.number,
                });
            }
        }
    }

    tracing::debug!(count = refs.len(), "Cross-references detected");
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::{
        DescriptionSource, Element, PreprocessMeta, Stage1Result, Stage2Fields, TextRegion,
        VisualDescription,
    };

    fn region(id: usize, bbox: BBox, text: &str, lang: &str) -> TextRegion {
        TextRegion {
            element_id: id,
            bbox,
            text: Some(text.to_string()),
            lang: Some(lang.to_string()),
            score: Some(0.9),
            lang_confidence: Some(0.9),
            low_language_confidence: false,
        }
    }

    fn visual(id: usize, bbox: BBox, class: ElementClass) -> VisualDescription {
        VisualDescription {
            element_id: id,
            bbox,
            element_type: class,
            generated_text: Some("a chart".into()),
            confidence: Some(0.7),
            source: Some(DescriptionSource::Generator),
        }
    }

    fn doc(size: PageSize, regions: Vec<TextRegion>, visuals: Vec<VisualDescription>) -> Stage2Result {
        let elements: Vec<Element> = regions
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
            detected_languages: vec![],
            language_confidence: BTreeMap::new(),
        })
    }

    #[test]
    fn english_keyword_with_number() {
        let m = lexical_signal("As shown in Fig. 3, sales rose.", Some("en"), ElementClass::Figure);
        assert_eq!(m.score, 1.0);
        assert_eq!(m.number, Some(3));
        assert_eq!(m.keyword.as_deref(), Some("fig"));

        let bare = lexical_signal("See the table below", Some("en"), ElementClass::Table);
        assert_eq!(bare.score, 0.8);
        assert_eq!(bare.number, None);
    }

    #[test]
    fn keyword_must_name_the_visual_class() {
        assert_eq!(lexical_signal("Table 1 lists totals", Some("en"), ElementClass::Figure).score, 0.0);
        assert_eq!(lexical_signal("a figurative sense", Some("en"), ElementClass::Figure).score, 0.0);
    }

    #[test]
    fn native_keywords_and_digits() {
        let hi = lexical_signal("तालिका ३ में आंकड़े हैं", Some("hi"), ElementClass::Table);
        assert_eq!(hi.score, 1.0);
        assert_eq!(hi.number, Some(3));

        let ar = lexical_signal("انظر الجدول ٢", Some("ar"), ElementClass::Table);
        assert_eq!(ar.number, Some(2));

        let fa = lexical_signal("نمودار ۱۲ را ببینید", Some("fa"), ElementClass::Figure);
        assert_eq!(fa.number, Some(12));

        // Urdu keyword is not searched for a Hindi region
        assert_eq!(lexical_signal("تصویر", Some("hi"), ElementClass::Figure).score, 0.0);
    }

    #[test]
    fn proximity_bounds() {
        let page = PageSize { w: 100, h: 100 };
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((proximity(&a, &a, page) - 1.0).abs() < 1e-6);
        let far = BBox::new(90.0, 90.0, 10.0, 10.0);
        // Opposite corners: d = sqrt(.9^2 + .9^2) / sqrt(2) = .9
        assert!((proximity(&a, &far, page) - 0.1).abs() < 1e-5);
    }

    #[test]
    fn keyword_reference_across_the_page_is_emitted() {
        let d = doc(
            PageSize { w: 1000, h: 1000 },
            vec![region(0, BBox::new(0.0, 900.0, 300.0, 50.0), "Figure 2 shows the trend", "en")],
            vec![visual(1, BBox::new(600.0, 0.0, 300.0, 200.0), ElementClass::Figure)],
        );
        let refs = detect_cross_references(&d, &EnrichmentConfig::default()).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].text_element_id, 0);
        assert_eq!(refs[0].visual_element_id, 1);
        assert_eq!(refs[0].reference_number, Some(2));
        assert!(refs[0].strength > 0.5);
    }

    #[test]
    fn distant_unrelated_text_is_not_linked() {
        let d = doc(
            PageSize { w: 1000, h: 1000 },
            vec![region(0, BBox::new(0.0, 900.0, 100.0, 50.0), "Quarterly revenue grew", "en")],
            vec![visual(1, BBox::new(800.0, 0.0, 100.0, 100.0), ElementClass::Table)],
        );
        assert!(detect_cross_references(&d, &EnrichmentConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn adjacent_caption_without_keyword_is_linked() {
        let d = doc(
            PageSize { w: 1000, h: 1000 },
            vec![region(0, BBox::new(100.0, 320.0, 300.0, 30.0), "Quarterly revenue by region", "en")],
            vec![visual(1, BBox::new(100.0, 100.0, 300.0, 200.0), ElementClass::Table)],
        );
        let refs = detect_cross_references(&d, &EnrichmentConfig::default()).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].lexical, 0.0);
    }

    #[test]
    fn empty_page_is_an_error() {
        let d = doc(PageSize { w: 0, h: 800 }, vec![], vec![]);
        assert_eq!(
            detect_cross_references(&d, &EnrichmentConfig::default()).unwrap_err(),
            EnrichmentError::EmptyPage
        );
    }
}
