//! Static tables for the six supported languages.
//!
//! Script ranges, common words, expected character frequencies, script-specific
//! letters and short seed texts used to build trigram profiles.

/// Writing systems the supported languages use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Devanagari,
    Arabic,
}

impl Script {
    pub const ALL: &'static [Script] = &[Script::Latin, Script::Devanagari, Script::Arabic];
}

/// Script of a letter, `None` for digits, punctuation, whitespace and other scripts.
pub fn script_of(c: char) -> Option<Script> {
    match c {
        'a'..='z' | 'A'..='Z' => Some(Script::Latin),
        '\u{0900}'..='\u{097F}' => match c {
            // Danda, double danda and Devanagari digits carry no letter signal
            '\u{0964}'..='\u{096F}' => None,
            _ => Some(Script::Devanagari),
        },
        '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' | '\u{FB50}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}' => {
            match c {
                // Arabic/Urdu punctuation and both digit blocks
                '\u{060C}' | '\u{061B}' | '\u{061F}' | '\u{06D4}' | '\u{0660}'..='\u{0669}' | '\u{06F0}'..='\u{06F9}' => None,
                _ => Some(Script::Arabic),
            }
        }
        _ => None,
    }
}

pub struct LanguageProfile {
    pub code: &'static str,
    pub name: &'static str,
    pub script: Script,
    pub common_words: &'static [&'static str],
    pub char_freq: &'static [(char, f32)],
    /// Letters (or short words, for Devanagari) that separate this language from
    /// others sharing its script.
    pub markers: &'static [&'static str],
    pub seed: &'static str,
}

pub const SUPPORTED: &[LanguageProfile] = &[
    LanguageProfile {
        code: "en",
        name: "English",
        script: Script::Latin,
        common_words: &["the", "and", "or", "in", "on", "at", "to", "for", "of", "with"],
        char_freq: &[('e', 0.12), ('t', 0.09), ('a', 0.08), ('o', 0.08), ('i', 0.07)],
        markers: &[],
        seed: "The table shows the results of the survey and the figure illustrates the trend \
               over time. This document contains text, lists and images for the annual report. \
               We are going to the market today and will return home in the evening.",
    },
    LanguageProfile {
        code: "hi",
        name: "Hindi",
        script: Script::Devanagari,
        common_words: &["का", "के", "की", "है", "में", "और", "या", "पर", "से", "तक"],
        char_freq: &[('ा', 0.15), ('े', 0.12), ('ी', 0.10), ('क', 0.08), ('म', 0.07)],
        markers: &["है", "हैं", "में", "था", "थी", "रहे", "और", "लिए", "नहीं"],
        seed: "यह दस्तावेज़ एक रिपोर्ट है और इसमें तालिका और चित्र शामिल हैं। भारत की राजधानी \
               नई दिल्ली है। हम आज बाज़ार जा रहे हैं और शाम को घर लौटेंगे। इस चित्र में पिछले \
               वर्ष के आंकड़े दिखाए गए हैं।",
    },
    LanguageProfile {
        code: "ur",
        name: "Urdu",
        script: Script::Arabic,
        common_words: &["اور", "کی", "کے", "ہے", "میں", "پر", "سے", "تک", "یا", "لیے"],
        char_freq: &[('ا', 0.12), ('ی', 0.10), ('ر', 0.08), ('ک', 0.07), ('م', 0.06)],
        markers: &["ے", "ں", "ٹ", "ڈ", "ڑ", "ہ", "ھ"],
        seed: "یہ دستاویز ایک رپورٹ ہے اور اس میں جدول اور تصویر شامل ہیں۔ پاکستان کا دارالحکومت \
               اسلام آباد ہے۔ ہم آج بازار جا رہے ہیں اور شام کو گھر واپس آئیں گے۔ اس تصویر میں \
               پچھلے سال کے اعداد و شمار دکھائے گئے ہیں۔",
    },
    LanguageProfile {
        code: "ar",
        name: "Arabic",
        script: Script::Arabic,
        common_words: &["في", "من", "إلى", "على", "عن", "مع", "هذا", "هذه", "التي", "الذي"],
        char_freq: &[('ا', 0.15), ('ل', 0.12), ('ي', 0.10), ('ن', 0.08), ('ر', 0.07)],
        markers: &["ة", "ي", "ك", "ى", "أ", "إ"],
        seed: "هذه الوثيقة تقرير يحتوي على جدول وصورة توضيحية. عاصمة مصر هي القاهرة. نحن \
               ذاهبون إلى السوق اليوم وسنعود إلى المنزل في المساء. يوضح هذا الشكل بيانات \
               السنة الماضية.",
    },
    LanguageProfile {
        code: "ne",
        name: "Nepali",
        script: Script::Devanagari,
        common_words: &["को", "का", "की", "मा", "र", "पनि", "तर", "अथवा", "यो", "त्यो"],
        char_freq: &[('ा', 0.14), ('े', 0.11), ('ी', 0.09), ('क', 0.08), ('म', 0.07)],
        markers: &["छ", "छन्", "हो", "मा", "पनि", "यो", "गर्न", "भएको", "हुन्छ"],
        seed: "यो कागजात एउटा प्रतिवेदन हो र यसमा तालिका र चित्र समावेश छन्। नेपालको राजधानी \
               काठमाडौं हो। हामी आज बजार जाँदैछौं र साँझ घर फर्कनेछौं। यस चित्रमा गत वर्षको \
               तथ्याङ्क देखाइएको छ।",
    },
    LanguageProfile {
        code: "fa",
        name: "Persian",
        script: Script::Arabic,
        common_words: &["در", "از", "به", "با", "که", "این", "آن", "برای", "تا", "یا"],
        char_freq: &[('ا', 0.13), ('ی', 0.11), ('ر', 0.09), ('ن', 0.08), ('د', 0.07)],
        markers: &["پ", "چ", "ژ", "گ", "ی", "ک"],
        seed: "این سند یک گزارش است و شامل جدول و تصویر می‌باشد. پایتخت ایران تهران است. ما \
               امروز به بازار می‌رویم و عصر به خانه برمی‌گردیم. این تصویر آمار سال گذشته را \
               نشان می‌دهد.",
    },
];

pub fn profile(code: &str) -> Option<&'static LanguageProfile> {
    SUPPORTED.iter().find(|p| p.code == code)
}

pub fn is_supported(code: &str) -> bool {
    profile(code).is_some()
}

/// Profiles written in `script`, in table order.
pub fn profiles_for(script: Script) -> impl Iterator<Item = &'static LanguageProfile> {
    SUPPORTED.iter().filter(move |p| p.script == script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_languages_with_unique_codes() {
        assert_eq!(SUPPORTED.len(), 6);
        let mut codes: Vec<_> = SUPPORTED.iter().map(|p| p.code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 6);
    }

    #[test]
    fn seeds_are_written_in_their_script() {
        for p in SUPPORTED {
            let letters: Vec<_> = p.seed.chars().filter_map(script_of).collect();
            assert!(!letters.is_empty(), "{} seed has no letters", p.code);
            let own = letters.iter().filter(|s| **s == p.script).count();
            assert_eq!(own, letters.len(), "{} seed mixes scripts", p.code);
        }
    }

    #[test]
    fn script_ranges() {
        assert_eq!(script_of('Q'), Some(Script::Latin));
        assert_eq!(script_of('क'), Some(Script::Devanagari));
        assert_eq!(script_of('ب'), Some(Script::Arabic));
        assert_eq!(script_of('।'), None);
        assert_eq!(script_of('۳'), None);
        assert_eq!(script_of('7'), None);
    }

    #[test]
    fn lookup() {
        assert_eq!(profile("ur").map(|p| p.name), Some("Urdu"));
        assert!(!is_supported("de"));
        assert_eq!(profiles_for(Script::Devanagari).count(), 2);
    }
}
