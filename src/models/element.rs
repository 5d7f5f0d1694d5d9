//! Layout elements: bounding boxes and the fixed class set.

use serde::{Deserialize, Serialize};

/// Generates the layout class enum with `as_str`, numeric `id` and `FromStr`.
macro_rules! class_enum {
    ($name:ident { $($variant:ident => ($id:literal, $s:literal)),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "RawClass")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn id(&self) -> u8 {
                match self {
                    $(Self::$variant => $id),+
                }
            }

            pub fn from_id(id: u8) -> Option<Self> {
                match id {
                    $($id => Some(Self::$variant)),+,
                    _ => None,
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownClass;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(UnknownClass(s.to_string())),
                }
            }
        }
    };
}

class_enum!(ElementClass {
    Background => (0, "Background"),
    Text => (1, "Text"),
    Title => (2, "Title"),
    List => (3, "List"),
    Table => (4, "Table"),
    Figure => (5, "Figure"),
});

impl ElementClass {
    /// Classes whose content is read by the recognizer.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text | Self::Title | Self::List)
    }

    /// Non-text visual classes described by the generator.
    pub fn is_visual(&self) -> bool {
        matches!(self, Self::Table | Self::Figure)
    }
}

impl std::fmt::Display for ElementClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Class label that is neither a known name nor a known numeric id.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown element class: {0}")]
pub struct UnknownClass(pub String);

/// Wire form of a class: either its name or its numeric id.
#[doc(hidden)]
#[derive(Deserialize)]
#[serde(untagged)]
pub enum RawClass {
    Id(u64),
    Name(String),
}

impl TryFrom<RawClass> for ElementClass {
    type Error = UnknownClass;

    fn try_from(raw: RawClass) -> Result<Self, Self::Error> {
        match raw {
            RawClass::Id(id) => u8::try_from(id)
                .ok()
                .and_then(ElementClass::from_id)
                .ok_or_else(|| UnknownClass(id.to_string())),
            RawClass::Name(name) => name.parse(),
        }
    }
}

/// Axis-aligned box `[x, y, w, h]` in pixel units of the original image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl From<[f32; 4]> for BBox {
    fn from([x, y, w, h]: [f32; 4]) -> Self {
        Self { x, y, w, h }
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x, b.y, b.w, b.h]
    }
}

impl BBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// True when both dimensions are strictly positive and every coordinate is finite.
    pub fn is_well_formed(&self) -> bool {
        [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite()) && self.w > 0.0 && self.h > 0.0
    }

    pub fn intersection_area(&self, other: &BBox) -> f32 {
        let iw = self.right().min(other.right()) - self.x.max(other.x);
        let ih = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if iw <= 0.0 || ih <= 0.0 {
            return 0.0;
        }
        iw * ih
    }

    /// Intersection over union, in [0, 1]. Degenerate boxes yield 0.
    pub fn iou(&self, other: &BBox) -> f32 {
        let inter = self.intersection_area(other);
        if inter <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        (inter / union).clamp(0.0, 1.0)
    }

    /// Clip to an image of `width` x `height`; `None` if nothing remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<BBox> {
        let x0 = self.x.max(0.0);
        let y0 = self.y.max(0.0);
        let x1 = self.right().min(width as f32);
        let y1 = self.bottom().min(height as f32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(BBox::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// A detected (or annotated) layout element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: usize,
    pub bbox: BBox,
    pub class: ElementClass,
    pub score: f32,
}

impl Element {
    pub fn new(id: usize, bbox: BBox, class: ElementClass, score: f32) -> Self {
        Self { id, bbox, class, score }
    }

    /// Check the element invariants. Returns the reason on violation.
    pub fn validate(&self) -> Result<(), String> {
        if !self.bbox.is_well_formed() {
            return Err(format!(
                "element {} has non-positive or non-finite bbox [{}, {}, {}, {}]",
                self.id, self.bbox.x, self.bbox.y, self.bbox.w, self.bbox.h
            ));
        }
        if !(0.0..=1.0).contains(&self.score) {
            return Err(format!("element {} has score {} outside [0, 1]", self.id, self.score));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_boxes_have_unit_iou() {
        let a = BBox::new(0.0, 0.0, 100.0, 100.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_boxes_have_zero_iou() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
        // Touching edges do not overlap
        let c = BBox::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn half_overlap_iou() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 0.0, 10.0, 10.0);
        // inter 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn bbox_serializes_as_array() {
        let json = serde_json::to_string(&BBox::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: BBox = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(back, BBox::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn class_parses_from_name_or_id() {
        let by_name: ElementClass = serde_json::from_str("\"Table\"").unwrap();
        let by_id: ElementClass = serde_json::from_str("4").unwrap();
        assert_eq!(by_name, ElementClass::Table);
        assert_eq!(by_id, ElementClass::Table);
        assert!(serde_json::from_str::<ElementClass>("9").is_err());
        assert!(serde_json::from_str::<ElementClass>("\"Chart\"").is_err());
    }

    #[test]
    fn class_ids_are_stable() {
        for (i, class) in ElementClass::ALL.iter().enumerate() {
            assert_eq!(class.id() as usize, i);
            assert_eq!(ElementClass::from_id(i as u8), Some(*class));
        }
    }

    #[test]
    fn element_json_uses_class_key() {
        let el = Element::new(3, BBox::new(0.0, 0.0, 5.0, 5.0), ElementClass::Figure, 0.5);
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["class"], "Figure");
        assert_eq!(json["bbox"], serde_json::json!([0.0, 0.0, 5.0, 5.0]));
    }

    #[test]
    fn validate_rejects_bad_geometry_and_score() {
        let ok = Element::new(0, BBox::new(0.0, 0.0, 1.0, 1.0), ElementClass::Text, 1.0);
        assert!(ok.validate().is_ok());

        let flat = Element::new(1, BBox::new(0.0, 0.0, 0.0, 1.0), ElementClass::Text, 0.5);
        assert!(flat.validate().unwrap_err().contains("non-positive"));

        let hot = Element::new(2, BBox::new(0.0, 0.0, 1.0, 1.0), ElementClass::Text, 1.2);
        assert!(hot.validate().unwrap_err().contains("outside [0, 1]"));
    }

    #[test]
    fn clamp_to_clips_and_drops() {
        let b = BBox::new(-10.0, 5.0, 30.0, 10.0);
        assert_eq!(b.clamp_to(15, 100), Some(BBox::new(0.0, 5.0, 15.0, 10.0)));
        assert_eq!(BBox::new(50.0, 50.0, 5.0, 5.0).clamp_to(10, 10), None);
    }
}
