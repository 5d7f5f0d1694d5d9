pub mod element;
pub mod enrichment;
pub mod page;
pub mod report;
pub mod stage;

pub use element::{BBox, Element, ElementClass, UnknownClass};
pub use enrichment::{
    Complexity, ComplexityLevel, CrossReference, DescriptionContext, DocumentSummary,
    EnhancedDescription, KeyPoint, PagePosition, SemanticAnalysis,
};
pub use page::{PageImage, PageSize, PreprocessMeta};
pub use report::{ClassCounts, ConfusionMatrix, DataError, EvaluationReport};
pub use stage::{
    DescriptionSource, InvalidStage, Stage, Stage1Result, Stage2Fields, Stage2Result,
    Stage3Fields, Stage3Result, StageResult, TextRegion, VisualDescription,
};
