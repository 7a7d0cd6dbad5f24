/// KO annotation of predicted proteins
pub mod aggregator;
pub mod hits;
pub mod kegg;
pub mod modules;

pub use aggregator::{aggregate, AnnotationAggregator, AnnotationFeatures, AnnotationTable};
pub use hits::{namespaced_id, split_namespaced_id, AnnotationHit, HitFormat};
pub use kegg::{DerivedFeatures, FeatureOrdering, KeggReference, KoUniverse};
