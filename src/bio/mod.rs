pub mod fasta;
pub mod sequence;

pub use sequence::{Sequence, SequenceType};
