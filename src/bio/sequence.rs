use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub description: Option<String>,
    pub sequence: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceType {
    Protein,
    Nucleotide,
}

impl Sequence {
    pub fn new(id: String, sequence: Vec<u8>) -> Self {
        Self {
            id,
            description: None,
            sequence,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// Same residues under a different identifier; the description is dropped
    pub fn renamed(&self, id: String) -> Self {
        Self {
            id,
            description: None,
            sequence: self.sequence.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn detect_type(&self) -> SequenceType {
        let protein_chars = b"EFILPQXZ";
        let has_protein = self
            .sequence
            .iter()
            .any(|&c| protein_chars.contains(&c.to_ascii_uppercase()));

        if has_protein {
            SequenceType::Protein
        } else {
            SequenceType::Nucleotide
        }
    }

    /// Strip the stop-codon marker gene callers append to translations
    pub fn trim_stop(&mut self) {
        while self.sequence.last() == Some(&b'*') {
            self.sequence.pop();
        }
    }

    pub fn header(&self) -> String {
        let mut header = format!(">{}", self.id);

        if let Some(desc) = &self.description {
            header.push(' ');
            header.push_str(desc);
        }

        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_stop() {
        let mut seq = Sequence::new("p1".to_string(), b"MKV**".to_vec());
        seq.trim_stop();
        assert_eq!(seq.sequence, b"MKV");
    }

    #[test]
    fn test_detect_type() {
        assert_eq!(
            Sequence::new("a".into(), b"ACGTACGT".to_vec()).detect_type(),
            SequenceType::Nucleotide
        );
        assert_eq!(
            Sequence::new("b".into(), b"MKLPQE".to_vec()).detect_type(),
            SequenceType::Protein
        );
    }
}
