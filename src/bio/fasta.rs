use crate::bio::sequence::Sequence;
use crate::BinqcError;
use flate2::read::GzDecoder;
use memmap2::Mmap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::{line_ending, not_line_ending},
    combinator::{map, opt},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Parse a FASTA header line
fn parse_header(input: &[u8]) -> IResult<&[u8], (&str, Option<&str>)> {
    let (input, _) = tag(b">")(input)?;
    let (input, id) = map(
        take_till(|c: u8| c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'),
        |s| std::str::from_utf8(s).unwrap_or(""),
    )(input)?;
    let (input, description) = opt(preceded(
        alt((tag(b" "), tag(b"\t"))),
        map(not_line_ending, |s| std::str::from_utf8(s).unwrap_or("")),
    ))(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((input, (id, description)))
}

/// Parse sequence lines until next header or EOF
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut sequence = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) =
            take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(remaining)?;
        let (rest, _) = opt(line_ending)(rest)?;

        for &c in line {
            if !c.is_ascii_whitespace() {
                sequence.push(c.to_ascii_uppercase());
            }
        }

        // A lone '\r' is not matched by line_ending; step over it
        remaining = if rest.len() == remaining.len() {
            &rest[1..]
        } else {
            rest
        };
    }

    Ok((remaining, sequence))
}

/// Parse a single FASTA record
fn parse_record(input: &[u8]) -> IResult<&[u8], Sequence> {
    let (input, (id, description)) = parse_header(input)?;
    let (input, sequence) = parse_sequence(input)?;

    let mut seq = Sequence::new(id.to_string(), sequence);
    if let Some(desc) = description {
        let desc = desc.trim();
        if !desc.is_empty() {
            seq = seq.with_description(desc.to_string());
        }
    }

    Ok((input, seq))
}

/// Parse a FASTA file into sequences (supports .gz compression)
pub fn parse_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>, BinqcError> {
    let path = path.as_ref();

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        parse_fasta_gzip(path)
    } else {
        parse_fasta_uncompressed(path)
    }
}

/// Parse an uncompressed FASTA file
fn parse_fasta_uncompressed(path: &Path) -> Result<Vec<Sequence>, BinqcError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    let mmap = unsafe { Mmap::map(&file)? };

    parse_fasta_buffer(&mmap[..])
}

/// Parse a gzipped FASTA file
fn parse_fasta_gzip(path: &Path) -> Result<Vec<Sequence>, BinqcError> {
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut buffer = Vec::new();
    decoder.read_to_end(&mut buffer)?;

    parse_fasta_buffer(&buffer)
}

/// Parse FASTA from a byte buffer
pub fn parse_fasta_buffer(buffer: &[u8]) -> Result<Vec<Sequence>, BinqcError> {
    let mut input = buffer;
    let mut sequences = Vec::new();

    while !input.is_empty() {
        while !input.is_empty() && input[0].is_ascii_whitespace() {
            input = &input[1..];
        }

        if input.is_empty() {
            break;
        }

        if input[0] != b'>' {
            return Err(BinqcError::Parse(
                "FASTA data does not start with a '>' header".to_string(),
            ));
        }

        match parse_record(input) {
            Ok((remaining, seq)) => {
                if !seq.is_empty() {
                    sequences.push(seq);
                }
                input = remaining;
            }
            Err(e) => {
                return Err(BinqcError::Parse(format!("Failed to parse FASTA: {:?}", e)));
            }
        }
    }

    Ok(sequences)
}

/// Write sequences to a FASTA file (supports .gz compression)
pub fn write_fasta<P: AsRef<Path>>(path: P, sequences: &[Sequence]) -> Result<(), BinqcError> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let path = path.as_ref();
    let file = File::create(path)?;

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = BufWriter::new(encoder);
        write_fasta_to_writer(&mut writer, sequences)?;
        writer.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_fasta_to_writer(&mut writer, sequences)?;
        writer.flush()?;
    }

    Ok(())
}

/// Write sequences to any writer
pub fn write_fasta_to_writer<W: Write>(
    writer: &mut W,
    sequences: &[Sequence],
) -> Result<(), BinqcError> {
    for seq in sequences {
        writeln!(writer, "{}", seq.header())?;

        for chunk in seq.sequence.chunks(80) {
            writeln!(writer, "{}", String::from_utf8_lossy(chunk))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let input = b">contig_1_1 # 2 # 301 # 1 # ID=1_1\nMKV";
        let (remaining, (id, desc)) = parse_header(input).unwrap();
        assert_eq!(id, "contig_1_1");
        assert_eq!(desc, Some("# 2 # 301 # 1 # ID=1_1"));
        assert_eq!(remaining, b"MKV");
    }

    #[test]
    fn test_parse_header_at_eof() {
        let (remaining, (id, desc)) = parse_header(b">lonely").unwrap();
        assert_eq!(id, "lonely");
        assert_eq!(desc, None);
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_parse_buffer_multiline_and_lowercase() {
        let data = b">p1 first\nmkv\nLLA*\n\n>p2\nGG\r\n>empty\n";
        let seqs = parse_fasta_buffer(data).unwrap();
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[0].id, "p1");
        assert_eq!(seqs[0].description.as_deref(), Some("first"));
        assert_eq!(seqs[0].sequence, b"MKVLLA*");
        assert_eq!(seqs[1].sequence, b"GG");
    }

    #[test]
    fn test_parse_buffer_rejects_headerless_data() {
        assert!(matches!(
            parse_fasta_buffer(b"MKVLLA\n"),
            Err(BinqcError::Parse(_))
        ));
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.faa.gz");
        let seqs = vec![
            Sequence::new("a".into(), vec![b'M'; 170]),
            Sequence::new("b".into(), b"MKV".to_vec()).with_description("desc".into()),
        ];
        write_fasta(&path, &seqs).unwrap();
        assert_eq!(parse_fasta(&path).unwrap(), seqs);
    }
}
