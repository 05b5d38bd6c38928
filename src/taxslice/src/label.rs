use once_cell::sync::Lazy;
use regex::Regex;

use crate::rank::Rank;

/// First field of the header row in merged MetaPhlAn tables.
pub const HEADER_SENTINEL: &str = "ID";
pub const LABEL_DELIMITER: char = '|';
pub const FIELD_DELIMITER: char = '\t';

static SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z])__").unwrap());

/// One `prefix+name` piece of a hierarchical label, e.g. `g__Escherichia`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    /// `None` for prefixes outside the rank table (`p__`, `d__`) or pieces with no prefix at all.
    pub rank: Option<Rank>,
    pub name: &'a str,
    /// Byte offset of the segment within the whole label.
    start: usize,
}

/// A parsed hierarchical label such as `k__Bacteria|g__Escherichia|s__coli`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<'a> {
    raw: &'a str,
    segments: Vec<Segment<'a>>,
}

impl<'a> Label<'a> {
    pub fn parse(raw: &'a str) -> Label<'a> {
        let mut segments = Vec::new();
        let mut start = 0;
        for piece in raw.split(LABEL_DELIMITER) {
            let segment = match SEGMENT.captures(piece) {
                Some(caps) => {
                    let code = caps[1].chars().next().and_then(Rank::from_code);
                    Segment { rank: code, name: &piece[3..], start }
                }
                None => Segment { rank: None, name: piece, start },
            };
            segments.push(segment);
            start += piece.len() + LABEL_DELIMITER.len_utf8();
        }
        Label { raw, segments }
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    /// False when no segment carries a prefix from the rank table.
    pub fn is_recognized(&self) -> bool {
        self.segments.iter().any(|s| s.rank.is_some())
    }

    pub fn has_rank(&self, rank: Rank) -> bool {
        self.segments.iter().any(|s| s.rank == Some(rank))
    }

    /// The most specific recognized rank present in the label.
    pub fn deepest_rank(&self) -> Option<Rank> {
        self.segments.iter().filter_map(|s| s.rank).max()
    }

    /// Everything after the prefix of the last `rank` segment, e.g. `Escherichia` for genus
    /// on `k__Bacteria|g__Escherichia`. Anything following that segment is kept as is.
    pub fn remainder_after(&self, rank: Rank) -> Option<&'a str> {
        self.segments
            .iter()
            .rev()
            .find(|s| s.rank == Some(rank))
            .map(|s| &self.raw[s.start + rank.prefix().len()..])
    }
}

/// How a single line of a whole-profile table is treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row<'a> {
    Blank,
    /// `#`-prefixed lines written by MetaPhlAn2 ahead of the data rows.
    Comment,
    Header,
    /// Non-header row without any recognizable rank segment.
    Malformed,
    Taxon { label: Label<'a>, rest: &'a str },
}

impl<'a> Row<'a> {
    pub fn classify(line: &'a str) -> Row<'a> {
        if line.trim().is_empty() {
            return Row::Blank;
        }
        if line.starts_with('#') {
            return Row::Comment;
        }
        let (first, rest) = match line.find(FIELD_DELIMITER) {
            Some(i) => line.split_at(i),
            None => (line, ""),
        };
        if first == HEADER_SENTINEL {
            return Row::Header;
        }
        let label = Label::parse(first);
        if label.is_recognized() {
            Row::Taxon { label, rest }
        } else {
            Row::Malformed
        }
    }
}
