use std::fmt;
use std::str::FromStr;

use crate::error::TaxsliceError;

/// Taxonomic ranks recognized in MetaPhlAn-style labels, ordered from least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Kingdom,
    Class,
    Order,
    Family,
    Genus,
    Species,
    Strain,
}

impl Rank {
    pub const ALL: [Rank; 7] = [
        Rank::Kingdom,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
        Rank::Strain,
    ];

    /// Position of the rank in the fixed order (kingdom = 0).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Rank::Kingdom => "kingdom",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
            Rank::Strain => "strain",
        }
    }

    /// The label prefix marking a segment of this rank, e.g. `g__` for genus.
    pub fn prefix(self) -> &'static str {
        match self {
            Rank::Kingdom => "k__",
            Rank::Class => "c__",
            Rank::Order => "o__",
            Rank::Family => "f__",
            Rank::Genus => "g__",
            Rank::Species => "s__",
            Rank::Strain => "t__",
        }
    }

    /// Rank for a single-letter prefix code (the letter before `__`).
    pub fn from_code(code: char) -> Option<Rank> {
        Rank::ALL
            .iter()
            .copied()
            .find(|r| r.prefix().starts_with(code))
    }

    /// The next more specific rank. Undefined (`None`) for strain.
    pub fn next(self) -> Option<Rank> {
        Rank::ALL.get(self.index() + 1).copied()
    }

    /// Like `next`, but an error for the deepest rank, which cannot be sliced on.
    pub fn next_or_invalid(self) -> Result<Rank, TaxsliceError> {
        self.next()
            .ok_or_else(|| TaxsliceError::InvalidRank(self.name().to_string()))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Rank {
    type Err = TaxsliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Rank::ALL
            .iter()
            .copied()
            .find(|r| r.name() == wanted)
            .ok_or_else(|| TaxsliceError::UnknownRank(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_totally_ordered() {
        for pair in Rank::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
        assert_eq!(Rank::Kingdom.index(), 0);
        assert_eq!(Rank::Strain.index(), 6);
    }

    #[test]
    fn strain_has_no_next_rank() {
        assert_eq!(Rank::Strain.next(), None);
        assert!(matches!(
            Rank::Strain.next_or_invalid(),
            Err(TaxsliceError::InvalidRank(ref r)) if r == "strain"
        ));
        assert_eq!(Rank::Genus.next_or_invalid().unwrap(), Rank::Species);
    }

    #[test]
    fn parses_rank_names() {
        assert_eq!("genus".parse::<Rank>().unwrap(), Rank::Genus);
        assert_eq!("Species".parse::<Rank>().unwrap(), Rank::Species);
        for rank in Rank::ALL {
            assert_eq!(rank.name().parse::<Rank>().unwrap(), rank);
        }
    }

    #[test]
    fn phylum_is_not_a_recognized_rank() {
        assert!(matches!(
            "phylum".parse::<Rank>(),
            Err(TaxsliceError::UnknownRank(ref r)) if r == "phylum"
        ));
    }

    #[test]
    fn prefix_codes_round_trip() {
        assert_eq!(Rank::from_code('g'), Some(Rank::Genus));
        assert_eq!(Rank::from_code('t'), Some(Rank::Strain));
        assert_eq!(Rank::from_code('p'), None);
    }
}
