use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::utils::three_to_one;

///
/// Identity of one residue inside one trajectory.
///
/// The textual form is `chain:residue_name:residue_index`, the prefix
/// GetContacts uses for its atom columns.
///
#[derive(Eq, PartialEq, Hash, Ord, PartialOrd, Debug, Clone, Serialize, Deserialize)]
pub struct ResidueKey {
    pub chain: String,
    pub residue_name: String,
    pub residue_index: i32,
}

impl ResidueKey {
    pub fn new(chain: &str, residue_name: &str, residue_index: i32) -> Self {
        ResidueKey {
            chain: chain.to_string(),
            residue_name: residue_name.to_string(),
            residue_index,
        }
    }

    /// One letter code of this residue, `X` when the name is not a known amino acid.
    pub fn one_letter(&self) -> char {
        three_to_one(&self.residue_name)
    }
}

impl Display for ResidueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.chain, self.residue_name, self.residue_index)
    }
}

impl FromStr for ResidueKey {
    type Err = CoreError;

    ///
    /// Parse `chain:resname:resid`, ignoring any trailing `:atom` field.
    ///
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.trim().split(':');
        let (Some(chain), Some(name), Some(index)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(CoreError::ResidueKeyParse(s.to_string()));
        };
        let residue_index = index
            .trim()
            .parse::<i32>()
            .map_err(|_| CoreError::ResidueKeyParse(s.to_string()))?;

        Ok(ResidueKey::new(chain, name, residue_index))
    }
}

/// One residue as seen by the structure loader.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ChainResidue {
    pub name: String,
    pub code: char,
}

///
/// Ordered sequence of one chain: residue index -> residue.
///
/// Indices ascend and may contain gaps. Built once per chain and not mutated
/// afterwards.
///
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ChainSequence {
    chain: String,
    residues: BTreeMap<i32, ChainResidue>,
}

impl ChainSequence {
    pub fn new(chain: &str, residues: BTreeMap<i32, ChainResidue>) -> Self {
        ChainSequence {
            chain: chain.to_string(),
            residues,
        }
    }

    ///
    /// Build a chain from `(residue_index, residue_name)` pairs.
    /// Later entries for the same index replace earlier ones.
    ///
    pub fn from_named<'a, I>(chain: &str, residues: I) -> Self
    where
        I: IntoIterator<Item = (i32, &'a str)>,
    {
        let residues = residues
            .into_iter()
            .map(|(idx, name)| {
                (
                    idx,
                    ChainResidue {
                        name: name.to_string(),
                        code: three_to_one(name),
                    },
                )
            })
            .collect();
        ChainSequence::new(chain, residues)
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn residues(&self) -> impl Iterator<Item = (i32, &ChainResidue)> {
        self.residues.iter().map(|(idx, res)| (*idx, res))
    }

    /// Plain one letter sequence in ascending residue index order.
    pub fn one_letter_sequence(&self) -> String {
        self.residues.values().map(|r| r.code).collect()
    }

    ///
    /// Residue keys in ascending residue index order.
    ///
    /// Position `i` of this list is position `i` of [`Self::one_letter_sequence`],
    /// which is what alignment query coordinates index into.
    ///
    pub fn residue_keys(&self) -> Vec<ResidueKey> {
        self.residues
            .iter()
            .map(|(idx, res)| ResidueKey::new(&self.chain, &res.name, *idx))
            .collect()
    }
}
