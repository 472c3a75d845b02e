//! Map Uniprot accessions to gene names from a local table
//!
//! # File format
//!
//! Files should be tab delimited, with 2 fields: Uniprot Accession and Gene
//! Name. Each protein appears on it's own line in the file, and no header
//! should be present. Additional fields are ignored.
//!
//! ```text
//! $ cat gene_names.txt
//! ...
//! P09874	PARP1
//! Q9UGN5	PARP2
//! ...
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! # use uniprot::GeneNames;
//! let genes = GeneNames::load("gene_names.txt")?;
//! assert_eq!(genes.lookup("P09874"), Some("PARP1"));
//! ```

use memchr::{memchr_iter, Memchr};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, prelude::*};
use std::iter::FromIterator;
use std::path::Path;
use std::str;

/// Split a byte slice on every occurence of a single byte
pub struct Pitchfork<'a> {
    pos: usize,
    haystack: &'a [u8],
    inner: Memchr<'a>,
}

impl<'a> Pitchfork<'a> {
    pub fn new(needle: u8, haystack: &'a [u8]) -> Self {
        Self {
            pos: 0,
            haystack,
            inner: memchr_iter(needle, haystack),
        }
    }
}

impl<'a> Iterator for Pitchfork<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let end = match self.inner.next() {
            Some(e) => e,
            None => {
                if self.pos < self.haystack.len() {
                    self.haystack.len()
                } else {
                    return None;
                }
            }
        };
        let slice = &self.haystack[self.pos..end];
        self.pos = end + 1;
        Some(slice)
    }
}

#[derive(Debug, Default, PartialEq, Clone)]
/// Accession to gene name lookup table
pub struct GeneNames {
    inner: HashMap<String, String>,
}

impl GeneNames {
    /// Load a tab delimited `accession\tgene` file
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<GeneNames> {
        let mut buffer = Vec::new();
        File::open(path)?.read_to_end(&mut buffer)?;
        GeneNames::parse(&buffer)
    }

    /// Parse the contents of a gene name table
    ///
    /// Empty lines are skipped; lines without a gene name field are
    /// rejected as invalid data.
    pub fn parse(buffer: &[u8]) -> io::Result<GeneNames> {
        let mut inner = HashMap::new();
        for line in Pitchfork::new(b'\n', buffer) {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            let mut fields = Pitchfork::new(b'\t', line);
            let (acc, gene) = match (fields.next(), fields.next()) {
                (Some(acc), Some(gene)) => (acc, gene),
                _ => return Err(io::Error::from(io::ErrorKind::InvalidData)),
            };
            let acc = str::from_utf8(acc).map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;
            let gene =
                str::from_utf8(gene).map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;
            inner.insert(acc.trim().to_string(), gene.trim().to_string());
        }
        Ok(GeneNames { inner })
    }

    /// Search by Uniprot accession
    pub fn lookup<T: AsRef<str>>(&self, acc: T) -> Option<&str> {
        self.inner.get(acc.as_ref()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<(String, String)> for GeneNames {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        GeneNames {
            inner: iter.into_iter().collect(),
        }
    }
}
