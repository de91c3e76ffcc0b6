//! Attribute references made by a record's expressions.
//!
//! A reference is internal when it names an attribute the record itself
//! defines (unprefixed or `MY.`-prefixed). `TARGET.` references and names
//! the record does not define are external: they can only be satisfied by
//! the record it is matched against.

use rustc_hash::FxHashSet;

use crate::matcher::Ad;

/// Where one reference points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    Internal(&'a str),
    External(&'a str),
}

/// Classify every variable referenced by the record's local attributes, in
/// order of first appearance, without duplicates (case-insensitively).
/// Scope prefixes are stripped.
pub fn references<A: Ad + ?Sized>(ad: &A) -> Vec<Reference<'_>> {
    let scope = ad.scope();
    let mut seen = FxHashSet::default();
    let mut refs = Vec::new();

    for attr in ad.record().iter() {
        for name in attr.value().variables() {
            let reference = match name.split_once('.') {
                Some((prefix, rest)) if prefix.eq_ignore_ascii_case("TARGET") => {
                    Reference::External(rest)
                }
                Some((prefix, rest)) if prefix.eq_ignore_ascii_case("MY") => {
                    classify(scope.has(rest), rest)
                }
                _ => classify(scope.has(name), name),
            };
            let key = match reference {
                Reference::Internal(n) => (true, n.to_ascii_lowercase()),
                Reference::External(n) => (false, n.to_ascii_lowercase()),
            };
            if seen.insert(key) {
                refs.push(reference);
            }
        }
    }
    refs
}

fn classify(defined: bool, name: &str) -> Reference<'_> {
    if defined {
        Reference::Internal(name)
    } else {
        Reference::External(name)
    }
}

/// Names referenced by the record that it defines itself.
pub fn internal_references<A: Ad + ?Sized>(ad: &A) -> Vec<String> {
    references(ad)
        .into_iter()
        .filter_map(|r| match r {
            Reference::Internal(name) => Some(name.to_string()),
            Reference::External(_) => None,
        })
        .collect()
}

/// Names referenced by the record that must come from a match target.
pub fn external_references<A: Ad + ?Sized>(ad: &A) -> Vec<String> {
    references(ad)
        .into_iter()
        .filter_map(|r| match r {
            Reference::External(name) => Some(name.to_string()),
            Reference::Internal(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdStore, Record};

    #[test]
    fn splits_internal_and_external() {
        let record = Record::parse(
            "Memory = 1024\n\
             Rank = MY.Memory + TARGET.Mips\n\
             Requirements = TARGET.Arch == \"X86_64\" && memory > Disk && TARGET.mips > 0",
        )
        .unwrap();

        assert_eq!(internal_references(&record), vec!["Memory"]);
        assert_eq!(external_references(&record), vec!["Mips", "Arch", "Disk"]);
    }

    #[test]
    fn chained_definitions_count_as_internal() {
        let mut store = AdStore::new();
        let parent = store.insert(Record::parse("Disk = 100").unwrap());
        let child = store.insert(Record::parse("Free = Disk - Used").unwrap());
        store.chain_to(child, parent).unwrap();

        let ad = store.ad(child).unwrap();
        assert_eq!(internal_references(&ad), vec!["Disk"]);
        assert_eq!(external_references(&ad), vec!["Used"]);
    }
}
