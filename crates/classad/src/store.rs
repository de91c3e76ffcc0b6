//! Arena of records addressed by generational ids.
//!
//! Records that take part in chaining or collection membership live in an
//! [`AdStore`]. A [`RecordId`] stays valid until the record is destroyed;
//! after that every access through it reports
//! [`ClassAdError::DanglingRecord`] instead of reaching a reused slot.
//!
//! Each record carries a membership count maintained by
//! [`Collection`](crate::Collection). A record with memberships cannot be
//! removed directly; it is destroyed when its last membership is released.

use std::fmt;

use classad_parser::Expr;
use tracing::debug;

use crate::error::ClassAdError;
use crate::eval::{EvalError, Scope};
use crate::record::{Attribute, Attributes, Names, Record, Values};
use crate::unparser::expr_to_string;

/// Stable handle to a record in an [`AdStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    index: u32,
    generation: u32,
}

impl RecordId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Entry {
    record: Record,
    memberships: usize,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Owner of every record that can be chained or collected.
#[derive(Debug, Default)]
pub struct AdStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl AdStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Move a record into the store.
    pub fn insert(&mut self, record: Record) -> RecordId {
        let entry = Entry {
            record,
            memberships: 0,
        };
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return RecordId::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        RecordId::new(index, 0)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.entry(id).is_ok()
    }

    pub fn get(&self, id: RecordId) -> Result<&Record, ClassAdError> {
        self.entry(id).map(|entry| &entry.record)
    }

    pub fn get_mut(&mut self, id: RecordId) -> Result<&mut Record, ClassAdError> {
        self.entry_mut(id).map(|entry| &mut entry.record)
    }

    /// Number of collections currently holding `id`.
    pub fn memberships(&self, id: RecordId) -> Result<usize, ClassAdError> {
        self.entry(id).map(|entry| entry.memberships)
    }

    /// Take a record out of the store.
    ///
    /// Fails while any collection still holds the record. Records chained
    /// to it are left pointing at a dangling id.
    pub fn remove(&mut self, id: RecordId) -> Result<Record, ClassAdError> {
        let memberships = self.memberships(id)?;
        if memberships > 0 {
            return Err(ClassAdError::StillMember { id, memberships });
        }
        self.destroy(id)
    }

    fn destroy(&mut self, id: RecordId) -> Result<Record, ClassAdError> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .ok_or(ClassAdError::DanglingRecord(id))?;
        let entry = slot.entry.take().ok_or(ClassAdError::DanglingRecord(id))?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        debug!(record = %id, "record destroyed");
        Ok(entry.record)
    }

    pub(crate) fn acquire(&mut self, id: RecordId) -> Result<(), ClassAdError> {
        self.entry_mut(id)?.memberships += 1;
        Ok(())
    }

    /// Drop one membership. Returns true if that destroyed the record.
    pub(crate) fn release(&mut self, id: RecordId) -> Result<bool, ClassAdError> {
        let entry = self.entry_mut(id)?;
        entry.memberships = entry.memberships.saturating_sub(1);
        if entry.memberships > 0 {
            return Ok(false);
        }
        self.destroy(id)?;
        Ok(true)
    }

    // === Chaining ===

    /// Let `id` fall back to `parent`'s attributes on lookup misses.
    ///
    /// Replaces any previous chain. The parent is shared, not copied.
    pub fn chain_to(&mut self, id: RecordId, parent: RecordId) -> Result<(), ClassAdError> {
        if id == parent {
            return Err(ClassAdError::SelfChain(id));
        }
        self.entry(parent)?;
        self.get_mut(id)?.set_chain(Some(parent));
        debug!(record = %id, parent = %parent, "record chained");
        Ok(())
    }

    /// Drop the chain of `id`, returning the previous parent.
    pub fn unchain(&mut self, id: RecordId) -> Result<Option<RecordId>, ClassAdError> {
        let record = self.get_mut(id)?;
        let previous = record.chain();
        record.set_chain(None);
        if let Some(parent) = previous {
            debug!(record = %id, parent = %parent, "record unchained");
        }
        Ok(previous)
    }

    /// A chain-aware view of `id`.
    pub fn ad(&self, id: RecordId) -> Result<AdRef<'_>, ClassAdError> {
        let record = self.get(id)?;
        let chain = record
            .chain()
            .map(|parent| self.get(parent).map_err(|_| parent));
        Ok(AdRef { id, record, chain })
    }

    // === Chain-Aware Mutation ===

    /// Insert an assignment into `id`. The parent is never modified.
    pub fn insert_attr(&mut self, id: RecordId, expr: Expr) -> Result<bool, ClassAdError> {
        Ok(self.get_mut(id)?.insert(expr))
    }

    /// Delete `name` from `id`.
    ///
    /// The local entry is removed. If the parent defines `name`, the
    /// inherited value is then shadowed with `name = UNDEFINED` so it does
    /// not show through. Returns true if the record changed.
    pub fn delete(&mut self, id: RecordId, name: &str) -> Result<bool, ClassAdError> {
        let inherited = match self.get(id)?.chain() {
            Some(parent) => self.get(parent).map(|p| p.contains(name)).unwrap_or(false),
            None => false,
        };

        let record = self.get_mut(id)?;
        let removed = record.remove(name);
        if inherited {
            record.shadow_with_undefined(name);
            return Ok(true);
        }
        Ok(removed)
    }

    /// Drop the chain reference and every local attribute of `id`.
    pub fn clear(&mut self, id: RecordId) -> Result<(), ClassAdError> {
        self.get_mut(id)?.clear();
        Ok(())
    }

    /// Store a copy of `id` and return the copy's id.
    ///
    /// The copy shares the chain reference and starts with every attribute
    /// clean.
    pub fn duplicate(&mut self, id: RecordId) -> Result<RecordId, ClassAdError> {
        let copy = self.get(id)?.clone();
        Ok(self.insert(copy))
    }

    fn entry(&self, id: RecordId) -> Result<&Entry, ClassAdError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(ClassAdError::DanglingRecord(id))
    }

    fn entry_mut(&mut self, id: RecordId) -> Result<&mut Entry, ClassAdError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
            .ok_or(ClassAdError::DanglingRecord(id))
    }
}

/// A record together with its parent, borrowed from a store.
///
/// Lookups check the record first and then the parent's own attributes;
/// the parent's chain is never followed.
#[derive(Debug, Clone, Copy)]
pub struct AdRef<'a> {
    id: RecordId,
    record: &'a Record,
    /// `Err` holds the parent id when the parent has been destroyed.
    chain: Option<Result<&'a Record, RecordId>>,
}

impl<'a> AdRef<'a> {
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn record(&self) -> &'a Record {
        self.record
    }

    /// The parent record, if chained to a live one.
    pub fn parent(&self) -> Option<&'a Record> {
        self.chain.and_then(Result::ok)
    }

    /// Chain-aware lookup returning the right-hand side of `name`.
    pub fn lookup_expr(&self, name: &str) -> Result<Option<&'a Expr>, EvalError> {
        if let Some(rhs) = self.record.lookup_local(name) {
            return Ok(Some(rhs));
        }
        match self.chain {
            None => Ok(None),
            Some(Ok(parent)) => Ok(parent.lookup_local(name)),
            Some(Err(parent)) => Err(EvalError::dangling_record(parent)),
        }
    }

    /// Chain-aware attribute lookup.
    pub fn get(&self, name: &str) -> Option<&'a Attribute> {
        self.record
            .get(name)
            .or_else(|| self.parent().and_then(|p| p.get(name)))
    }

    /// Local attributes, then the parent's attributes.
    pub fn iter(&self) -> Attributes<'a> {
        let chained = self.parent().map(Record::attributes).unwrap_or(&[]);
        Attributes::new(self.record.attributes(), chained, false)
    }

    /// Dirty local attributes.
    ///
    /// Dirty flags describe changes made to this record, so the parent's
    /// attributes are not visited.
    pub fn iter_dirty(&self) -> Attributes<'a> {
        self.record.iter_dirty()
    }

    pub fn names(&self) -> Names<'a> {
        Names(self.iter())
    }

    pub fn values(&self) -> Values<'a> {
        Values(self.iter())
    }
}

impl Scope for AdRef<'_> {
    fn lookup(&self, name: &str) -> Result<Option<&Expr>, EvalError> {
        self.lookup_expr(name)
    }
}

/// Parent attributes first, then local ones, one `name = expr` per line.
impl fmt::Display for AdRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = self.parent() {
            for attr in parent.attributes() {
                writeln!(f, "{}", expr_to_string(attr.expr()))?;
            }
        }
        write!(f, "{}", self.record)
    }
}
