//! Record collections with multi-membership and aggregates.
//!
//! A [`Collection`] holds [`RecordId`]s into an [`AdStore`]. The same record
//! may be held by any number of collections; the store counts memberships
//! and destroys the record when the last collection lets go of it.
//!
//! For every attribute name defined by a member, the collection keeps an
//! aggregate entry `name = AggOp(name = v1, name = v2, ...)` folding that
//! attribute across members. Inserting or deleting a member recomputes the
//! entries for the names that member defines.

use classad_parser::{AggregateOp, Expr};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::ClassAdError;
use crate::eval::{EvalError, Evaluator, Scope, Value};
use crate::record::Record;
use crate::store::{AdRef, AdStore, RecordId};

/// An ordered group of records held in an [`AdStore`].
///
/// A collection cannot reach the store when it is dropped, so its
/// memberships must be given back with [`Collection::dispose`]. Dropping a
/// non-empty collection leaves its records held in the store and logs a
/// warning.
#[derive(Debug, Default)]
pub struct Collection {
    members: Vec<RecordId>,
    aggregates: Record,
    /// Lower-cased attribute name -> aggregate kind.
    kinds: FxHashMap<String, AggregateOp>,
    default_kind: AggregateOp,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `kind` for every name without an explicit kind.
    pub fn with_default_kind(mut self, kind: AggregateOp) -> Self {
        self.default_kind = kind;
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.members.contains(&id)
    }

    /// Member ids in collection order.
    pub fn members(&self) -> &[RecordId] {
        &self.members
    }

    /// Add `id` at the end. Returns false if it is already a member.
    pub fn insert(&mut self, store: &mut AdStore, id: RecordId) -> Result<bool, ClassAdError> {
        if self.contains(id) {
            return Ok(false);
        }
        store.acquire(id)?;
        self.members.push(id);
        debug!(record = %id, members = self.members.len(), "record added to collection");

        let names = attribute_names(store, id)?;
        self.update_aggregates(store, &names)?;
        Ok(true)
    }

    /// Remove `id` from this collection. Returns false if it was not a member.
    ///
    /// If this was the record's last membership the record is destroyed.
    pub fn delete(&mut self, store: &mut AdStore, id: RecordId) -> Result<bool, ClassAdError> {
        let Some(pos) = self.members.iter().position(|member| *member == id) else {
            return Ok(false);
        };
        let names = attribute_names(store, id)?;

        self.members.remove(pos);
        if store.release(id)? {
            debug!(record = %id, "last membership released");
        }

        self.update_aggregates(store, &names)?;
        Ok(true)
    }

    /// Release every membership this collection holds.
    pub fn dispose(mut self, store: &mut AdStore) -> Result<(), ClassAdError> {
        for id in std::mem::take(&mut self.members) {
            store.release(id)?;
        }
        Ok(())
    }

    /// First member, in order, that defines `name`, with the right-hand
    /// side of its definition.
    ///
    /// Members whose chained parent no longer exists are skipped. If no
    /// other member defines `name`, the first such failure is returned.
    pub fn lookup<'s>(
        &self,
        store: &'s AdStore,
        name: &str,
    ) -> Result<Option<(&'s Expr, RecordId)>, ClassAdError> {
        let mut failure = None;
        for id in &self.members {
            let ad = store.ad(*id)?;
            match ad.lookup_expr(name) {
                Ok(Some(rhs)) => return Ok(Some((rhs, *id))),
                Ok(None) => {}
                Err(_) => {
                    let parent = ad.record().chain().unwrap_or(*id);
                    failure.get_or_insert(ClassAdError::DanglingRecord(parent));
                }
            }
        }
        failure.map_or(Ok(None), Err)
    }

    /// This collection as an evaluation scope over `store`.
    pub fn view<'a>(&'a self, store: &'a AdStore) -> CollectionView<'a> {
        CollectionView {
            collection: self,
            store,
        }
    }

    /// Walk the members in order.
    ///
    /// The cursor borrows the collection exclusively, so only one traversal
    /// can be open at a time and membership cannot change under it.
    pub fn cursor<'a>(&'a mut self, store: &'a AdStore) -> Cursor<'a> {
        Cursor {
            members: &self.members,
            store,
            pos: 0,
        }
    }

    // === Aggregates ===

    /// Fold `name` across every member that defines it into a fresh
    /// `name = op(...)` expression. `None` if no member defines it.
    pub fn build_aggregate(
        &self,
        store: &AdStore,
        name: &str,
        op: AggregateOp,
    ) -> Result<Option<Expr>, ClassAdError> {
        let mut terms = Vec::new();
        for id in &self.members {
            let ad = store.ad(*id)?;
            if let Ok(Some(rhs)) = ad.lookup_expr(name) {
                terms.push(Expr::assign(name, rhs.clone()));
            }
        }

        let count = terms.len();
        let Some(folded) = terms
            .into_iter()
            .reduce(|acc, term| Expr::aggregate(op, acc, term))
        else {
            return Ok(None);
        };

        // A single definition is stored as is.
        Ok(Some(if count == 1 {
            folded
        } else {
            Expr::assign(name, folded)
        }))
    }

    /// Aggregate kind used for `name`.
    pub fn aggregate_kind(&self, name: &str) -> AggregateOp {
        self.kinds
            .get(&name.to_ascii_lowercase())
            .copied()
            .unwrap_or(self.default_kind)
    }

    /// Choose the aggregate kind for `name` and rebuild its entry.
    pub fn set_aggregate_kind(
        &mut self,
        store: &AdStore,
        name: &str,
        kind: AggregateOp,
    ) -> Result<(), ClassAdError> {
        self.kinds.insert(name.to_ascii_lowercase(), kind);
        self.update_aggregates(store, &[name.to_string()])
    }

    /// The aggregate entries, one per attribute name defined by a member.
    pub fn aggregates(&self) -> &Record {
        &self.aggregates
    }

    /// Evaluate the aggregate for `name` against this collection.
    pub fn aggregate_value(&self, store: &AdStore, name: &str) -> Option<Value> {
        let expr = self.aggregates.lookup_local(name)?;
        Some(Evaluator::new(&self.view(store)).eval(expr))
    }

    /// Rebuild every aggregate entry from the current members.
    pub fn refresh_aggregates(&mut self, store: &AdStore) -> Result<(), ClassAdError> {
        let mut names: Vec<String> = self.aggregates.names().map(str::to_string).collect();
        for id in &self.members {
            names.extend(attribute_names(store, *id)?);
        }
        self.update_aggregates(store, &names)
    }

    fn update_aggregates(&mut self, store: &AdStore, names: &[String]) -> Result<(), ClassAdError> {
        for name in names {
            let kind = self.aggregate_kind(name);
            match self.build_aggregate(store, name, kind)? {
                Some(expr) => {
                    self.aggregates.insert(expr);
                }
                None => {
                    self.aggregates.remove(name);
                }
            }
        }
        Ok(())
    }
}

impl Drop for Collection {
    fn drop(&mut self) {
        if !self.members.is_empty() {
            warn!(
                members = self.members.len(),
                "collection dropped without dispose; its records stay in the store"
            );
        }
    }
}

fn attribute_names(store: &AdStore, id: RecordId) -> Result<Vec<String>, ClassAdError> {
    Ok(store.ad(id)?.names().map(str::to_string).collect())
}

/// A collection resolving names through its members, first match wins.
#[derive(Debug, Clone, Copy)]
pub struct CollectionView<'a> {
    collection: &'a Collection,
    store: &'a AdStore,
}

impl Scope for CollectionView<'_> {
    fn lookup(&self, name: &str) -> Result<Option<&Expr>, EvalError> {
        let mut failure = None;
        for id in &self.collection.members {
            let ad = self
                .store
                .ad(*id)
                .map_err(|_| EvalError::dangling_record(*id))?;
            match ad.lookup_expr(name) {
                Ok(Some(rhs)) => return Ok(Some(rhs)),
                Ok(None) => {}
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        failure.map_or(Ok(None), Err)
    }
}

/// Exclusive cursor over a collection's members.
#[derive(Debug)]
pub struct Cursor<'a> {
    members: &'a [RecordId],
    store: &'a AdStore,
    pos: usize,
}

impl Cursor<'_> {
    /// Start again from the first member.
    pub fn reset(&mut self) {
        self.pos = 0;
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = Result<AdRef<'a>, ClassAdError>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = *self.members.get(self.pos)?;
        self.pos += 1;
        Some(self.store.ad(id))
    }
}
