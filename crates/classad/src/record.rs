//! Records (ads): ordered sets of `name = expr` attributes.
//!
//! A record keeps its attributes in insertion order alongside a
//! case-insensitive index. Names keep the spelling they were inserted
//! with. Re-inserting a name removes the old entry first, so iteration
//! order reflects the most recent insert. Every inserted attribute is
//! marked dirty until the flags are cleared.
//!
//! A record may be chained to a parent record held in the same
//! [`AdStore`](crate::AdStore); chain-aware operations (fall-through
//! lookup, delete-as-shadow, chained iteration) go through the store's
//! [`AdRef`](crate::AdRef) view. On its own a `Record` only sees its local
//! attributes.

use std::fmt;

use classad_parser::{parse_assignment, parse_expr, Expr};
use rustc_hash::FxHashMap;

use crate::error::ClassAdError;
use crate::eval::{EvalError, Scope};
use crate::registry::TypeRegistry;
use crate::store::RecordId;
use crate::unparser::expr_to_string;

/// Attribute holding a record's own type name when read from text.
pub const ATTR_MY_TYPE: &str = "MyType";
/// Attribute holding the type a record wants to match against.
pub const ATTR_TARGET_TYPE: &str = "TargetType";

/// One `name = expr` entry.
#[derive(Debug, PartialEq)]
pub struct Attribute {
    name: String,
    /// The whole assignment node.
    expr: Expr,
    dirty: bool,
}

impl Attribute {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The whole `name = expr` assignment.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// The right-hand side of the assignment.
    pub fn value(&self) -> &Expr {
        match self.expr.as_assignment() {
            Some((_, rhs)) => rhs,
            None => &self.expr,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// A type name together with its registry number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTag {
    pub name: String,
    pub number: i32,
}

/// A ClassAd record.
#[derive(Debug, Default)]
pub struct Record {
    attrs: Vec<Attribute>,
    /// Lower-cased name -> position in `attrs`.
    index: FxHashMap<String, usize>,
    chain: Option<RecordId>,
    my_type: Option<TypeTag>,
    target_type: Option<TypeTag>,
}

fn index_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from assignment expressions, in order.
    pub fn from_exprs(exprs: impl IntoIterator<Item = Expr>) -> Result<Self, ClassAdError> {
        let mut record = Self::new();
        for expr in exprs {
            if !record.insert(expr) {
                return Err(ClassAdError::NotAssignment);
            }
        }
        Ok(record)
    }

    /// Parse a record from `name = expr` statements separated by newlines
    /// or commas. Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, ClassAdError> {
        Self::parse_statements(split_statements(text, |c| c == '\n' || c == ','))
    }

    /// Parse a record from a single string whose statements are separated
    /// by `delimiter`.
    pub fn from_delimited_str(text: &str, delimiter: char) -> Result<Self, ClassAdError> {
        Self::parse_statements(split_statements(text, |c| c == delimiter))
    }

    fn parse_statements<'t>(statements: impl IntoIterator<Item = &'t str>) -> Result<Self, ClassAdError> {
        let mut record = Self::new();
        for statement in statements {
            let statement = statement.trim();
            if statement.is_empty() || statement.starts_with('#') {
                continue;
            }
            record.insert_str(statement)?;
        }
        Ok(record)
    }

    /// Number of local attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    // === Insert / Delete ===

    /// Insert an assignment, replacing any local attribute of the same name.
    ///
    /// Returns false, leaving the record untouched, unless `expr` is
    /// `Assign(Variable(name), rhs)`. The new entry goes to the end and is
    /// marked dirty. The chain is never consulted or modified.
    pub fn insert(&mut self, expr: Expr) -> bool {
        let name = match expr.as_assignment() {
            Some((name, _)) => name.to_string(),
            None => return false,
        };

        self.remove(&name);

        self.index.insert(index_key(&name), self.attrs.len());
        self.attrs.push(Attribute {
            name,
            expr,
            dirty: true,
        });
        true
    }

    /// Parse `name = expr` and insert it.
    pub fn insert_str(&mut self, text: &str) -> Result<(), ClassAdError> {
        let expr = parse_assignment(text).map_err(|err| {
            if parse_expr(text).is_ok() {
                ClassAdError::NotAssignment
            } else {
                ClassAdError::Parse(err)
            }
        })?;
        self.insert(expr);
        Ok(())
    }

    /// Remove the local attribute `name`. Returns true if it was present.
    ///
    /// This is a plain removal: an inherited attribute of the same name
    /// becomes visible again. See [`Record::shadow_with_undefined`] for the
    /// chained delete.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(pos) = self.index.remove(&index_key(name)) else {
            return false;
        };
        self.attrs.remove(pos);
        for (i, attr) in self.attrs.iter().enumerate().skip(pos) {
            self.index.insert(index_key(&attr.name), i);
        }
        true
    }

    /// Hide an inherited attribute by defining `name = UNDEFINED` locally.
    ///
    /// Goes through [`Record::insert`], which only ever removes local
    /// entries, so shadowing never recurses into another shadow.
    pub fn shadow_with_undefined(&mut self, name: &str) {
        self.insert(Expr::assign(name, Expr::undefined()));
    }

    /// Drop the chain reference and every local attribute.
    pub fn clear(&mut self) {
        self.chain = None;
        self.attrs.clear();
        self.index.clear();
    }

    // === Lookup ===

    /// Right-hand side of the local attribute `name`.
    pub fn lookup_local(&self, name: &str) -> Option<&Expr> {
        self.get(name).map(Attribute::value)
    }

    /// The local attribute `name`.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.index
            .get(&index_key(name))
            .and_then(|pos| self.attrs.get(*pos))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&index_key(name))
    }

    /// The record this one is chained to, if any.
    pub fn chain(&self) -> Option<RecordId> {
        self.chain
    }

    pub(crate) fn set_chain(&mut self, chain: Option<RecordId>) {
        self.chain = chain;
    }

    // === Iteration ===

    /// Iterate over local attributes in order.
    pub fn iter(&self) -> Attributes<'_> {
        Attributes::new(&self.attrs, &[], false)
    }

    /// Iterate over dirty local attributes in order.
    pub fn iter_dirty(&self) -> Attributes<'_> {
        Attributes::new(&self.attrs, &[], true)
    }

    pub fn names(&self) -> Names<'_> {
        Names(self.iter())
    }

    pub fn values(&self) -> Values<'_> {
        Values(self.iter())
    }

    pub(crate) fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    // === Dirty Flags ===

    /// Mark `name` dirty. Returns false if it is not a local attribute.
    pub fn set_dirty(&mut self, name: &str) -> bool {
        match self.index.get(&index_key(name)) {
            Some(pos) => {
                self.attrs[*pos].dirty = true;
                true
            }
            None => false,
        }
    }

    /// `Some(dirty)` for a local attribute, `None` if it does not exist.
    pub fn dirty_state(&self, name: &str) -> Option<bool> {
        self.get(name).map(Attribute::is_dirty)
    }

    pub fn clear_all_dirty(&mut self) {
        for attr in &mut self.attrs {
            attr.dirty = false;
        }
    }

    // === Assign Helpers ===

    /// Insert `name = "value"`, or `name = UNDEFINED` for `None`.
    pub fn assign_string(&mut self, name: &str, value: Option<&str>) {
        let rhs = value.map(Expr::string).unwrap_or_else(Expr::undefined);
        self.insert(Expr::assign(name, rhs));
    }

    pub fn assign_integer(&mut self, name: &str, value: i64) {
        self.insert(Expr::assign(name, Expr::integer(value)));
    }

    pub fn assign_float(&mut self, name: &str, value: f64) {
        self.insert(Expr::assign(name, Expr::float(value)));
    }

    pub fn assign_bool(&mut self, name: &str, value: bool) {
        self.insert(Expr::assign(name, Expr::bool(value)));
    }

    /// Parse `source` as an expression and insert `name = source`.
    pub fn assign_expr(&mut self, name: &str, source: &str) -> Result<(), ClassAdError> {
        let rhs = parse_expr(source)?;
        self.insert(Expr::assign(name, rhs));
        Ok(())
    }

    // === Type Tags ===

    pub fn set_my_type(&mut self, registry: &TypeRegistry, name: &str) {
        self.my_type = Some(TypeTag {
            name: name.to_string(),
            number: registry.register(name),
        });
    }

    pub fn set_target_type(&mut self, registry: &TypeRegistry, name: &str) {
        self.target_type = Some(TypeTag {
            name: name.to_string(),
            number: registry.register(name),
        });
    }

    pub fn my_type(&self) -> Option<&str> {
        self.my_type.as_ref().map(|t| t.name.as_str())
    }

    pub fn my_type_number(&self) -> Option<i32> {
        self.my_type.as_ref().map(|t| t.number)
    }

    pub fn target_type(&self) -> Option<&str> {
        self.target_type.as_ref().map(|t| t.name.as_str())
    }

    pub fn target_type_number(&self) -> Option<i32> {
        self.target_type.as_ref().map(|t| t.number)
    }

    /// Set the type tags from string-literal `MyType` and `TargetType`
    /// attributes, when present.
    pub fn adopt_type_attributes(&mut self, registry: &TypeRegistry) {
        if let Some(name) = self.lookup_string(ATTR_MY_TYPE) {
            self.set_my_type(registry, &name);
        }
        if let Some(name) = self.lookup_string(ATTR_TARGET_TYPE) {
            self.set_target_type(registry, &name);
        }
    }
}

/// A copy deep-copies every attribute, keeps the chain reference and the
/// type tags, and starts with every dirty flag cleared.
impl Clone for Record {
    fn clone(&self) -> Self {
        Self {
            attrs: self
                .attrs
                .iter()
                .map(|attr| Attribute {
                    name: attr.name.clone(),
                    expr: attr.expr.clone(),
                    dirty: false,
                })
                .collect(),
            index: self.index.clone(),
            chain: self.chain,
            my_type: self.my_type.clone(),
            target_type: self.target_type.clone(),
        }
    }
}

impl Scope for Record {
    fn lookup(&self, name: &str) -> Result<Option<&Expr>, EvalError> {
        match (self.lookup_local(name), self.chain) {
            (Some(rhs), _) => Ok(Some(rhs)),
            (None, None) => Ok(None),
            (None, Some(parent)) => Err(EvalError::detached_chain(parent)),
        }
    }
}

/// One `name = expr` line per local attribute.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for attr in &self.attrs {
            writeln!(f, "{}", expr_to_string(&attr.expr))?;
        }
        Ok(())
    }
}

// === Iterators ===

/// Caller-owned cursor over a record's attributes.
///
/// Walks the local attributes, then (for a chained view) the parent's
/// attributes once. `reset` restarts from the first attribute.
#[derive(Debug, Clone)]
pub struct Attributes<'a> {
    local: &'a [Attribute],
    chained: &'a [Attribute],
    pos: usize,
    in_chain: bool,
    dirty_only: bool,
}

impl<'a> Attributes<'a> {
    pub(crate) fn new(local: &'a [Attribute], chained: &'a [Attribute], dirty_only: bool) -> Self {
        Self {
            local,
            chained,
            pos: 0,
            in_chain: false,
            dirty_only,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
        self.in_chain = false;
    }
}

impl<'a> Iterator for Attributes<'a> {
    type Item = &'a Attribute;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let slice = if self.in_chain { self.chained } else { self.local };
            match slice.get(self.pos) {
                Some(attr) => {
                    self.pos += 1;
                    if self.dirty_only && !attr.dirty {
                        continue;
                    }
                    return Some(attr);
                }
                None if !self.in_chain => {
                    self.in_chain = true;
                    self.pos = 0;
                }
                None => return None,
            }
        }
    }
}

/// Attribute names, in iteration order.
#[derive(Debug, Clone)]
pub struct Names<'a>(pub(crate) Attributes<'a>);

impl Names<'_> {
    pub fn reset(&mut self) {
        self.0.reset();
    }
}

impl<'a> Iterator for Names<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(Attribute::name)
    }
}

/// Attribute right-hand sides, in iteration order.
#[derive(Debug, Clone)]
pub struct Values<'a>(pub(crate) Attributes<'a>);

impl Values<'_> {
    pub fn reset(&mut self) {
        self.0.reset();
    }
}

impl<'a> Iterator for Values<'a> {
    type Item = &'a Expr;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(Attribute::value)
    }
}

/// Split `text` at separator characters that are not inside a string literal.
fn split_statements(text: &str, is_separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if c == '"' {
            in_string = true;
        } else if is_separator(c) {
            pieces.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    pieces.push(&text[start..]);
    pieces
}
