//! Bidirectional matchmaking.
//!
//! Two records match when each one's `Requirements` expression holds with
//! itself as `MY` and the other as `TARGET`, and each accepts the other's
//! declared type.
//!
//! # Example
//!
//! ```
//! use classad::{Matcher, Record, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! let mut job = Record::parse("Requirements = TARGET.Memory >= 1024").unwrap();
//! job.set_my_type(&registry, "Job");
//! job.set_target_type(&registry, "Machine");
//!
//! let mut machine = Record::parse("Memory = 2048\nRequirements = TRUE").unwrap();
//! machine.set_my_type(&registry, "Machine");
//! machine.set_target_type(&registry, "Job");
//!
//! assert!(Matcher::new().is_match(&job, &machine));
//! ```

use classad_parser::Expr;
use tracing::debug;

use crate::eval::{Evaluator, Scope, Value};
use crate::options::MatchOptions;
use crate::record::Record;
use crate::store::AdRef;

/// Something that can take part in a match: a record's type tags plus a
/// scope to resolve its attributes in.
pub trait Ad {
    /// The record carrying the type tags.
    fn record(&self) -> &Record;

    /// The scope attribute references resolve in.
    fn scope(&self) -> &dyn Scope;
}

impl Ad for Record {
    fn record(&self) -> &Record {
        self
    }

    fn scope(&self) -> &dyn Scope {
        self
    }
}

impl Ad for AdRef<'_> {
    fn record(&self) -> &Record {
        AdRef::record(self)
    }

    fn scope(&self) -> &dyn Scope {
        self
    }
}

/// The bidirectional match predicate.
#[derive(Debug, Clone)]
pub struct Matcher {
    /// `MY.<requirements attribute>`, built once.
    requirements: Expr,
    options: MatchOptions,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_options(MatchOptions::default())
    }
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MatchOptions) -> Self {
        Self {
            requirements: Expr::variable(format!("MY.{}", options.requirements_attr)),
            options,
        }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// True when both records accept each other.
    pub fn is_match<A, B>(&self, a: &A, b: &B) -> bool
    where
        A: Ad + ?Sized,
        B: Ad + ?Sized,
    {
        self.is_half_match(a, b) && self.is_half_match(b, a)
    }

    /// True when `mine` accepts `target`.
    ///
    /// `target`'s type must be the one `mine` asks for (or `mine` asks for
    /// the wildcard type), and `mine`'s requirements must evaluate to a true
    /// boolean or a non-zero integer.
    pub fn is_half_match<M, T>(&self, mine: &M, target: &T) -> bool
    where
        M: Ad + ?Sized,
        T: Ad + ?Sized,
    {
        if !self.accepts_type(mine.record(), target.record()) {
            debug!(
                wanted = mine.record().target_type().unwrap_or(""),
                offered = target.record().my_type().unwrap_or(""),
                "match rejected on type"
            );
            return false;
        }

        let result = Evaluator::paired(mine.scope(), target.scope())
            .with_options(self.options.eval.clone())
            .eval(&self.requirements);

        let accepted = match result {
            Value::Bool(b) => b,
            Value::Integer(n) => n != 0,
            _ => false,
        };
        if !accepted {
            debug!(requirements = %result, "match rejected on requirements");
        }
        accepted
    }

    fn accepts_type(&self, mine: &Record, target: &Record) -> bool {
        let wildcard = mine
            .target_type()
            .is_some_and(|name| name.eq_ignore_ascii_case(&self.options.wildcard_type));
        wildcard || target.my_type_number() == mine.target_type_number()
    }
}

/// [`Matcher::is_match`] with default options.
pub fn is_match<A, B>(a: &A, b: &B) -> bool
where
    A: Ad + ?Sized,
    B: Ad + ?Sized,
{
    Matcher::new().is_match(a, b)
}

/// [`Matcher::is_half_match`] with default options.
pub fn is_half_match<M, T>(mine: &M, target: &T) -> bool
where
    M: Ad + ?Sized,
    T: Ad + ?Sized,
{
    Matcher::new().is_half_match(mine, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{TypeRegistry, ANY_TYPE};
    use crate::AdStore;

    fn typed(registry: &TypeRegistry, my: &str, target: &str, text: &str) -> Record {
        let mut record = Record::parse(text).unwrap();
        record.set_my_type(registry, my);
        record.set_target_type(registry, target);
        record
    }

    #[test]
    fn bidirectional_match() {
        let registry = TypeRegistry::new();
        let a = typed(&registry, "A", "B", "Requirements = (TARGET.Foo == 1)");
        let mut b = typed(&registry, "B", "A", "Foo = 1\nRequirements = TRUE");

        assert!(is_match(&a, &b));
        b.assign_integer("Foo", 2);
        assert!(!is_match(&a, &b));
        assert!(is_half_match(&b, &a));
    }

    #[test]
    fn type_mismatch_rejects() {
        let registry = TypeRegistry::new();
        let job = typed(&registry, "Job", "Machine", "Requirements = TRUE");
        let other_job = typed(&registry, "Job", "Machine", "Requirements = TRUE");
        assert!(!is_half_match(&job, &other_job));
    }

    #[test]
    fn wildcard_target_type() {
        let registry = TypeRegistry::new();
        let any = typed(&registry, "Monitor", "any", "Requirements = TRUE");
        let job = typed(&registry, "Job", "Machine", "Requirements = TRUE");
        assert!(is_half_match(&any, &job));
        assert!(!is_half_match(&job, &any));

        let custom = typed(&registry, "Monitor", "*", "Requirements = TRUE");
        let matcher = Matcher::with_options(MatchOptions::default().with_wildcard_type("*"));
        assert!(matcher.is_half_match(&custom, &job));
        assert_eq!(MatchOptions::default().wildcard_type, ANY_TYPE);
    }

    #[test]
    fn requirements_must_be_true() {
        let registry = TypeRegistry::new();
        let target = typed(&registry, "B", "A", "Requirements = TRUE\nCpus = 4");

        for (text, expected) in [
            ("Requirements = TARGET.Cpus >= 2", true),
            ("Requirements = TARGET.Cpus", true),
            ("Requirements = TARGET.Cpus - 4", false),
            ("Requirements = TARGET.Missing > 1", false),
            ("Requirements = \"yes\"", false),
            ("Requirements = 1.0", false),
            ("Requirements = Cpus > 1", false),
            ("Other = TRUE", false),
        ] {
            let mine = typed(&registry, "A", "B", text);
            assert_eq!(is_half_match(&mine, &target), expected, "{}", text);
        }
    }

    #[test]
    fn custom_requirements_attribute() {
        let registry = TypeRegistry::new();
        let mine = typed(&registry, "A", "B", "Requirements = FALSE\nStartExpr = TRUE");
        let target = typed(&registry, "B", "A", "");

        let matcher = Matcher::with_options(MatchOptions::default().with_requirements_attr("StartExpr"));
        assert!(matcher.is_half_match(&mine, &target));
        assert!(!Matcher::new().is_half_match(&mine, &target));
    }

    #[test]
    fn chained_records_match_through_store() {
        let registry = TypeRegistry::new();
        let mut store = AdStore::new();
        let template = store.insert(Record::parse("Requirements = TARGET.Memory >= 512").unwrap());
        let job = store.insert(typed(&registry, "Job", "Machine", "Owner = \"alice\""));
        store.chain_to(job, template).unwrap();

        let machine = typed(&registry, "Machine", "Job", "Memory = 1024\nRequirements = TRUE");
        let job = store.ad(job).unwrap();
        assert!(is_match(&job, &machine));
    }
}
