use std::fmt;

use super::{Method, Pattern, Segment};

/// How the set of requests matched by one pattern relates to another's.
///
/// Relationships are read left to right: `a.relationship(&b) == MoreGeneral`
/// means every request matched by `b` is also matched by `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relationship {
    /// Both patterns match exactly the same requests.
    Equivalent,
    /// The left pattern matches a strict superset of the right one.
    MoreGeneral,
    /// The left pattern matches a strict subset of the right one.
    MoreSpecific,
    /// No request matches both patterns.
    Disjoint,
    /// Some requests match both patterns, neither contains the other.
    Overlaps,
}

impl Relationship {
    /// The relationship seen from the other side.
    pub fn inverse(self) -> Self {
        match self {
            Relationship::MoreGeneral => Relationship::MoreSpecific,
            Relationship::MoreSpecific => Relationship::MoreGeneral,
            other => other,
        }
    }

    /// Fold the relationship of the next component into the running result.
    pub fn combine(self, next: Relationship) -> Relationship {
        use Relationship::*;

        match (self, next) {
            (Equivalent, r) => r,
            (Disjoint, _) | (_, Disjoint) => Disjoint,
            (Overlaps, _) | (_, Overlaps) => Overlaps,
            (r, Equivalent) => r,
            (r, n) if r == n => r,
            _ => Overlaps,
        }
    }

    /// Two configured patterns with this relationship cannot both be used.
    pub fn is_conflict(self) -> bool {
        matches!(self, Relationship::Equivalent | Relationship::Overlaps)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relationship::Equivalent => "equivalent",
            Relationship::MoreGeneral => "more general",
            Relationship::MoreSpecific => "more specific",
            Relationship::Disjoint => "disjoint",
            Relationship::Overlaps => "overlaps",
        };
        f.write_str(s)
    }
}

fn method_relationship(a: Option<Method>, b: Option<Method>) -> Relationship {
    match (a, b) {
        (None, None) => Relationship::Equivalent,
        (None, Some(_)) => Relationship::MoreGeneral,
        (Some(_), None) => Relationship::MoreSpecific,
        (Some(a), Some(b)) if a == b => Relationship::Equivalent,
        (Some(_), Some(_)) => Relationship::Disjoint,
    }
}

fn segment_relationship(a: &Segment, b: &Segment) -> Relationship {
    use Segment::*;

    match (a, b) {
        (MultiIdentifier(_), MultiIdentifier(_)) => Relationship::Equivalent,
        (MultiIdentifier(_), _) => Relationship::MoreGeneral,
        (_, MultiIdentifier(_)) => Relationship::MoreSpecific,
        (Identifier(_), Identifier(_)) => Relationship::Equivalent,
        (Identifier(_), Literal(_)) => Relationship::MoreGeneral,
        (Literal(_), Identifier(_)) => Relationship::MoreSpecific,
        (Literal(a), Literal(b)) if a == b => Relationship::Equivalent,
        (Literal(_), Literal(_)) => Relationship::Disjoint,
    }
}

fn path_relationship(a: &Pattern, b: &Pattern) -> Relationship {
    if !a.ends_with_multi() && !b.ends_with_multi() && a.segments.len() != b.segments.len() {
        return Relationship::Disjoint;
    }

    let mut result = Relationship::Equivalent;
    for (sa, sb) in a.segments.iter().zip(&b.segments) {
        result = result.combine(segment_relationship(sa, sb));
        if result == Relationship::Disjoint {
            return result;
        }
        // A multi identifier swallows whatever the other pattern has left.
        if sa.is_multi() || sb.is_multi() {
            return result;
        }
    }

    if a.segments.len() != b.segments.len() {
        // The shorter pattern ran out without reaching a multi identifier, so it
        // never matches as many segments as the longer one requires.
        return Relationship::Disjoint;
    }
    result
}

impl Pattern {
    /// Compare the requests matched by `self` against those matched by `other`.
    pub fn relationship(&self, other: &Pattern) -> Relationship {
        let method = method_relationship(self.method, other.method);
        if method == Relationship::Disjoint {
            return Relationship::Disjoint;
        }
        method.combine(path_relationship(self, other))
    }
}

#[cfg(test)]
mod tests {
    use super::Relationship::*;
    use super::*;
    use crate::pattern::PatternError;

    fn rel(a: &str, b: &str) -> Result<Relationship, PatternError> {
        Ok(Pattern::parse(a)?.relationship(&Pattern::parse(b)?))
    }

    #[test]
    fn combine_algebra() {
        let all = [Equivalent, MoreGeneral, MoreSpecific, Disjoint, Overlaps];
        for r in all {
            assert_eq!(Equivalent.combine(r), r);
            assert_eq!(Disjoint.combine(r), Disjoint);
        }
        assert_eq!(Overlaps.combine(Disjoint), Disjoint);
        assert_eq!(Overlaps.combine(MoreGeneral), Overlaps);
        assert_eq!(Overlaps.combine(Equivalent), Overlaps);
        assert_eq!(MoreGeneral.combine(Equivalent), MoreGeneral);
        assert_eq!(MoreSpecific.combine(Equivalent), MoreSpecific);
        assert_eq!(MoreGeneral.combine(MoreSpecific), Overlaps);
        assert_eq!(MoreSpecific.combine(MoreGeneral), Overlaps);
        assert_eq!(MoreGeneral.combine(MoreGeneral), MoreGeneral);
        assert_eq!(MoreSpecific.combine(Disjoint), Disjoint);
    }

    #[test]
    fn inverse_is_involution() {
        for r in [Equivalent, MoreGeneral, MoreSpecific, Disjoint, Overlaps] {
            assert_eq!(r.inverse().inverse(), r);
        }
        assert_eq!(MoreGeneral.inverse(), MoreSpecific);
        assert_eq!(Overlaps.inverse(), Overlaps);
    }

    #[test]
    fn method_relationships() -> Result<(), PatternError> {
        assert_eq!(rel("/foo", "/foo")?, Equivalent);
        assert_eq!(rel("/foo", "GET /foo")?, MoreGeneral);
        assert_eq!(rel("GET /foo", "/foo")?, MoreSpecific);
        assert_eq!(rel("GET /foo", "POST /foo")?, Disjoint);
        assert_eq!(rel("GET /foo", "GET /foo")?, Equivalent);
        Ok(())
    }

    #[test]
    fn segment_relationships() -> Result<(), PatternError> {
        assert_eq!(rel("/foo/{bar}", "/foo/{baz}")?, Equivalent);
        assert_eq!(rel("/foo/{id}", "/foo/bar")?, MoreGeneral);
        assert_eq!(rel("/foo/bar", "/foo/baz")?, Disjoint);
        assert_eq!(rel("/foo/bar", "/foo/bar/baz")?, Disjoint);
        assert_eq!(rel("/{a}/bar", "/foo/{b}")?, Overlaps);
        Ok(())
    }

    #[test]
    fn multi_identifier_relationships() -> Result<(), PatternError> {
        assert_eq!(rel("/foo/{all...}", "/foo/bar/baz")?, MoreGeneral);
        assert_eq!(rel("/foo/{all...}", "/foo/{rest...}")?, Equivalent);
        assert_eq!(rel("/{all...}", "/foo/{rest...}")?, MoreGeneral);
        assert_eq!(rel("/foo/{all...}", "/foo")?, Disjoint);
        assert_eq!(rel("/foo/{all...}", "/bar/baz")?, Disjoint);
        assert_eq!(rel("/{a}/bar/{all...}", "/foo/{b...}")?, Overlaps);
        Ok(())
    }

    #[test]
    fn method_and_path_combine() -> Result<(), PatternError> {
        assert_eq!(rel("GET /foo/bar", "/foo/{all...}")?, MoreSpecific);
        assert_eq!(rel("/foo/bar", "GET /foo/{id}")?, Overlaps);
        assert_eq!(rel("GET /foo/bar", "POST /foo/{all...}")?, Disjoint);
        Ok(())
    }

    #[test]
    fn relationship_is_antisymmetric() -> Result<(), PatternError> {
        let patterns = [
            "/foo",
            "GET /foo",
            "/foo/{id}",
            "/foo/bar",
            "POST /foo/bar",
            "/foo/{all...}",
            "/{all...}",
            "/{a}/bar",
            "/foo/{b}/baz",
        ];
        for a in patterns {
            for b in patterns {
                assert_eq!(rel(a, b)?, rel(b, a)?.inverse(), "{a:?} vs {b:?}");
            }
        }
        Ok(())
    }
}
