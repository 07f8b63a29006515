//! Leafref path expressions and their equality predicates.
//!
//! A path is either absolute (`/if:interfaces/if:interface/if:name`) or
//! relative (`../name`). Any segment may carry predicates of the form
//! `[key = current()/../other]`, and a predicate's right-hand side may
//! itself be a relative path with further predicates. Nesting is owned, so
//! a predicate can never refer back to itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::QualifiedName;
use crate::error::{Error, Result};

/// Comparison used by a path predicate.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum PathOperator {
    #[default]
    #[serde(rename = "=")]
    Equals,
}

impl fmt::Display for PathOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathOperator::Equals => f.write_str("="),
        }
    }
}

/// One side of a predicate: exactly one of the two forms.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathOperand {
    NodeIdentifier(QualifiedName),
    RelativePath(RelativePath),
}

/// `1*("../")` followed by a descendant chain.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct RelativePath {
    pub ascend: u32,
    pub descendants: Vec<PathSegment>,
}

/// A node identifier step, optionally filtered by predicates.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct PathSegment {
    pub identifier: QualifiedName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<PathPredicate>,
}

/// `[node-identifier = key-expression]`.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct PathPredicate {
    node_identifier: QualifiedName,
    operator: PathOperator,
    left: PathOperand,
    right: PathOperand,
}

/// The full argument of a `path` statement.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathExpression {
    Absolute(Vec<PathSegment>),
    Relative(RelativePath),
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

impl PathSegment {
    pub fn new(identifier: QualifiedName) -> Self {
        Self {
            identifier,
            predicates: Vec::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: PathPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}

impl RelativePath {
    pub fn new(ascend: u32, descendants: Vec<PathSegment>) -> Self {
        Self {
            ascend,
            descendants,
        }
    }
}

impl PathPredicate {
    /// Build from already-typed operands. Cannot fail: the operand type
    /// holds exactly one form by construction.
    pub fn new(
        node_identifier: QualifiedName,
        operator: PathOperator,
        left: PathOperand,
        right: PathOperand,
    ) -> Self {
        Self {
            node_identifier,
            operator,
            left,
            right,
        }
    }

    /// Start a predicate whose operands are filled in slot by slot, the way
    /// a parser front end discovers them.
    pub fn builder(node_identifier: QualifiedName) -> PredicateBuilder {
        PredicateBuilder {
            node_identifier,
            operator: PathOperator::Equals,
            left: OperandSlot::default(),
            right: OperandSlot::default(),
        }
    }

    pub fn node_identifier(&self) -> &QualifiedName {
        &self.node_identifier
    }

    pub fn operator(&self) -> PathOperator {
        self.operator
    }

    pub fn left(&self) -> &PathOperand {
        &self.left
    }

    pub fn right(&self) -> &PathOperand {
        &self.right
    }
}

#[derive(Clone, Debug, Default)]
struct OperandSlot {
    identifier: Option<QualifiedName>,
    relative_path: Option<RelativePath>,
}

impl OperandSlot {
    fn into_operand(self, side: &str) -> Result<PathOperand> {
        match (self.identifier, self.relative_path) {
            (Some(id), None) => Ok(PathOperand::NodeIdentifier(id)),
            (None, Some(path)) => Ok(PathOperand::RelativePath(path)),
            (Some(_), Some(_)) => Err(Error::malformed(format!(
                "{side} operand holds both a node identifier and a relative path"
            ))),
            (None, None) => Err(Error::malformed(format!("{side} operand is empty"))),
        }
    }
}

/// Slot-wise builder for [`PathPredicate`].
#[derive(Clone, Debug)]
pub struct PredicateBuilder {
    node_identifier: QualifiedName,
    operator: PathOperator,
    left: OperandSlot,
    right: OperandSlot,
}

impl PredicateBuilder {
    pub fn operator(mut self, operator: PathOperator) -> Self {
        self.operator = operator;
        self
    }

    pub fn left_identifier(mut self, id: QualifiedName) -> Self {
        self.left.identifier = Some(id);
        self
    }

    pub fn left_relative_path(mut self, path: RelativePath) -> Self {
        self.left.relative_path = Some(path);
        self
    }

    pub fn right_identifier(mut self, id: QualifiedName) -> Self {
        self.right.identifier = Some(id);
        self
    }

    pub fn right_relative_path(mut self, path: RelativePath) -> Self {
        self.right.relative_path = Some(path);
        self
    }

    /// Fails with `MalformedPathExpression` unless each side holds exactly
    /// one operand form.
    pub fn build(self) -> Result<PathPredicate> {
        Ok(PathPredicate {
            left: self.left.into_operand("left")?,
            right: self.right.into_operand("right")?,
            node_identifier: self.node_identifier,
            operator: self.operator,
        })
    }
}

impl PathExpression {
    /// The identifier of the node the path finally designates.
    pub fn target(&self) -> Option<&QualifiedName> {
        let segments = match self {
            PathExpression::Absolute(segments) => segments,
            PathExpression::Relative(rel) => &rel.descendants,
        };
        segments.last().map(|s| &s.identifier)
    }

    pub fn segments(&self) -> &[PathSegment] {
        match self {
            PathExpression::Absolute(segments) => segments,
            PathExpression::Relative(rel) => &rel.descendants,
        }
    }
}

// ============================================================================
// TEXT FORM
// ============================================================================

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(Error::malformed(format!(
                "expected '{token}' at offset {} in '{}'",
                self.pos, self.text
            )))
        }
    }

    fn identifier(&mut self) -> Result<QualifiedName> {
        self.skip_ws();
        let rest = self.rest();
        let end = rest
            .find(|c: char| matches!(c, '/' | '[' | ']' | '=') || c.is_whitespace())
            .unwrap_or(rest.len());
        self.pos += end;
        QualifiedName::parse(&rest[..end])
    }

    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.pos == self.text.len()
    }

    fn segment(&mut self) -> Result<PathSegment> {
        let identifier = self.identifier()?;
        let mut predicates = Vec::new();
        while self.eat("[") {
            predicates.push(self.predicate()?);
        }
        Ok(PathSegment {
            identifier,
            predicates,
        })
    }

    fn predicate(&mut self) -> Result<PathPredicate> {
        let builder = if self.eat("current()") {
            self.expect("/")?;
            let left = self.relative()?;
            let key = left
                .descendants
                .last()
                .map(|s| s.identifier.clone())
                .ok_or_else(|| Error::malformed(format!("empty predicate key in '{}'", self.text)))?;
            PathPredicate::builder(key).left_relative_path(left)
        } else {
            let key = self.identifier()?;
            PathPredicate::builder(key.clone()).left_identifier(key)
        };
        self.expect("=")?;
        let builder = if self.eat("current()") {
            self.expect("/")?;
            builder.right_relative_path(self.relative()?)
        } else {
            builder.right_identifier(self.identifier()?)
        };
        self.expect("]")?;
        builder.build()
    }

    fn relative(&mut self) -> Result<RelativePath> {
        let mut ascend = 0;
        while self.eat("..") {
            self.expect("/")?;
            ascend += 1;
        }
        if ascend == 0 {
            return Err(Error::malformed(format!(
                "relative path '{}' must start with '../'",
                self.text
            )));
        }
        let mut descendants = vec![self.segment()?];
        while self.eat("/") {
            descendants.push(self.segment()?);
        }
        Ok(RelativePath {
            ascend,
            descendants,
        })
    }

    fn expression(&mut self) -> Result<PathExpression> {
        self.skip_ws();
        if self.rest().starts_with('/') {
            let mut segments = Vec::new();
            while self.eat("/") {
                segments.push(self.segment()?);
            }
            Ok(PathExpression::Absolute(segments))
        } else {
            if self.eat("current()") {
                self.expect("/")?;
            }
            self.relative().map(PathExpression::Relative)
        }
    }

    fn finish<T>(mut self, value: T) -> Result<T> {
        if self.at_end() {
            Ok(value)
        } else {
            Err(Error::malformed(format!(
                "unexpected '{}' in '{}'",
                self.rest(),
                self.text
            )))
        }
    }
}

impl FromStr for PathExpression {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut cursor = Cursor { text, pos: 0 };
        let expr = cursor.expression()?;
        cursor.finish(expr)
    }
}

impl FromStr for RelativePath {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut cursor = Cursor { text, pos: 0 };
        if cursor.eat("current()") {
            cursor.expect("/")?;
        }
        let path = cursor.relative()?;
        cursor.finish(path)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)?;
        for predicate in &self.predicates {
            write!(f, "{predicate}")?;
        }
        Ok(())
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.ascend {
            f.write_str("../")?;
        }
        for (i, segment) in self.descendants.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PathOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathOperand::NodeIdentifier(id) => write!(f, "{id}"),
            PathOperand::RelativePath(path) => write!(f, "current()/{path}"),
        }
    }
}

/// The text form names the key through the left operand; a
/// `node_identifier` that differs from it is not rendered.
impl fmt::Display for PathPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.left, self.operator, self.right)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathExpression::Absolute(segments) => {
                for segment in segments {
                    write!(f, "/{segment}")?;
                }
                Ok(())
            }
            PathExpression::Relative(rel) => write!(f, "{rel}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn q(text: &str) -> QualifiedName {
        QualifiedName::parse(text).unwrap()
    }

    #[test]
    fn test_predicate_with_relative_right_operand() {
        let predicate = PathPredicate::builder(q("id"))
            .left_identifier(q("id"))
            .operator(PathOperator::Equals)
            .right_relative_path("../name".parse().unwrap())
            .build()
            .unwrap();

        assert_eq!(predicate.operator(), PathOperator::Equals);
        assert_eq!(predicate.left(), &PathOperand::NodeIdentifier(q("id")));
        match predicate.right() {
            PathOperand::RelativePath(rel) => {
                assert_eq!(rel.ascend, 1);
                assert_eq!(rel.descendants[0].identifier, q("name"));
            }
            other => panic!("expected relative path, got {other:?}"),
        }
    }

    #[test]
    fn test_predicate_rejects_both_right_forms() {
        let err = PathPredicate::builder(q("id"))
            .left_identifier(q("id"))
            .right_identifier(q("name"))
            .right_relative_path("../name".parse().unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPathExpression { .. }));
    }

    #[test]
    fn test_predicate_rejects_empty_left() {
        let err = PathPredicate::builder(q("id"))
            .right_identifier(q("name"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("left operand is empty"));
    }

    #[test]
    fn test_parse_nested_predicates() {
        let expr: PathExpression =
            "/if:interfaces/if:interface[if:name = current()/../../ifname[k = current()/../key]]/if:type"
                .parse()
                .unwrap();

        let PathExpression::Absolute(segments) = &expr else {
            panic!("expected absolute path");
        };
        assert_eq!(segments.len(), 3);
        assert_eq!(expr.target(), Some(&q("if:type")));

        let outer = &segments[1].predicates[0];
        let PathOperand::RelativePath(rel) = outer.right() else {
            panic!("expected relative path");
        };
        assert_eq!(rel.ascend, 2);
        assert_eq!(rel.descendants[0].predicates.len(), 1);
    }

    #[rstest]
    #[case("../name")]
    #[case("../../a/b")]
    #[case("/x:a/x:b[k = current()/../c]")]
    fn test_display_reparses(#[case] text: &str) {
        let expr: PathExpression = text.parse().unwrap();
        assert_eq!(expr.to_string(), text);
    }

    #[test]
    fn test_relative_left_operand_is_rendered() {
        let left: RelativePath = "../peer/id".parse().unwrap();
        let predicate = PathPredicate::new(
            q("id"),
            PathOperator::Equals,
            PathOperand::RelativePath(left),
            PathOperand::RelativePath("../name".parse().unwrap()),
        );
        let segment = PathSegment::new(q("x:list")).with_predicate(predicate.clone());
        let expr = PathExpression::Absolute(vec![segment]);

        let text = expr.to_string();
        assert_eq!(text, "/x:list[current()/../peer/id = current()/../name]");
        let reparsed: PathExpression = text.parse().unwrap();
        assert_eq!(reparsed, expr);
        assert_eq!(reparsed.segments()[0].predicates[0], predicate);
    }

    #[rstest]
    #[case("name")]
    #[case("../")]
    #[case("/a[k = current()/../c")]
    #[case("../a b")]
    fn test_parse_rejects(#[case] text: &str) {
        let err = text.parse::<PathExpression>().unwrap_err();
        assert!(matches!(err, Error::MalformedPathExpression { .. }));
    }

    #[test]
    fn test_operand_serde_is_tagged() {
        let operand = PathOperand::NodeIdentifier(q("a:b"));
        let json = serde_json::to_string(&operand).unwrap();
        assert_eq!(json, r#"{"node-identifier":{"prefix":"a","name":"b"}}"#);

        let both = r#"{"node-identifier":{"name":"b"},"relative-path":{"ascend":1,"descendants":[]}}"#;
        assert!(serde_json::from_str::<PathOperand>(both).is_err());
    }
}
