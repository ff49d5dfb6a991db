use std::fmt;

use num_bigint::BigInt;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::error::ShapeError;

/// Variable name without the leading `?`.
pub type Variable = String;
/// A pre-formatted term: `?var`, `prefix:name`, `<iri>`, `"literal"`, ...
pub type Term = String;
pub type Predicate = String;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    String(String),
    Integer(BigInt),
}

impl Literal {
    pub fn string(s: impl Into<String>) -> Self {
        Literal::String(s.into())
    }

    pub fn integer(n: impl Into<BigInt>) -> Self {
        Literal::Integer(n.into())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
            Literal::Integer(n) => write!(f, "{}", n),
        }
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        literal.to_string()
    }
}

/// Prefix name to IRI, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrefixTable(Vec<(String, String)>);

impl PrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebinding an existing name keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, iri: impl Into<String>) {
        let (name, iri) = (name.into(), iri.into());
        match self.0.iter().position(|(existing, _)| *existing == name) {
            Some(index) => self.0[index].1 = iri,
            None => self.0.push((name, iri)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, iri)| iri.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, iri)| (name.as_str(), iri.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, I: Into<String>> FromIterator<(N, I)> for PrefixTable {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        let mut table = PrefixTable::new();
        for (name, iri) in iter {
            table.insert(name, iri);
        }
        table
    }
}

impl<'de> Deserialize<'de> for PrefixTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PrefixTableVisitor;

        impl<'de> Visitor<'de> for PrefixTableVisitor {
            type Value = PrefixTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table of prefix names to IRIs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PrefixTable, A::Error> {
                let mut table = PrefixTable::new();
                while let Some((name, iri)) = map.next_entry::<String, String>()? {
                    table.insert(name, iri);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(PrefixTableVisitor)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectItem {
    Var(Variable),
    Expr { expr: String, alias: Variable },
}

impl SelectItem {
    pub fn var(name: impl Into<Variable>) -> Self {
        SelectItem::Var(name.into())
    }

    pub fn expr(expr: impl Into<String>, alias: impl Into<Variable>) -> Self {
        SelectItem::Expr {
            expr: expr.into(),
            alias: alias.into(),
        }
    }

    /// The result column this item produces.
    pub fn column(&self) -> &str {
        match self {
            SelectItem::Var(name) => name,
            SelectItem::Expr { alias, .. } => alias,
        }
    }
}

impl From<&str> for SelectItem {
    fn from(name: &str) -> Self {
        SelectItem::var(name)
    }
}

/// A non-empty, ordered projection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectClause(Vec<SelectItem>);

impl SelectClause {
    pub fn new(items: Vec<SelectItem>) -> Result<Self, ShapeError> {
        if items.is_empty() {
            return Err(ShapeError::EmptySelect);
        }
        Ok(Self(items))
    }

    pub fn items(&self) -> &[SelectItem] {
        &self.0
    }
}

/// Predicates in first-declaration order, each with its object list.
///
/// A predicate may be declared with no objects yet; it is left out of the
/// rendered text until an object is added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyList(Vec<(Predicate, Vec<Term>)>);

impl PropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, predicate: impl Into<Predicate>) -> &mut Vec<Term> {
        let predicate = predicate.into();
        let index = match self.0.iter().position(|(p, _)| *p == predicate) {
            Some(index) => index,
            None => {
                self.0.push((predicate, Vec::new()));
                self.0.len() - 1
            }
        };
        &mut self.0[index].1
    }

    /// Adds `object` to the predicate's list unless it is already there.
    pub fn push(&mut self, predicate: impl Into<Predicate>, object: impl Into<Term>) {
        let object = object.into();
        let objects = self.declare(predicate);
        if !objects.contains(&object) {
            objects.push(object);
        }
    }

    pub fn objects(&self, predicate: &str) -> Option<&[Term]> {
        self.0
            .iter()
            .find(|(p, _)| p == predicate)
            .map(|(_, objects)| objects.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Term])> {
        self.0.iter().map(|(p, objects)| (p.as_str(), objects.as_slice()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripleGroup {
    pub subject: Term,
    pub properties: PropertyList,
}

impl TripleGroup {
    pub fn new(subject: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            properties: PropertyList::new(),
        }
    }

    pub fn with(mut self, predicate: impl Into<Predicate>, object: impl Into<Term>) -> Self {
        self.properties.push(predicate, object);
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<Predicate>) -> Self {
        self.properties.declare(predicate);
        self
    }

    pub fn push(&mut self, predicate: impl Into<Predicate>, object: impl Into<Term>) {
        self.properties.push(predicate, object);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Group(pub Vec<PatternNode>);

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, node: impl Into<PatternNode>) -> Self {
        self.push(node);
        self
    }

    pub fn push(&mut self, node: impl Into<PatternNode>) {
        self.0.push(node.into());
    }

    pub fn nodes(&self) -> &[PatternNode] {
        &self.0
    }
}

impl<N: Into<PatternNode>> FromIterator<N> for Group {
    fn from_iter<T: IntoIterator<Item = N>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<N: Into<PatternNode>> Extend<N> for Group {
    fn extend<T: IntoIterator<Item = N>>(&mut self, iter: T) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

/// Two or more alternative groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Union(Vec<Group>);

impl Union {
    pub fn new(branches: Vec<Group>) -> Result<Self, ShapeError> {
        if branches.len() < 2 {
            return Err(ShapeError::UnionBranches(branches.len()));
        }
        Ok(Self(branches))
    }

    pub fn branches(&self) -> &[Group] {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternNode {
    Triples(TripleGroup),
    /// FILTER, BIND and other clauses passed through verbatim.
    Raw(String),
    Group(Group),
    Union(Union),
    Values(ValuesBlock),
}

impl PatternNode {
    pub fn raw(clause: impl Into<String>) -> Self {
        PatternNode::Raw(clause.into())
    }
}

impl From<TripleGroup> for PatternNode {
    fn from(triples: TripleGroup) -> Self {
        PatternNode::Triples(triples)
    }
}

impl From<Group> for PatternNode {
    fn from(group: Group) -> Self {
        PatternNode::Group(group)
    }
}

impl From<Union> for PatternNode {
    fn from(union: Union) -> Self {
        PatternNode::Union(union)
    }
}

impl From<ValuesBlock> for PatternNode {
    fn from(values: ValuesBlock) -> Self {
        PatternNode::Values(values)
    }
}

/// Inline data. Every row has exactly one term per header variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValuesBlock {
    vars: Vec<Variable>,
    rows: Vec<Vec<Term>>,
}

impl ValuesBlock {
    pub fn new(vars: Vec<Variable>, rows: Vec<Vec<Term>>) -> Result<Self, ShapeError> {
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != vars.len())
        {
            return Err(ShapeError::ValuesRowLength {
                row,
                expected: vars.len(),
                found,
            });
        }
        Ok(Self { vars, rows })
    }

    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    pub fn rows(&self) -> &[Vec<Term>] {
        &self.rows
    }
}

/// A complete SELECT query, ready to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub prefixes: PrefixTable,
    pub select: SelectClause,
    pub where_clause: Group,
    /// GROUP BY / HAVING / ORDER BY lines, emitted in order.
    pub modifiers: Vec<String>,
}
