use itertools::Itertools;

use crate::ast::{
    Group, PatternNode, PrefixTable, PropertyList, Query, SelectClause, SelectItem, Term,
    TripleGroup, Union, ValuesBlock, Variable,
};
use crate::error::ShapeError;

const INDENT: &str = "  ";

pub fn render_prefixes(prefixes: &PrefixTable) -> String {
    prefixes.to_sparql()
}

/// Renders `SELECT ...` with the trailing space the caller follows with `WHERE`.
pub fn render_select(items: &[SelectItem]) -> Result<String, ShapeError> {
    Ok(SelectClause::new(items.to_vec())?.to_sparql())
}

pub fn render_pattern(node: &PatternNode) -> String {
    node.to_sparql()
}

pub fn render_values(vars: Vec<Variable>, rows: Vec<Vec<Term>>) -> Result<PatternNode, ShapeError> {
    Ok(ValuesBlock::new(vars, rows)?.into())
}

pub fn build_query(
    prefixes: &PrefixTable,
    select: Vec<SelectItem>,
    where_clause: Group,
    modifiers: Vec<String>,
) -> Result<String, ShapeError> {
    let query = Query::new(prefixes.clone(), select, where_clause, modifiers)?;
    Ok(query.to_sparql())
}

impl PrefixTable {
    pub fn to_sparql(&self) -> String {
        self.iter()
            .map(|(name, iri)| format!("PREFIX {}: <{}>", name, iri))
            .join("\n")
    }
}

impl SelectItem {
    pub fn to_sparql(&self) -> String {
        match self {
            SelectItem::Var(name) => format!("?{}", name),
            SelectItem::Expr { expr, alias } => format!("({} AS ?{})", expr, alias),
        }
    }
}

impl SelectClause {
    pub fn to_sparql(&self) -> String {
        format!(
            "SELECT {} ",
            self.items().iter().map(SelectItem::to_sparql).join(" ")
        )
    }
}

impl PropertyList {
    /// `p1 o1 , o2 ; p2 o3`, skipping predicates without objects.
    pub fn to_sparql(&self) -> String {
        self.iter()
            .filter(|(_, objects)| !objects.is_empty())
            .map(|(predicate, objects)| format!("{} {}", predicate, objects.iter().join(" , ")))
            .join(" ; ")
    }

    /// The list as an anonymous node: `[ p1 o1 ; p2 o2 ]`.
    pub fn to_blank_node(&self) -> Term {
        format!("[ {} ]", self.to_sparql())
    }
}

impl TripleGroup {
    /// `None` when no predicate has an object, since nothing would be asserted.
    pub fn to_sparql(&self) -> Option<String> {
        let properties = self.properties.to_sparql();
        if properties.is_empty() {
            return None;
        }
        Some(format!("{} {} .", self.subject, properties))
    }
}

impl ValuesBlock {
    pub fn lines(&self) -> Vec<String> {
        let header = format!(
            "VALUES ({})",
            self.vars().iter().map(|var| format!("?{}", var)).join(" ")
        );
        if self.rows().is_empty() {
            return vec![format!("{} {{ }}", header)];
        }

        let mut lines = Vec::with_capacity(self.rows().len() + 2);
        lines.push(format!("{} {{", header));
        lines.extend(
            self.rows()
                .iter()
                .map(|row| format!("{}({})", INDENT, row.iter().join(" "))),
        );
        lines.push("}".to_owned());
        lines
    }

    pub fn to_sparql(&self) -> String {
        self.lines().join("\n")
    }
}

impl PatternNode {
    /// One entry per output line, except that a raw clause is always a
    /// single entry: its text, line breaks included, is kept untouched and
    /// only its start is indented by the enclosing group.
    pub fn lines(&self) -> Vec<String> {
        match self {
            PatternNode::Triples(triples) => triples.to_sparql().into_iter().collect(),
            PatternNode::Raw(clause) => vec![clause.clone()],
            PatternNode::Group(group) => group.lines(),
            PatternNode::Union(union) => union.lines(),
            PatternNode::Values(values) => values.lines(),
        }
    }

    pub fn to_sparql(&self) -> String {
        self.lines().join("\n")
    }
}

impl Group {
    pub fn lines(&self) -> Vec<String> {
        let body = self
            .nodes()
            .iter()
            .flat_map(PatternNode::lines)
            .map(|line| {
                if line.is_empty() {
                    line
                } else {
                    format!("{}{}", INDENT, line)
                }
            })
            .collect::<Vec<_>>();

        if body.is_empty() {
            return vec!["{ }".to_owned()];
        }

        let mut lines = Vec::with_capacity(body.len() + 2);
        lines.push("{".to_owned());
        lines.extend(body);
        lines.push("}".to_owned());
        lines
    }

    pub fn to_sparql(&self) -> String {
        self.lines().join("\n")
    }
}

impl Union {
    pub fn lines(&self) -> Vec<String> {
        Itertools::intersperse(
            self.branches().iter().map(Group::lines),
            vec!["UNION".to_owned()],
        )
        .flatten()
        .collect()
    }
}

impl Query {
    pub fn new(
        prefixes: PrefixTable,
        select: Vec<SelectItem>,
        where_clause: Group,
        modifiers: Vec<String>,
    ) -> Result<Self, ShapeError> {
        Ok(Self {
            prefixes,
            select: SelectClause::new(select)?,
            where_clause,
            modifiers,
        })
    }

    pub fn to_sparql(&self) -> String {
        let mut sections = Vec::new();
        if !self.prefixes.is_empty() {
            sections.push(self.prefixes.to_sparql());
        }
        sections.push(format!("{}WHERE", self.select.to_sparql()));
        sections.push(self.where_clause.to_sparql());
        sections.extend(self.modifiers.iter().cloned());
        sections.join("\n")
    }
}
