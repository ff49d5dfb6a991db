//! SPARQL 1.1 JSON results and their column-wise extraction.

use std::collections::HashMap;

use itertools::Itertools;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SparqlResults {
    pub head: Head,
    pub results: Results,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Head {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Results {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, RdfTerm>>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RdfTerm {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub value: String,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", default)]
    pub lang: Option<String>,
}

impl SparqlResults {
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }
}

/// Each result variable's values across all rows, in row order.
///
/// A row that leaves a variable unbound contributes `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindingTable {
    vars: Vec<String>,
    columns: HashMap<String, Vec<Option<String>>>,
    len: usize,
}

pub fn extract_bindings(results: &SparqlResults) -> BindingTable {
    let vars = results.head.vars.iter().unique().cloned().collect::<Vec<_>>();
    let rows = &results.results.bindings;

    let columns = vars
        .iter()
        .map(|var| {
            let values = rows
                .iter()
                .map(|row| row.get(var).map(|term| term.value.clone()))
                .collect();
            (var.clone(), values)
        })
        .collect();

    BindingTable {
        vars,
        columns,
        len: rows.len(),
    }
}

impl BindingTable {
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    /// The columns worth showing; `awardLabel` only feeds other labels.
    pub fn display_vars(&self) -> impl Iterator<Item = &str> {
        self.vars
            .iter()
            .map(String::as_str)
            .filter(|var| *var != "awardLabel")
    }

    pub fn get(&self, var: &str) -> Option<&[Option<String>]> {
        self.columns.get(var).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.len).then(|| Row { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.len).map(move |index| Row { table: self, index })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    table: &'a BindingTable,
    index: usize,
}

impl<'a> Row<'a> {
    /// `None` both for unbound values and for variables the query never had.
    pub fn get(&self, var: &str) -> Option<&'a str> {
        self.table
            .columns
            .get(var)
            .and_then(|column| column[self.index].as_deref())
    }
}
