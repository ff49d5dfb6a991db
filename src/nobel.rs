//! Query building for the Nobel Prize linked data endpoint.
//!
//! The laureate form offers a handful of filters. [`build_query`] turns a
//! [`Filters`] value into a SELECT query over the pattern vocabulary of
//! [`crate::ast`], reusing the country fragments defined here.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use itertools::Itertools;

use crate::ast::{
    Group, Literal, PatternNode, PrefixTable, PropertyList, Query, SelectItem, TripleGroup, Union,
    ValuesBlock,
};
use crate::client::SparqlService;
use crate::error::{ClientError, ShapeError};
use crate::results::Row;

pub const ENDPOINT: &str = "http://data.nobelprize.org/sparql";

pub const PREFIXES: &[(&str, &str)] = &[
    ("nobel", "http://data.nobelprize.org/terms/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("dbpedia", "http://dbpedia.org/resource/"),
    ("dbpprop", "http://dbpedia.org/property/"),
    ("dbpedia-owl", "http://dbpedia.org/ontology/"),
];

/// Affiliation country labels that no longer name a country, and the
/// DBpedia resource each one maps to.
pub const LEGACY_COUNTRY_NAMES: &[(&str, &str)] = &[
    ("Federal Republic of Germany", "Germany"),
    ("Alsace (then Germany, now France)", "Germany"),
];

pub fn prefixes() -> PrefixTable {
    PREFIXES.iter().copied().collect()
}

/// The laureate's birth country, following successor states.
pub fn country_of_birth() -> TripleGroup {
    let mut country = PropertyList::new();
    country.push("a", "dbpedia-owl:Country");
    country.push("owl:sameAs|dbpedia-owl:successor", "?country");

    TripleGroup::new("?laureate").with("dbpedia-owl:birthPlace", country.to_blank_node())
}

/// The country of the laureate's affiliation, bound to `?country`.
pub fn country_of_affiliation() -> Result<Vec<PatternNode>, ShapeError> {
    let affiliation = TripleGroup::new("?laureate")
        .with("dbpedia-owl:affiliation/dbpedia-owl:country", "?affCountry");

    Ok(vec![
        affiliation.into(),
        rename_countries("affCountry", LEGACY_COUNTRY_NAMES)?.into(),
    ])
}

/// Binds `?country` from `?<country_var>`, either through `owl:sameAs` or,
/// for the listed legacy labels, straight from the replacement table.
pub fn rename_countries(country_var: &str, names: &[(&str, &str)]) -> Result<Union, ShapeError> {
    let name_var = format!("{}Name", country_var);
    let country = TripleGroup::new(format!("?{}", country_var))
        .with("rdfs:label", format!("?{}", name_var));

    let excluded = names
        .iter()
        .map(|(legacy, _)| Literal::string(*legacy).to_string())
        .join(", ");
    let filter = format!("FILTER (?{} NOT IN ({}))", name_var, excluded);

    let values = ValuesBlock::new(
        vec![name_var.clone(), "country".to_owned()],
        names
            .iter()
            .map(|(legacy, modern)| {
                vec![
                    Literal::string(*legacy).to_string(),
                    format!("dbpedia:{}", modern),
                ]
            })
            .collect(),
    )?;

    Union::new(vec![
        Group::new()
            .with(country.clone().with("owl:sameAs", "?country"))
            .with(PatternNode::raw(filter)),
        Group::new().with(country).with(values),
    ])
}

/// Prize category names.
pub fn categories_query(prefixes: &PrefixTable) -> Result<Query, ShapeError> {
    Query::new(
        prefixes.clone(),
        vec![SelectItem::var("categoryName")],
        Group::new().with(
            TripleGroup::new("?category")
                .with("a", "nobel:Category")
                .with("rdfs:value", "?categoryName"),
        ),
        vec![],
    )
}

/// Fetches the prize category names, skipping unbound rows.
pub async fn categories(service: &SparqlService) -> Result<Vec<String>, ClientError> {
    let query = categories_query(service.prefixes())?;
    let table = service.query(&query).await?;
    Ok(table
        .get("categoryName")
        .unwrap_or_default()
        .iter()
        .flatten()
        .cloned()
        .collect())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

impl FromStr for YesNo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(YesNo::Yes),
            "no" => Ok(YesNo::No),
            _ => Err(anyhow!("Expected yes or no, got {:?}", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Avg,
    Min,
    Max,
    Sum,
}

impl Aggregate {
    fn apply(self, var: &str) -> SelectItem {
        SelectItem::expr(
            format!("{}(?{})", self, var),
            format!("{}_{}", self.to_string().to_lowercase(), var),
        )
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aggregate::Count => "COUNT",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Sum => "SUM",
        })
    }
}

impl FromStr for Aggregate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COUNT" => Ok(Aggregate::Count),
            "AVG" => Ok(Aggregate::Avg),
            "MIN" => Ok(Aggregate::Min),
            "MAX" => Ok(Aggregate::Max),
            "SUM" => Ok(Aggregate::Sum),
            _ => Err(anyhow!("Unknown aggregate {:?}", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupBy {
    Laureate,
    Gender,
    Category,
    Country,
}

impl GroupBy {
    pub fn var_name(self) -> &'static str {
        match self {
            GroupBy::Laureate => "laureate",
            GroupBy::Gender => "gender",
            GroupBy::Category => "category",
            GroupBy::Country => "country",
        }
    }
}

impl FromStr for GroupBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "laureate" => Ok(GroupBy::Laureate),
            "gender" => Ok(GroupBy::Gender),
            "category" => Ok(GroupBy::Category),
            "country" => Ok(GroupBy::Country),
            _ => Err(anyhow!("Cannot group by {:?}", s)),
        }
    }
}

/// The laureate form's selections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filters {
    pub gender: Option<String>,
    /// Sorted, without duplicates.
    pub category: Vec<String>,
    pub shared: Option<YesNo>,
    pub still_alive: Option<YesNo>,
    pub country_of_birth: bool,
    pub country_of_affiliation: bool,
    pub aggregate: Option<Aggregate>,
    pub share_quota: bool,
    pub age: bool,
    pub group_by: Option<GroupBy>,
    pub multiple_awards: bool,
}

impl Filters {
    /// Fills in the selections the form implies: averaging when a numeric
    /// column is requested, grouping by laureate for repeat winners.
    pub fn normalized(mut self) -> Self {
        if (self.share_quota || self.age) && self.aggregate.is_none() {
            self.aggregate = Some(Aggregate::Avg);
        }
        if self.multiple_awards && self.group_by.is_none() {
            self.group_by = Some(GroupBy::Laureate);
        }
        self
    }

    fn is_grouped(&self) -> bool {
        self.aggregate.is_some() || self.group_by.is_some()
    }
}

fn count_distinct(var: &str) -> SelectItem {
    SelectItem::expr(format!("COUNT(DISTINCT ?{})", var), format!("{}s", var))
}

pub fn select_items(filters: &Filters) -> Vec<SelectItem> {
    if !filters.is_grouped() {
        let mut items = vec![
            SelectItem::var("laureate"),
            SelectItem::var("award"),
            SelectItem::var("awardLabel"),
        ];
        if filters.country_of_birth || filters.country_of_affiliation {
            items.push(SelectItem::var("country"));
        }
        return items;
    }

    // (source variable, projected column)
    let mut columns = match filters.aggregate {
        Some(aggregate) if aggregate != Aggregate::Count => {
            let mut columns = vec![];
            if filters.share_quota {
                columns.push(("shareQuota", aggregate.apply("shareQuota")));
            }
            if filters.age {
                columns.push(("age", aggregate.apply("age")));
            }
            if filters.multiple_awards {
                columns.push(("award", count_distinct("award")));
            }
            columns
        }
        _ => vec![
            ("laureate", count_distinct("laureate")),
            ("award", count_distinct("award")),
        ],
    };

    if let Some(group_by) = filters.group_by {
        columns.retain(|(var, _)| *var != group_by.var_name());
        if group_by == GroupBy::Laureate {
            columns.insert(0, ("name", SelectItem::expr("MIN(?name)", "name1")));
        }
    }

    filters
        .group_by
        .map(|group_by| SelectItem::var(group_by.var_name()))
        .into_iter()
        .chain(columns.into_iter().map(|(_, item)| item))
        .collect()
}

pub fn where_pattern(filters: &Filters) -> Result<Group, ShapeError> {
    const GENDER: &str = "foaf:gender";
    const CATEGORY: &str = "nobel:category/rdfs:value";
    const SHARE: &str = "nobel:share";
    const DIED: (&str, &str) = ("dbpprop:dateOfDeath", "?died");

    let mut laureate = TripleGroup::new("?laureate")
        .with("a", "nobel:Laureate")
        .with("nobel:laureateAward", "?award")
        .with_predicate(GENDER);
    let mut award = TripleGroup::new("?award")
        .with_predicate(CATEGORY)
        .with_predicate(SHARE);
    let mut clauses: Vec<PatternNode> = vec![];

    if !filters.is_grouped() {
        award.push("rdfs:label", "?awardLabel");
    }

    if let Some(gender) = &filters.gender {
        laureate.push(GENDER, Literal::string(gender.as_str()));
    }
    if filters.group_by == Some(GroupBy::Gender) {
        laureate.push(GENDER, "?gender");
    }

    match filters.category.as_slice() {
        [] => {}
        [category] => award.push(CATEGORY, Literal::string(category.as_str())),
        categories => {
            award.push(CATEGORY, "?category");
            clauses.push(PatternNode::raw(format!(
                "FILTER (?category IN ({}))",
                categories
                    .iter()
                    .map(|category| Literal::string(category.as_str()).to_string())
                    .join(", ")
            )));
        }
    }
    if filters.category.len() <= 1 && filters.group_by == Some(GroupBy::Category) {
        award.push(CATEGORY, "?category");
    }

    match filters.shared {
        Some(YesNo::Yes) => {
            award.push(SHARE, "?share");
            clauses.push(PatternNode::raw(format!(
                "FILTER (?share != {})",
                Literal::string("1")
            )));
        }
        Some(YesNo::No) => award.push(SHARE, Literal::string("1")),
        None => {}
    }

    match filters.still_alive {
        Some(YesNo::Yes) => clauses.push(PatternNode::raw(format!(
            "FILTER NOT EXISTS {{ ?laureate {} {} }}",
            DIED.0, DIED.1
        ))),
        Some(YesNo::No) => laureate.push(DIED.0, DIED.1),
        None => {}
    }

    if filters.country_of_birth {
        clauses.push(country_of_birth().into());
    }
    if filters.country_of_affiliation {
        clauses.extend(country_of_affiliation()?);
    }

    if filters.share_quota {
        award.push(SHARE, "?share");
        clauses.push(PatternNode::raw(
            "BIND (1/STRDT(?share, xsd:integer) AS ?shareQuota)",
        ));
    }
    if filters.age {
        laureate.push("foaf:birthday", "?birthday");
        award.push("nobel:year", "?year");
        clauses.push(PatternNode::raw("BIND (?year - year(?birthday) AS ?age)"));
    }

    if filters.group_by == Some(GroupBy::Laureate) {
        laureate.push("foaf:name", "?name");
    }

    let mut group = Group::new().with(laureate).with(award);
    group.extend(clauses);
    Ok(group)
}

pub fn solution_modifiers(filters: &Filters, select: &[SelectItem]) -> Vec<String> {
    let mut modifiers = vec![];

    if let Some(group_by) = filters.group_by {
        modifiers.push(format!("GROUP BY ?{}", group_by.var_name()));
        if filters.multiple_awards {
            modifiers.push(format!("HAVING (?awards > {})", Literal::integer(1)));
        }
    }

    if select.iter().any(|item| *item == SelectItem::var("awardLabel")) {
        modifiers.push("ORDER BY ?awardLabel".to_owned());
    } else if let Some(SelectItem::Expr { alias, .. }) = select.last() {
        if alias == "awards" {
            modifiers.push("ORDER BY DESC(?awards)".to_owned());
        }
    }

    modifiers
}

pub fn build_query(prefixes: &PrefixTable, filters: &Filters) -> Result<Query, ShapeError> {
    let select = select_items(filters);
    let modifiers = solution_modifiers(filters, &select);
    Query::new(prefixes.clone(), select, where_pattern(filters)?, modifiers)
}

/// Short display text for a result cell.
///
/// Award rows carry an `awardLabel` of the form `"<award>, <laureate>"`,
/// which names both resources better than their IRIs do.
pub fn resource_label(row: &Row<'_>, var: &str, prefixes: &PrefixTable) -> Option<String> {
    if let Some(label) = row.get("awardLabel") {
        let mut parts = label.splitn(2, ", ");
        let part = match var {
            "award" => parts.next(),
            "laureate" => parts.nth(1),
            _ => None,
        };
        if let Some(part) = part {
            return Some(part.to_owned());
        }
    }

    let value = row.get(var)?;
    let shortened = prefixes
        .iter()
        .find_map(|(_, iri)| value.strip_prefix(iri))
        .unwrap_or(value);
    Some(shortened.to_owned())
}
