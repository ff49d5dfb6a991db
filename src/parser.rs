use std::borrow::BorrowMut;

use anyhow::{anyhow, bail, Context, Result};
use pest::Parser as _;
use pest_derive::Parser;

use crate::nobel::Filters;

#[derive(Parser)]
#[grammar = "filters.pest"]
struct Parser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;
type Pairs<'a> = pest::iterators::Pairs<'a, Rule>;

/// One line of REPL input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `categories`: list the prize category names.
    Categories,
    /// Any other line is a filter line, already normalized.
    Laureates(Filters),
}

pub fn parse_command(line: &str) -> Result<Command> {
    match line.trim() {
        "categories" => Ok(Command::Categories),
        _ => Ok(Command::Laureates(parse_filters(line)?.normalized())),
    }
}

/// Parses a filter line such as `gender=female&category=Physics,Chemistry age`.
pub fn parse_filters(code: &str) -> Result<Filters> {
    let filters = Parser::parse(Rule::filters, code)
        .context("Failed to parse filters")?
        .next()
        .ok_or_else(|| anyhow!("Empty parse result"))?;

    let mut result = Filters::default();
    for pair in filters
        .into_inner()
        .take_while(|pair| pair.as_rule() != Rule::EOI)
    {
        let (key, values) = convert_filter(pair);
        apply(&mut result, &key, values).with_context(|| format!("Invalid filter {:?}", key))?;
    }

    result.category.sort();
    result.category.dedup();
    Ok(result)
}

fn expect_next_rule<'a, P: BorrowMut<Pairs<'a>>>(mut pairs: P, rule: Rule) -> Pair<'a> {
    let pair = pairs.borrow_mut().next().expect("missing pair");
    assert_eq!(pair.as_rule(), rule);
    pair
}

fn convert_value(pair: Pair) -> String {
    match pair.as_rule() {
        Rule::quoted => expect_next_rule(pair.into_inner(), Rule::quoted_interior)
            .as_str()
            .to_string(),
        Rule::bare => pair.as_str().to_string(),
        _ => unreachable!(),
    }
}

fn convert_filter(pair: Pair) -> (String, Vec<String>) {
    assert_eq!(pair.as_rule(), Rule::filter);
    let mut pairs = pair.into_inner();
    let key = expect_next_rule(&mut pairs, Rule::key).as_str().to_string();
    let values = pairs
        .next()
        .map(|values| values.into_inner().map(convert_value).collect())
        .unwrap_or_default();
    (key, values)
}

fn single(values: Vec<String>) -> Result<String> {
    match <[String; 1]>::try_from(values) {
        Ok([value]) => Ok(value),
        Err(values) if values.is_empty() => bail!("Missing value"),
        Err(values) => bail!("Expected one value, got {:?}", values),
    }
}

fn flag(values: Vec<String>) -> Result<bool> {
    if values.is_empty() {
        return Ok(true);
    }
    match single(values)?.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => bail!("Expected true or false, got {:?}", other),
    }
}

fn apply(filters: &mut Filters, key: &str, values: Vec<String>) -> Result<()> {
    let normalized = key.replace(['_', '-'], "").to_ascii_lowercase();
    match normalized.as_str() {
        "gender" => filters.gender = Some(single(values)?),
        "category" => {
            if values.is_empty() {
                bail!("Missing value");
            }
            filters.category.extend(values)
        }
        "shared" => filters.shared = Some(single(values)?.parse()?),
        "stillalive" => filters.still_alive = Some(single(values)?.parse()?),
        "countryofbirth" => filters.country_of_birth = flag(values)?,
        "countryofaffiliation" => filters.country_of_affiliation = flag(values)?,
        "aggregate" => filters.aggregate = Some(single(values)?.parse()?),
        "sharequota" => filters.share_quota = flag(values)?,
        "age" => filters.age = flag(values)?,
        "groupby" => filters.group_by = Some(single(values)?.parse()?),
        "multipleawards" => filters.multiple_awards = flag(values)?,
        _ => bail!("Unknown filter"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::nobel::{Aggregate, GroupBy, YesNo};

    #[test]
    fn test_commands() {
        assert_eq!(parse_command("categories").unwrap(), Command::Categories);
        assert_eq!(parse_command("  categories ").unwrap(), Command::Categories);
        assert_eq!(
            parse_command("gender=female").unwrap(),
            Command::Laureates(
                Filters {
                    gender: Some("female".to_owned()),
                    ..Filters::default()
                }
                .normalized()
            )
        );
        assert!(parse_command("categories=Physics").is_err());
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse_filters("").unwrap(), Filters::default());
        assert_eq!(parse_filters("   ").unwrap(), Filters::default());
    }

    #[test]
    fn test_url_style() {
        let filters =
            parse_filters("gender=female&category=Physics,Chemistry&shared=yes&stillAlive=no")
                .unwrap();

        assert_eq!(
            filters,
            Filters {
                gender: Some("female".to_owned()),
                category: vec!["Chemistry".to_owned(), "Physics".to_owned()],
                shared: Some(YesNo::Yes),
                still_alive: Some(YesNo::No),
                ..Filters::default()
            }
        );
    }

    #[test]
    fn test_bare_keys_and_whitespace() {
        let filters = parse_filters("age groupBy=country countryOfBirth aggregate=max").unwrap();

        assert!(filters.age);
        assert!(filters.country_of_birth);
        assert_eq!(filters.group_by, Some(GroupBy::Country));
        assert_eq!(filters.aggregate, Some(Aggregate::Max));
    }

    #[test]
    fn test_quoted_values_and_repeated_categories() {
        let filters = parse_filters(
            r#"category="Physiology or Medicine",Physics category=Physics,"Economic Sciences""#,
        )
        .unwrap();

        assert_eq!(
            filters.category,
            ["Economic Sciences", "Physics", "Physiology or Medicine"]
        );
    }

    #[test]
    fn test_key_spelling_is_lenient() {
        let filters = parse_filters("multiple_awards=true share-quota still_alive=YES").unwrap();

        assert!(filters.multiple_awards);
        assert!(filters.share_quota);
        assert_eq!(filters.still_alive, Some(YesNo::Yes));
    }

    #[test]
    fn test_explicit_false() {
        assert!(!parse_filters("age=false").unwrap().age);
    }

    #[test]
    fn test_errors() {
        let err = parse_filters("category").unwrap_err();
        assert!(format!("{:#}", err).contains("Missing value"));

        assert!(parse_filters("colour=red").is_err());
        assert!(parse_filters("groupBy=year").is_err());
        assert!(parse_filters("aggregate=MEDIAN").is_err());
        assert!(parse_filters("gender=female,male").is_err());
        assert!(parse_filters("gender").is_err());
        assert!(parse_filters("category").is_err());
        assert!(parse_filters("gender=female&category").is_err());
        assert!(parse_filters("shared=maybe").is_err());
        assert!(parse_filters("gender=").is_err());
        assert!(parse_filters("=female").is_err());
    }
}
