//! Sends generated queries to a SPARQL endpoint.
//!
//! The request is a plain `GET <endpoint>?output=json&query=<text>`. Failures
//! are handed back as they are; there is no retry or caching here.

use anyhow::Context;
use reqwest::Url;
use tracing::{debug, instrument, trace, warn};

use crate::ast::{Group, PrefixTable, Query, SelectItem};
use crate::config::Config;
use crate::error::ClientError;
use crate::results::{extract_bindings, BindingTable, SparqlResults};

#[derive(Clone, Debug)]
pub struct SparqlService {
    endpoint: Url,
    prefixes: PrefixTable,
    http: reqwest::Client,
}

impl SparqlService {
    pub fn new(endpoint: Url, prefixes: PrefixTable) -> Self {
        Self {
            endpoint,
            prefixes,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid endpoint URL {:?}", config.endpoint))?;
        Ok(Self::new(endpoint, config.prefixes.clone()))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn prefixes(&self) -> &PrefixTable {
        &self.prefixes
    }

    /// A query over this service's prefixes.
    pub fn select(
        &self,
        select: Vec<SelectItem>,
        where_clause: Group,
        modifiers: Vec<String>,
    ) -> Result<Query, ClientError> {
        Ok(Query::new(
            self.prefixes.clone(),
            select,
            where_clause,
            modifiers,
        )?)
    }

    #[instrument(name = "sparql.dispatch", skip(self, query), fields(endpoint = %self.endpoint), err)]
    pub async fn dispatch(&self, query: &str) -> Result<SparqlResults, ClientError> {
        debug!("dispatching query:\n{}", query);

        let request_error = |source| ClientError::Request {
            endpoint: self.endpoint.to_string(),
            source,
        };

        let res = self
            .http
            .get(self.endpoint.clone())
            .query(&[("output", "json"), ("query", query)])
            .send()
            .await
            .map_err(request_error)?;

        let status = res.status();
        let body = res.text().await.map_err(request_error)?;
        trace!("response body ({}): {}", status, body);

        if !status.is_success() {
            warn!("endpoint answered {}", status);
            return Err(ClientError::Status { status, body });
        }

        SparqlResults::from_json(&body).map_err(|source| ClientError::Malformed { body, source })
    }

    pub async fn query(&self, query: &Query) -> Result<BindingTable, ClientError> {
        let results = self.dispatch(&query.to_sparql()).await?;
        let table = extract_bindings(&results);
        debug!(rows = table.len(), vars = ?table.vars(), "extracted bindings");
        Ok(table)
    }

    pub async fn query_select(
        &self,
        select: Vec<SelectItem>,
        where_clause: Group,
        modifiers: Vec<String>,
    ) -> Result<BindingTable, ClientError> {
        let query = self.select(select, where_clause, modifiers)?;
        self.query(&query).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::TripleGroup;
    use crate::error::ShapeError;
    use crate::testing::{query_pairs, serve_once, unreachable_endpoint, RESULTS_JSON};

    const QUERY: &str = "SELECT ?s WHERE\n{\n  ?s ?p ?o .\n}";

    #[test]
    fn test_from_config() {
        let service = SparqlService::from_config(&Config::default()).unwrap();

        assert_eq!(service.endpoint().as_str(), "http://data.nobelprize.org/sparql");
        assert_eq!(service.prefixes().get("nobel"), Some("http://data.nobelprize.org/terms/"));
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = Config {
            endpoint: "not a url".to_owned(),
            ..Config::default()
        };

        assert!(SparqlService::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_shape_error_is_raised_before_dispatch() {
        let service = SparqlService::from_config(&Config::default()).unwrap();
        let where_clause = Group::new().with(TripleGroup::new("?s").with("?p", "?o"));

        let err = service
            .query_select(vec![], where_clause, vec![])
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Shape(ShapeError::EmptySelect)));
    }

    #[tokio::test]
    async fn test_dispatch_sends_output_and_query() {
        let body = r#"{
            "head": { "vars": ["s"] },
            "results": { "bindings": [
                { "s": { "type": "uri", "value": "http://example.org/a" } }
            ] }
        }"#;
        let (endpoint, request) = serve_once("200 OK", RESULTS_JSON, body).await;
        let service = SparqlService::new(endpoint, PrefixTable::new());

        let results = service.dispatch(QUERY).await.unwrap();

        let target = request.await.unwrap();
        assert!(target.starts_with("/sparql?"));
        assert_eq!(
            query_pairs(&target),
            vec![
                ("output".to_owned(), "json".to_owned()),
                ("query".to_owned(), QUERY.to_owned()),
            ]
        );
        assert_eq!(results.head.vars, vec!["s"]);
        assert_eq!(results.results.bindings[0]["s"].value, "http://example.org/a");
    }

    #[tokio::test]
    async fn test_dispatch_keeps_error_body() {
        let body = "Parse error: line 1\n  unexpected token";
        let (endpoint, _request) = serve_once("400 Bad Request", "text/plain", body).await;
        let service = SparqlService::new(endpoint, PrefixTable::new());

        match service.dispatch(QUERY).await.unwrap_err() {
            ClientError::Status { status, body: received } => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
                assert_eq!(received, body);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_rejects_non_json_success() {
        let body = "<html><body>maintenance</body></html>";
        let (endpoint, _request) = serve_once("200 OK", "text/html", body).await;
        let service = SparqlService::new(endpoint, PrefixTable::new());

        let err = service.dispatch(QUERY).await.unwrap_err();

        assert!(matches!(&err, ClientError::Malformed { body: received, .. } if received == body));
        assert_eq!(err.display_message(), body);
    }

    #[tokio::test]
    async fn test_dispatch_unreachable_endpoint() {
        let endpoint = unreachable_endpoint().await;
        let service = SparqlService::new(endpoint.clone(), PrefixTable::new());

        match service.dispatch(QUERY).await.unwrap_err() {
            ClientError::Request { endpoint: reported, .. } => {
                assert_eq!(reported, endpoint.to_string());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
