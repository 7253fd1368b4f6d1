// crates/core/src/hal.rs
//! Client for the HAL open-archive search API.
//!
//! A researcher search is a two-step lookup: collect document ids for the
//! full name and for its initials variant, then fetch each document's title,
//! authors, domains and affiliated structures. The results are aggregated
//! into per-domain counts and the most frequent laboratory.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::HalError;

pub const DEFAULT_HAL_URL: &str = "https://api.archives-ouvertes.fr/search/";

const UNTITLED: &str = "Sans titre";
const NO_LAB: &str = "N/A";

/// Build the "initials" spelling of a researcher name.
///
/// The first whitespace-separated token is the first name, the rest is the
/// last name. Every uppercase letter of the first name becomes `X.`:
/// `"Jean-Pierre Dupont"` gives `"J.P. Dupont"`.
///
/// Every remaining token stays in the last name, so `"Jean Pierre Dupont"`
/// gives `"J. Pierre Dupont"`. A first name with no uppercase letter still
/// gets one initial from its first letter, so the variant is never blank.
pub fn initials_variant(full_name: &str) -> Result<String, HalError> {
    let mut tokens = full_name.split_whitespace();
    let first = tokens
        .next()
        .ok_or_else(|| HalError::InvalidName(full_name.to_string()))?;
    let last: Vec<&str> = tokens.collect();
    if last.is_empty() {
        return Err(HalError::InvalidName(full_name.to_string()));
    }

    let mut initials: String = first
        .chars()
        .filter(|c| c.is_uppercase())
        .map(|c| format!("{c}."))
        .collect();
    if initials.is_empty() {
        // lowercase first name: fall back to its first letter
        if let Some(c) = first.chars().next() {
            initials = format!("{}.", c.to_uppercase());
        }
    }

    Ok(format!("{} {}", initials, last.join(" ")))
}

#[derive(Debug, Clone)]
pub struct HalConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Maximum docids returned per name query.
    pub rows: u32,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HAL_URL.into(),
            timeout: Duration::from_secs(30),
            rows: 100,
        }
    }
}

/// One publication in a search outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub title: String,
    pub authors: String,
    pub domain: String,
    pub labo: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub num_publications: usize,
    pub domains: BTreeMap<String, usize>,
    pub main_labo: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub stats: SearchStats,
    pub details: Vec<Publication>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    response: SearchBody,
}

#[derive(Debug, Default, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentFields {
    #[serde(rename = "title_s", default)]
    titles: Vec<String>,
    #[serde(rename = "authFullName_s", default)]
    authors: Vec<String>,
    #[serde(rename = "domain_s", default)]
    domains: Vec<String>,
    #[serde(rename = "structName_s", default)]
    structures: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HalClient {
    http: reqwest::Client,
    config: HalConfig,
}

impl HalClient {
    pub fn new(config: HalConfig) -> Result<Self, HalError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    async fn query<T: DeserializeOwned>(&self, q: &str, fields: &str) -> Result<T, HalError> {
        let rows = self.config.rows.to_string();
        let resp = self
            .http
            .get(&self.config.base_url)
            .query(&[("q", q), ("wt", "json"), ("fl", fields), ("rows", rows.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HalError::Status {
                status: status.as_u16(),
                query: q.to_string(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| HalError::Malformed(e.to_string()))
    }

    /// Document ids of every publication whose author list contains `name` exactly.
    pub async fn search_docids(&self, name: &str) -> Result<Vec<String>, HalError> {
        let q = format!("authFullName_s:\"{name}\"");
        let body: SearchResponse = self.query(&q, "docid").await?;

        let docids = body
            .response
            .docs
            .iter()
            .filter_map(|doc| match doc.get("docid")? {
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();

        tracing::debug!(name, found = docids.len(), "HAL docid query");
        Ok(docids)
    }

    /// Title, authors, domains and structures of one document.
    pub async fn fetch_document(&self, docid: &str) -> Result<Vec<DocumentDetails>, HalError> {
        let q = format!("docid:\"{docid}\"");
        let body: SearchResponse = self
            .query(&q, "title_s,authFullName_s,domain_s,structName_s")
            .await?;

        body.response
            .docs
            .into_iter()
            .map(|doc| {
                serde_json::from_value::<DocumentFields>(doc)
                    .map(DocumentDetails::from_fields)
                    .map_err(|e| HalError::Malformed(format!("docid {docid}: {e}")))
            })
            .collect()
    }

    /// Full researcher search: both name spellings, then per-document details.
    pub async fn search_researcher(&self, full_name: &str) -> Result<SearchOutcome, HalError> {
        let full_name = full_name.trim();
        let variant = initials_variant(full_name)?;
        self.search_spellings(full_name, &variant).await
    }

    /// Same as [`search_researcher`](Self::search_researcher) with a caller-supplied
    /// second spelling, e.g. one read from the roster.
    pub async fn search_spellings(
        &self,
        full_name: &str,
        variant: &str,
    ) -> Result<SearchOutcome, HalError> {
        let mut docids: Vec<String> = Vec::new();
        let second = (variant != full_name).then_some(variant);
        for name in std::iter::once(full_name).chain(second) {
            for docid in self.search_docids(name).await? {
                if !docids.contains(&docid) {
                    docids.push(docid);
                }
            }
        }

        if docids.is_empty() {
            return Err(HalError::NoResults(full_name.to_string()));
        }

        let mut documents = Vec::new();
        for docid in &docids {
            documents.extend(self.fetch_document(docid).await?);
        }

        let outcome = aggregate(docids.len(), documents);
        tracing::info!(
            name = full_name,
            publications = outcome.stats.num_publications,
            main_labo = %outcome.stats.main_labo,
            "HAL search complete"
        );
        Ok(outcome)
    }
}

/// Fields of one HAL document, lists kept unjoined for counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDetails {
    pub title: String,
    pub authors: Vec<String>,
    pub domains: Vec<String>,
    pub structures: Vec<String>,
}

impl DocumentDetails {
    fn from_fields(fields: DocumentFields) -> Self {
        Self {
            title: fields
                .titles
                .into_iter()
                .next()
                .unwrap_or_else(|| UNTITLED.to_string()),
            authors: fields.authors,
            domains: fields.domains,
            structures: fields.structures,
        }
    }
}

/// Count domains and structures over all documents.
///
/// `main_labo` is the structure with the highest count; ties go to the one
/// seen first.
pub fn aggregate(num_publications: usize, documents: Vec<DocumentDetails>) -> SearchOutcome {
    let mut domains: BTreeMap<String, usize> = BTreeMap::new();
    let mut labs: Vec<(String, usize)> = Vec::new();
    let mut details = Vec::with_capacity(documents.len());

    for doc in documents {
        for domain in &doc.domains {
            *domains.entry(domain.clone()).or_default() += 1;
        }
        for lab in &doc.structures {
            match labs.iter_mut().find(|(name, _)| name == lab) {
                Some((_, count)) => *count += 1,
                None => labs.push((lab.clone(), 1)),
            }
        }
        details.push(Publication {
            title: doc.title,
            authors: doc.authors.join(", "),
            domain: doc.domains.join(", "),
            labo: doc.structures.join(", "),
        });
    }

    let mut main_labo: Option<&(String, usize)> = None;
    for entry in &labs {
        match main_labo {
            Some(best) if best.1 >= entry.1 => {}
            _ => main_labo = Some(entry),
        }
    }

    SearchOutcome {
        stats: SearchStats {
            num_publications,
            domains,
            main_labo: main_labo
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| NO_LAB.to_string()),
        },
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use pretty_assertions::assert_eq;

    fn client_for(server: &ServerGuard) -> HalClient {
        HalClient::new(HalConfig {
            base_url: format!("{}/search/", server.url()),
            timeout: Duration::from_secs(5),
            rows: 100,
        })
        .unwrap()
    }

    async fn mock_docids(server: &mut ServerGuard, name: &str, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/search/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), format!("authFullName_s:\"{name}\"")),
                Matcher::UrlEncoded("fl".into(), "docid".into()),
                Matcher::UrlEncoded("rows".into(), "100".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    async fn mock_document(server: &mut ServerGuard, docid: &str, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/search/")
            .match_query(Matcher::UrlEncoded("q".into(), format!("docid:\"{docid}\"")))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[test]
    fn test_initials_variant() {
        assert_eq!(initials_variant("Marie Curie").unwrap(), "M. Curie");
        assert_eq!(initials_variant("Jean-Pierre Dupont").unwrap(), "J.P. Dupont");
        assert_eq!(initials_variant("  Ada   King Lovelace ").unwrap(), "A. King Lovelace");
        assert_eq!(initials_variant("alan turing").unwrap(), "A. turing");
        assert_eq!(initials_variant("Jean Pierre Dupont").unwrap(), "J. Pierre Dupont");
    }

    #[test]
    fn test_initials_variant_rejects_single_token() {
        assert!(matches!(initials_variant("Curie"), Err(HalError::InvalidName(_))));
        assert!(matches!(initials_variant("   "), Err(HalError::InvalidName(_))));
    }

    #[test]
    fn test_aggregate_counts_and_main_labo_tie() {
        let docs = vec![
            DocumentDetails {
                title: "A".into(),
                authors: vec!["Marie Curie".into(), "Pierre Curie".into()],
                domains: vec!["phys".into(), "chim".into()],
                structures: vec!["LCP".into(), "CNRS".into()],
            },
            DocumentDetails {
                title: "B".into(),
                authors: vec!["Marie Curie".into()],
                domains: vec!["phys".into()],
                structures: vec!["CNRS".into(), "LCP".into()],
            },
        ];
        let outcome = aggregate(2, docs);

        assert_eq!(outcome.stats.num_publications, 2);
        assert_eq!(outcome.stats.domains.get("phys"), Some(&2));
        assert_eq!(outcome.stats.domains.get("chim"), Some(&1));
        assert_eq!(outcome.stats.main_labo, "LCP");
        assert_eq!(outcome.details[0].authors, "Marie Curie, Pierre Curie");
        assert_eq!(outcome.details[1].labo, "CNRS, LCP");
    }

    #[test]
    fn test_aggregate_without_structures() {
        let outcome = aggregate(
            1,
            vec![DocumentDetails {
                title: UNTITLED.into(),
                authors: vec![],
                domains: vec![],
                structures: vec![],
            }],
        );
        assert_eq!(outcome.stats.main_labo, "N/A");
        assert!(outcome.stats.domains.is_empty());
    }

    #[tokio::test]
    async fn test_search_researcher_merges_both_spellings() {
        let mut server = Server::new_async().await;
        let full = mock_docids(
            &mut server,
            "Marie Curie",
            r#"{"response":{"numFound":2,"docs":[{"docid":101},{"docid":102}]}}"#,
        )
        .await;
        let short = mock_docids(
            &mut server,
            "M. Curie",
            r#"{"response":{"numFound":2,"docs":[{"docid":102},{"docid":"103"}]}}"#,
        )
        .await;
        let d1 = mock_document(
            &mut server,
            "101",
            r#"{"response":{"docs":[{"title_s":["Radium"],"authFullName_s":["Marie Curie"],"domain_s":["phys"],"structName_s":["LCP"]}]}}"#,
        )
        .await;
        let d2 = mock_document(
            &mut server,
            "102",
            r#"{"response":{"docs":[{"authFullName_s":["M. Curie","P. Curie"],"domain_s":["phys","chim"],"structName_s":["ESPCI","LCP"]}]}}"#,
        )
        .await;
        let d3 = mock_document(&mut server, "103", r#"{"response":{"docs":[{"title_s":["Polonium"]}]}}"#).await;

        let outcome = client_for(&server).search_researcher("Marie Curie").await.unwrap();

        assert_eq!(outcome.stats.num_publications, 3);
        assert_eq!(outcome.details.len(), 3);
        assert_eq!(outcome.details[1].title, "Sans titre");
        assert_eq!(outcome.details[1].authors, "M. Curie, P. Curie");
        assert_eq!(outcome.stats.domains.get("phys"), Some(&2));
        assert_eq!(outcome.stats.main_labo, "LCP");

        for mock in [full, short, d1, d2, d3] {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_search_researcher_no_results() {
        let mut server = Server::new_async().await;
        let _full = mock_docids(&mut server, "Ada Lovelace", r#"{"response":{"docs":[]}}"#).await;
        let _short = mock_docids(&mut server, "A. Lovelace", r#"{}"#).await;

        let err = client_for(&server)
            .search_researcher("Ada Lovelace")
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::NoResults(ref name) if name == "Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_search_researcher_http_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/search/")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let err = client_for(&server)
            .search_researcher("Ada Lovelace")
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::Status { status: 500, .. }));
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_search_researcher_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/search/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client_for(&server).search_docids("Ada Lovelace").await.unwrap_err();
        assert!(matches!(err, HalError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_search_researcher_invalid_name_makes_no_request() {
        let server = Server::new_async().await;
        let err = client_for(&server).search_researcher("Lovelace").await.unwrap_err();
        assert!(matches!(err, HalError::InvalidName(_)));
    }
}
