use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use reqwest::{
  header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
  Client, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::airtable::api_types::{
  ApiAboutFields, ApiListResponse, ApiProjectFields, ApiRecord, ApiResearchOpsFields,
};
use crate::airtable::types::{AboutEntry, Project, ResearchOpsEntry};
use crate::config::{Config, Credentials, TablesConfig};

/// Column holding the featured rank in the projects table
const RANK_FIELD: &str = "featured_id";

/// Options for the list-records endpoint
#[derive(Debug, Clone, Default)]
pub struct ListParams {
  pub view: Option<String>,
  /// Fields to sort by, each ascending
  pub sort: Vec<String>,
  pub filter_by_formula: Option<String>,
  pub max_records: Option<u32>,
}

impl ListParams {
  /// Query string pairs, excluding the pagination offset
  fn query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Some(view) = &self.view {
      pairs.push(("view".to_string(), view.clone()));
    }
    for (i, field) in self.sort.iter().enumerate() {
      pairs.push((format!("sort[{}][field]", i), field.clone()));
      pairs.push((format!("sort[{}][direction]", i), "asc".to_string()));
    }
    if let Some(formula) = &self.filter_by_formula {
      pairs.push(("filterByFormula".to_string(), formula.clone()));
    }
    if let Some(max) = self.max_records {
      pairs.push(("maxRecords".to_string(), max.to_string()));
    }
    pairs
  }
}

/// Read-only Airtable REST client scoped to one base
#[derive(Clone)]
pub struct AirtableClient {
  http: Client,
  api_url: Url,
  base_id: String,
  view: String,
  tables: TablesConfig,
}

impl AirtableClient {
  pub fn new(config: &Config, credentials: &Credentials) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(
      AUTHORIZATION,
      HeaderValue::from_str(&format!("Bearer {}", credentials.token))
        .map_err(|e| eyre!("Invalid Airtable token: {}", e))?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static("folio"));

    let http = Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    let api_url = Url::parse(&config.airtable.api_url)
      .map_err(|e| eyre!("Invalid Airtable API URL {}: {}", config.airtable.api_url, e))?;

    Ok(Self {
      http,
      api_url,
      base_id: credentials.base_id.clone(),
      view: config.airtable.view.clone(),
      tables: config.airtable.tables.clone(),
    })
  }

  /// All case studies, ranked projects first in ascending rank
  pub async fn get_projects(&self) -> Result<Vec<Project>> {
    let params = ListParams {
      view: Some(self.view.clone()),
      sort: vec![RANK_FIELD.to_string()],
      ..ListParams::default()
    };

    let fetched_at = Utc::now();
    let records: Vec<ApiRecord<ApiProjectFields>> =
      self.list_records(&self.tables.projects, &params).await?;

    Ok(
      records
        .into_iter()
        .map(|r| r.into_project(fetched_at))
        .collect(),
    )
  }

  /// First About row whose `page` column equals `page`
  pub async fn get_about(&self, page: &str) -> Result<Option<AboutEntry>> {
    let params = ListParams {
      filter_by_formula: Some(page_formula(page)),
      max_records: Some(1),
      ..ListParams::default()
    };

    let fetched_at = Utc::now();
    let records: Vec<ApiRecord<ApiAboutFields>> =
      self.list_records(&self.tables.about, &params).await?;

    Ok(records.into_iter().next().map(|r| r.into_about(fetched_at)))
  }

  /// First row of the Research Ops table
  pub async fn get_research_ops(&self) -> Result<Option<ResearchOpsEntry>> {
    let params = ListParams {
      max_records: Some(1),
      ..ListParams::default()
    };

    let records: Vec<ApiRecord<ApiResearchOpsFields>> =
      self.list_records(&self.tables.research_ops, &params).await?;

    Ok(records.into_iter().next().map(|r| r.into_research_ops()))
  }

  /// List every record of `table`, following pagination offsets.
  pub async fn list_records<F: DeserializeOwned>(
    &self,
    table: &str,
    params: &ListParams,
  ) -> Result<Vec<ApiRecord<F>>> {
    let url = self.table_url(table)?;
    let base_query = params.query_pairs();

    let mut all_records = Vec::new();
    let mut offset: Option<String> = None;

    loop {
      let mut query = base_query.clone();
      if let Some(o) = &offset {
        query.push(("offset".to_string(), o.clone()));
      }

      debug!(table, page = all_records.len(), "listing records");
      let response = self
        .http
        .get(url.clone())
        .query(&query)
        .send()
        .await
        .map_err(|e| eyre!("Failed to reach Airtable: {}", e))?;
      let response = check_response(response, table).await?;

      let page: ApiListResponse<F> = response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse {} records: {}", table, e))?;

      all_records.extend(page.records);

      match page.offset {
        Some(next) if !next.is_empty() => offset = Some(next),
        _ => break,
      }
    }

    Ok(all_records)
  }

  fn table_url(&self, table: &str) -> Result<Url> {
    let mut url = self.api_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| eyre!("Airtable API URL cannot be a base: {}", self.api_url))?
      .pop_if_empty()
      .push(&self.base_id)
      .push(table);
    Ok(url)
  }
}

/// Check response status and convert errors.
async fn check_response(response: Response, table: &str) -> Result<Response> {
  match response.status() {
    status if status.is_success() => Ok(response),
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(eyre!(
      "Airtable rejected the access token for table {}",
      table
    )),
    StatusCode::NOT_FOUND => Err(eyre!("Airtable base or table {} not found", table)),
    StatusCode::UNPROCESSABLE_ENTITY => Err(eyre!(
      "Airtable rejected the query for table {}: {}",
      table,
      response.text().await.unwrap_or_default()
    )),
    StatusCode::TOO_MANY_REQUESTS => Err(eyre!("Airtable rate limit exceeded")),
    status => Err(eyre!(
      "HTTP {}: {}",
      status,
      response.text().await.unwrap_or_default()
    )),
  }
}

/// Equality formula on the `page` column with the key quoted as a string literal
fn page_formula(page: &str) -> String {
  let escaped = page.replace('\\', "\\\\").replace('"', "\\\"");
  format!("{{page}} = \"{}\"", escaped)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client() -> AirtableClient {
    let credentials = Credentials {
      token: "pat123".to_string(),
      base_id: "appBase".to_string(),
    };
    AirtableClient::new(&Config::default(), &credentials).unwrap()
  }

  #[test]
  fn test_table_url_encodes_spaces() {
    let url = client().table_url("Case Studies").unwrap();
    assert_eq!(
      url.as_str(),
      "https://api.airtable.com/v0/appBase/Case%20Studies"
    );
  }

  #[test]
  fn test_table_url_with_trailing_slash() {
    let mut config = Config::default();
    config.airtable.api_url = "http://localhost:8080/v0/".to_string();
    let credentials = Credentials {
      token: "t".to_string(),
      base_id: "app1".to_string(),
    };
    let client = AirtableClient::new(&config, &credentials).unwrap();
    assert_eq!(
      client.table_url("About").unwrap().as_str(),
      "http://localhost:8080/v0/app1/About"
    );
  }

  #[test]
  fn test_query_pairs() {
    let params = ListParams {
      view: Some("Grid view".to_string()),
      sort: vec!["featured_id".to_string()],
      filter_by_formula: Some("{page} = \"hero\"".to_string()),
      max_records: Some(1),
    };

    let pairs = params.query_pairs();
    let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
    assert_eq!(get("view"), Some("Grid view"));
    assert_eq!(get("sort[0][field]"), Some("featured_id"));
    assert_eq!(get("sort[0][direction]"), Some("asc"));
    assert_eq!(get("filterByFormula"), Some("{page} = \"hero\""));
    assert_eq!(get("maxRecords"), Some("1"));
  }

  #[test]
  fn test_empty_params_have_no_pairs() {
    assert!(ListParams::default().query_pairs().is_empty());
  }

  #[test]
  fn test_page_formula_escapes_quotes() {
    assert_eq!(page_formula("hero"), "{page} = \"hero\"");
    assert_eq!(page_formula("a\"b"), "{page} = \"a\\\"b\"");
    assert_eq!(page_formula("c\\"), "{page} = \"c\\\\\"");
  }

  #[test]
  fn test_invalid_api_url_is_an_error() {
    let mut config = Config::default();
    config.airtable.api_url = "not a url".to_string();
    let credentials = Credentials {
      token: "t".to_string(),
      base_id: "app1".to_string(),
    };
    assert!(AirtableClient::new(&config, &credentials).is_err());
  }
}
