use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{check_status, endpoint, host_url};
use crate::error::StoreError;
use crate::models::{
    DeleteManyOptions, IndexStats, Metadata, NamespaceStats, NamespaceSummary, QueryMatch,
    QueryOptions, QueryResponse, VectorRecord,
};
use crate::store::IndexHandle;

/// Data-plane client for one index host. Shares the connection pool and
/// auth headers of the [`PineconeClient`](super::PineconeClient) that built it.
pub struct PineconeIndex {
    http: Client,
    name: String,
    base: Url,
}

impl PineconeIndex {
    pub fn new(http: Client, name: &str, host: &str) -> Result<Self, StoreError> {
        Ok(Self {
            http,
            name: name.to_string(),
            base: host_url(host)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<reqwest::Response, StoreError> {
        let url = endpoint(&self.base, segments)?;
        let response = self.http.post(url).json(body).send().await?;
        check_status(response, &self.name).await
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector: Option<&'a [f32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a serde_json::Value>,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    matches: Vec<ScoredVector>,
}

#[derive(Debug, Deserialize)]
struct ScoredVector {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    delete_all: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStatsResult {
    #[serde(default)]
    dimension: u32,
    #[serde(default)]
    index_fullness: f32,
    #[serde(default, alias = "totalRecordCount")]
    total_vector_count: u64,
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceSummaryWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummaryWire {
    #[serde(default, alias = "recordCount")]
    vector_count: u64,
}

#[derive(Debug, Deserialize)]
struct ListNamespacesResult {
    #[serde(default)]
    namespaces: Vec<NamespaceDescription>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct NamespaceDescription {
    name: String,
    #[serde(default, alias = "recordCount")]
    record_count: u64,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    next: Option<String>,
}

#[async_trait]
impl IndexHandle for PineconeIndex {
    #[instrument(skip(self, records), fields(index = %self.name, count = records.len()))]
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), StoreError> {
        self.post(
            &["vectors", "upsert"],
            &UpsertRequest {
                vectors: &records,
                namespace,
            },
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, options), fields(index = %self.name, k = options.top_k))]
    async fn query(
        &self,
        namespace: &str,
        options: QueryOptions,
    ) -> Result<QueryResponse, StoreError> {
        let request = QueryRequest {
            namespace,
            top_k: options.top_k,
            vector: options.vector.as_deref(),
            id: options.id.as_deref(),
            filter: options.filter.as_ref(),
            include_values: options.include_values,
            include_metadata: options.include_metadata,
        };
        let result: QueryResult = self.post(&["query"], &request).await?.json().await?;

        Ok(QueryResponse {
            namespace: result.namespace,
            matches: result
                .matches
                .into_iter()
                .map(|m| QueryMatch {
                    id: m.id,
                    score: m.score,
                    values: m.values,
                    metadata: m.metadata,
                })
                .collect(),
        })
    }

    #[instrument(skip(self, options), fields(index = %self.name))]
    async fn delete_many(
        &self,
        namespace: &str,
        options: DeleteManyOptions,
    ) -> Result<(), StoreError> {
        let request = match &options {
            DeleteManyOptions::Ids(ids) => DeleteRequest {
                namespace,
                ids: Some(ids),
                ..Default::default()
            },
            DeleteManyOptions::Filter(filter) => DeleteRequest {
                namespace,
                filter: Some(filter),
                ..Default::default()
            },
        };
        self.post(&["vectors", "delete"], &request).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(index = %self.name))]
    async fn delete_all(&self, namespace: &str) -> Result<(), StoreError> {
        let request = DeleteRequest {
            namespace,
            delete_all: true,
            ..Default::default()
        };
        self.post(&["vectors", "delete"], &request).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(index = %self.name))]
    async fn describe_stats(&self) -> Result<IndexStats, StoreError> {
        let result: DescribeStatsResult = self
            .post(&["describe_index_stats"], &serde_json::json!({}))
            .await?
            .json()
            .await?;

        Ok(IndexStats {
            dimension: result.dimension,
            index_fullness: result.index_fullness,
            total_record_count: result.total_vector_count,
            namespaces: result
                .namespaces
                .into_iter()
                .map(|(name, ns)| {
                    (
                        name,
                        NamespaceStats {
                            record_count: ns.vector_count,
                        },
                    )
                })
                .collect(),
        })
    }

    /// Follows pagination tokens until the listing is exhausted
    #[instrument(skip(self), fields(index = %self.name))]
    async fn list_namespaces(&self) -> Result<Vec<NamespaceSummary>, StoreError> {
        let mut namespaces = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut url = endpoint(&self.base, &["namespaces"])?;
            if let Some(token) = &token {
                url.query_pairs_mut().append_pair("paginationToken", token);
            }

            let response = check_status(self.http.get(url).send().await?, &self.name).await?;
            let page: ListNamespacesResult = response.json().await?;
            debug!(page_size = page.namespaces.len(), "Fetched namespace page");

            namespaces.extend(page.namespaces.into_iter().map(|ns| NamespaceSummary {
                name: ns.name,
                record_count: ns.record_count,
            }));

            match page.pagination.and_then(|p| p.next).filter(|next| !next.is_empty()) {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(namespaces)
    }

    #[instrument(skip(self), fields(index = %self.name))]
    async fn delete_namespace(&self, namespace: &str) -> Result<(), StoreError> {
        let url = endpoint(&self.base, &["namespaces", namespace])?;
        check_status(self.http.delete(url).send().await?, namespace).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataValue;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn index(server: &MockServer) -> PineconeIndex {
        PineconeIndex::new(Client::new(), "docs", &server.uri()).unwrap()
    }

    #[test]
    fn test_bare_host_gets_https() {
        let index = PineconeIndex::new(Client::new(), "docs", "docs-abc.svc.pinecone.io").unwrap();
        assert_eq!(index.base_url().scheme(), "https");
        assert_eq!(index.name(), "docs");
    }

    #[tokio::test]
    async fn test_upsert_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(body_json(json!({
                "vectors": [
                    {"id": "a", "values": [0.5, 1.0], "metadata": {"kind": "rule"}},
                    {"id": "b", "values": [1.0, 0.5]}
                ],
                "namespace": "rules"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let records = vec![
            VectorRecord::new("a", vec![0.5, 1.0])
                .with_metadata([("kind".to_string(), MetadataValue::from("rule"))].into()),
            VectorRecord::new("b", vec![1.0, 0.5]),
        ];
        index(&server).upsert("rules", records).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_request_and_response_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_json(json!({
                "namespace": "rules",
                "topK": 2,
                "vector": [0.5, 0.25],
                "filter": {"kind": {"$eq": "rule"}},
                "includeValues": false,
                "includeMetadata": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    {"id": "a", "score": 0.75, "metadata": {"kind": "rule", "tags": ["x", "y"]}},
                    {"id": "b", "score": 0.5}
                ],
                "namespace": "rules",
                "usage": {"readUnits": 5}
            })))
            .mount(&server)
            .await;

        let options = QueryOptions::by_vector(vec![0.5, 0.25], 2)
            .with_filter(json!({"kind": {"$eq": "rule"}}));
        let response = index(&server).query("rules", options).await.unwrap();

        assert_eq!(response.namespace, "rules");
        assert_eq!(response.matches.len(), 2);
        assert_eq!(response.matches[0].score, 0.75);
        let metadata = response.matches[0].metadata.as_ref().unwrap();
        assert_eq!(
            metadata["tags"],
            MetadataValue::StringList(vec!["x".to_string(), "y".to_string()])
        );
        assert!(response.matches[1].metadata.is_none());
    }

    #[tokio::test]
    async fn test_delete_by_ids_and_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/delete"))
            .and(body_json(json!({"namespace": "rules", "ids": ["a", "b"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vectors/delete"))
            .and(body_json(json!({"namespace": "rules", "filter": {"kind": "rule"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let index = index(&server);
        index
            .delete_many("rules", DeleteManyOptions::Ids(vec!["a".into(), "b".into()]))
            .await
            .unwrap();
        index
            .delete_many("rules", DeleteManyOptions::Filter(json!({"kind": "rule"})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_all_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/delete"))
            .and(body_json(json!({"namespace": "ns-a", "deleteAll": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        index(&server).delete_all("ns-a").await.unwrap();
    }

    #[tokio::test]
    async fn test_describe_stats_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/describe_index_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": {"ns-a": {"vectorCount": 100}},
                "dimension": 768,
                "indexFullness": 0.0,
                "totalVectorCount": 100
            })))
            .mount(&server)
            .await;

        let stats = index(&server).describe_stats().await.unwrap();
        assert_eq!(stats.dimension, 768);
        assert_eq!(stats.total_record_count, 100);
        assert_eq!(stats.namespace("ns-a").unwrap().record_count, 100);
        assert!(stats.namespace("ns-b").is_none());
    }

    #[tokio::test]
    async fn test_list_namespaces_follows_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/namespaces"))
            .and(query_param("paginationToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": [{"name": "ns-c", "record_count": 1}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/namespaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": [
                    {"name": "ns-a", "record_count": 10},
                    {"name": "ns-b", "record_count": 20}
                ],
                "pagination": {"next": "page-2"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let names: Vec<String> = index(&server)
            .list_namespaces()
            .await
            .unwrap()
            .into_iter()
            .map(|ns| ns.name)
            .collect();
        assert_eq!(names, vec!["ns-a", "ns-b", "ns-c"]);
    }

    #[tokio::test]
    async fn test_delete_namespace_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/namespaces/ns-a"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        index(&server).delete_namespace("ns-a").await.unwrap();
    }

    #[tokio::test]
    async fn test_data_plane_errors_are_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(400).set_body_string("dimension mismatch"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let index = index(&server);
        let err = index
            .upsert("rules", vec![VectorRecord::new("a", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 400, .. }));

        let err = index.delete_namespace("gone").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
