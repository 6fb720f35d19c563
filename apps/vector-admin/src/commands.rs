use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use domain_vector_index::{
    DeleteManyOptions, Document, EmbeddingProvider, EmbeddingProviderType, IndexDeployment,
    IndexSpec, OpenAIProvider, PineconeClient, QueryOptions, VectorIndexService,
    VertexAIProvider, admin::is_missing_index,
};
use eyre::{Result, WrapErr, bail};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::Command;
use crate::config::Config;

pub async fn run(command: Command, config: Config) -> Result<()> {
    let store = PineconeClient::new(config.pinecone.clone())?;
    let mut service = VectorIndexService::new(Arc::new(store));

    match command {
        Command::CreateIndex {
            name,
            dimension,
            metric,
            cloud,
            region,
        } => {
            let spec = IndexSpec::new(&name, dimension)
                .with_metric(metric)
                .with_deployment(IndexDeployment::Serverless { cloud, region });
            service.lifecycle().get_or_create(&spec).await?;
            print_json(&service.lifecycle().store().describe_index(&name).await?)?;
        }

        Command::DescribeIndex { name } => match service.lifecycle().check_exists(&name).await? {
            Some(descriptor) => print_json(&descriptor)?,
            None => bail!("Index '{name}' does not exist"),
        },

        Command::ListIndexes => {
            print_json(&service.lifecycle().store().list_indexes().await?)?;
        }

        Command::Stats { index } => {
            print_json(&service.data_plane().stats(&index).await?)?;
        }

        Command::Query {
            index,
            namespace,
            top_k,
            text,
            id,
            vector,
            filter,
            include_values,
        } => {
            let options = match (text, id, vector) {
                (Some(text), _, _) => {
                    service = service
                        .with_embedding_provider(embedding_provider(config.embedding_provider)?);
                    QueryOptions::by_vector(service.embed_query(&text).await?, top_k)
                }
                (None, Some(id), _) => QueryOptions::by_id(id, top_k),
                (None, None, Some(vector)) => QueryOptions::by_vector(vector, top_k),
                (None, None, None) => bail!("One of --text, --id or --vector is required"),
            };
            let options = query_options(options, filter, include_values)?;
            print_json(&service.data_plane().query(&index, options, &namespace).await?)?;
        }

        Command::DeleteVectors {
            index,
            namespace,
            ids,
            filter,
        } => {
            let options = match filter {
                Some(raw) => DeleteManyOptions::Filter(parse_filter(&raw)?),
                None => DeleteManyOptions::Ids(ids),
            };
            service
                .data_plane()
                .delete_many(&index, options, &namespace)
                .await?;
            info!(index = %index, namespace = %namespace, "Vectors deleted");
        }

        Command::PurgeNamespace { index, namespace } => {
            let deleted = service
                .admin()
                .delete_all_vectors_in_namespace(&index, &namespace)
                .await?;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }

        Command::DeleteNamespace { index, namespace } => {
            let deleted = service.admin().delete_namespace(&index, &namespace).await?;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }

        Command::DeleteAllNamespaces { index } => {
            let deleted = service.admin().delete_all_namespaces(&index).await?;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }

        Command::DeleteIndex { name } => match service.admin().delete_index(&name).await {
            Ok(()) => print_json(&serde_json::json!({ "deleted": true }))?,
            Err(e) if is_missing_index(&e) => {
                warn!(index = %name, "Index does not exist");
                print_json(&serde_json::json!({ "deleted": false }))?;
            }
            Err(e) => return Err(e.into()),
        },

        Command::DeleteAllIndexes { yes } => {
            if !yes {
                bail!("Refusing to delete every index without --yes");
            }
            let deleted = service.admin().delete_all_indices().await?;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }

        Command::IndexDocuments {
            index,
            file,
            namespace,
            batch_size,
            create,
        } => {
            let documents = read_documents(&file)?;
            if documents.is_empty() {
                bail!("{} contains no documents", file.display());
            }

            let embedder = embedding_provider(config.embedding_provider)?;
            if create {
                let spec = IndexSpec::new(&index, embedder.model().dimension());
                service.lifecycle().get_or_create(&spec).await?;
            }

            service = service.with_embedding_provider(embedder);
            let batch_size = batch_size.unwrap_or(config.pipeline.batch_size);
            let summary = service
                .pipeline()?
                .run_indexing(&documents, &index, &namespace, batch_size)
                .await?;
            print_json(&summary)?;
        }
    }

    Ok(())
}

fn embedding_provider(kind: EmbeddingProviderType) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match kind {
        EmbeddingProviderType::VertexAI => Arc::new(VertexAIProvider::from_env()?),
        EmbeddingProviderType::OpenAI => Arc::new(OpenAIProvider::from_env()?),
    };
    info!(provider = %kind, model = provider.model().model_name(), "Embedding provider ready");
    Ok(provider)
}

fn query_options(
    mut options: QueryOptions,
    filter: Option<String>,
    include_values: bool,
) -> Result<QueryOptions> {
    if let Some(raw) = filter {
        options = options.with_filter(parse_filter(&raw)?);
    }
    options.include_values = include_values;
    Ok(options)
}

fn parse_filter(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).wrap_err("--filter must be valid JSON")
}

/// Parse one [`Document`] per non-blank line
fn parse_documents(reader: impl BufRead) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.wrap_err_with(|| format!("failed to read line {}", i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let document: Document = serde_json::from_str(&line)
            .wrap_err_with(|| format!("line {} is not a valid document", i + 1))?;
        documents.push(document);
    }
    Ok(documents)
}

fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let file = File::open(path).wrap_err_with(|| format!("failed to open {}", path.display()))?;
    let documents = parse_documents(BufReader::new(file))?;
    info!(count = documents.len(), path = %path.display(), "Documents loaded");
    Ok(documents)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
