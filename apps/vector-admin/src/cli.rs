use std::path::PathBuf;

use clap::{Parser, Subcommand};
use domain_vector_index::{Cloud, DistanceMetric};

#[derive(Parser, Debug)]
#[command(name = "vector-admin")]
#[command(about = "Manage vector indexes, namespaces and records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Create an index if it does not exist and wait until it is ready
    CreateIndex {
        name: String,

        /// Vector dimension
        #[arg(short, long)]
        dimension: u32,

        /// cosine, euclidean or dotproduct
        #[arg(short, long, default_value_t = DistanceMetric::Cosine)]
        metric: DistanceMetric,

        #[arg(long, default_value_t = Cloud::Aws)]
        cloud: Cloud,

        #[arg(long, default_value = "us-east-1")]
        region: String,
    },

    /// Show one index
    DescribeIndex { name: String },

    /// List every index
    ListIndexes,

    /// Index statistics, including per-namespace record counts
    Stats { index: String },

    /// Similarity query by free text, record id or raw vector
    Query {
        index: String,

        #[arg(short, long, default_value = "")]
        namespace: String,

        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: u32,

        /// Embed this text with the configured provider
        #[arg(long, conflicts_with_all = ["id", "vector"])]
        text: Option<String>,

        /// Use the stored vector of this record
        #[arg(long, conflicts_with = "vector")]
        id: Option<String>,

        /// Comma-separated vector components
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        vector: Option<Vec<f32>>,

        /// Metadata filter as JSON
        #[arg(long)]
        filter: Option<String>,

        #[arg(long)]
        include_values: bool,
    },

    /// Delete records by id or metadata filter
    DeleteVectors {
        index: String,

        #[arg(short, long, default_value = "")]
        namespace: String,

        #[arg(long, value_delimiter = ',', required_unless_present = "filter")]
        ids: Vec<String>,

        /// Metadata filter as JSON
        #[arg(long, conflicts_with = "ids")]
        filter: Option<String>,
    },

    /// Delete every record in a namespace if the index and namespace exist
    PurgeNamespace { index: String, namespace: String },

    /// Delete a namespace if it currently holds records
    DeleteNamespace { index: String, namespace: String },

    /// Delete every namespace of an index
    DeleteAllNamespaces { index: String },

    /// Delete one index
    DeleteIndex { name: String },

    /// Delete every index in the project
    DeleteAllIndexes {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Embed and upsert documents from a JSON-lines file
    IndexDocuments {
        index: String,

        /// One `{"id", "title", "content", "metadata"}` object per line
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "")]
        namespace: String,

        /// Overrides VECTOR_BATCH_SIZE
        #[arg(long)]
        batch_size: Option<usize>,

        /// Create the index first, sized for the embedding model
        #[arg(long)]
        create: bool,
    },
}
