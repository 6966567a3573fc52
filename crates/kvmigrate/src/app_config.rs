//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." - every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - `[source_config.Elasticsearch]` / `[source_config.File]` → who we read from
//! - `[sink_config.Elasticsearch]` / `[sink_config.File]` → who we write to
//! - `[migration]` → what happens to each document on the way (overrides, renames,
//!   batch size, index preparation)
//! - `[runtime]` → how many workers, how big the channel, how long to wait
//! - Env vars: `KVM_` prefix, nested keys split on `__`, e.g.
//!   `KVM_MIGRATION__TARGET_INDEX=new-logs`
//! - The endpoint configs live next to the workers that use them and are re-exported here.

use anyhow::Context;
use serde::Deserialize;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use std::path::Path;
use tracing::info;

pub use crate::workers::{
    ElasticsearchSinkConfig, ElasticsearchSourceConfig, FileSinkConfig, FileSourceConfig,
};

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 📡 Where the documents come from.
    pub source_config: SourceConfig,
    /// 🚰 Where the documents go.
    pub sink_config: SinkConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default, alias = "supervisor_config")]
    pub runtime: RuntimeConfig,
}

/// 📡 The producer side. Externally tagged, so TOML reads `[source_config.Elasticsearch]`.
#[derive(Debug, Deserialize, Clone)]
pub enum SourceConfig {
    Elasticsearch(ElasticsearchSourceConfig),
    File(FileSourceConfig),
}

/// 🚰 The consumer side. Same tagging rules as the source.
#[derive(Debug, Deserialize, Clone)]
pub enum SinkConfig {
    Elasticsearch(ElasticsearchSinkConfig),
    File(FileSinkConfig),
}

/// 🔄 What happens to documents between the source and the sink.
#[derive(Debug, Deserialize, Clone)]
pub struct MigrationConfig {
    /// 📡 Replace every document's index with this one.
    #[serde(default)]
    pub target_index: Option<String>,
    /// 🏷️ Replace every document's type with this one. Required for typeless sources.
    #[serde(default)]
    pub override_type: Option<String>,
    /// 🔁 `"old:new,_type:kind"` rename rules, applied in order.
    #[serde(default)]
    pub rename_fields: String,
    /// 🪪 Drop the source ids and let the destination invent new ones.
    #[serde(default)]
    pub regenerate_id: bool,
    /// 📦 Flush a bulk batch before it would grow past this many bytes.
    #[serde(default = "default_bulk_size_bytes")]
    pub bulk_size_bytes: usize,
    /// 😴 Pause after every bulk request, for clusters that need a breather.
    #[serde(default)]
    pub sleep_after_bulk_secs: u64,
    /// ⏳ How long the source keeps a scroll context alive between pages.
    #[serde(default = "default_scroll_keepalive")]
    pub scroll_keepalive: String,
    #[serde(default)]
    pub copy_settings: bool,
    #[serde(default)]
    pub copy_mappings: bool,
    /// 💣 Delete and recreate each destination index before copying into it.
    #[serde(default)]
    pub recreate_index: bool,
    /// 🔄 Refresh the destination indices once every worker is done.
    #[serde(default)]
    pub refresh_after: bool,
    /// 🍕 `number_of_shards` for recreated indices, overriding the copied value.
    #[serde(default)]
    pub shards: Option<u32>,
    /// 🪞 `number_of_replicas` for recreated indices, overriding the copied value.
    #[serde(default)]
    pub replicas: Option<u32>,
}

// 📦 5 MiB per bulk request. The classic Elasticsearch sweet spot, as documented by a
// decade of forum threads that all end with "try 5MB".
fn default_bulk_size_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_scroll_keepalive() -> String {
    "10m".to_string()
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            target_index: None,
            override_type: None,
            rename_fields: String::new(),
            regenerate_id: false,
            bulk_size_bytes: default_bulk_size_bytes(),
            sleep_after_bulk_secs: 0,
            scroll_keepalive: default_scroll_keepalive(),
            copy_settings: false,
            copy_mappings: false,
            recreate_index: false,
            refresh_after: false,
            shards: None,
            replicas: None,
        }
    }
}

/// ⚙️ The knobs that shape the worker crew, not the documents.
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// 📬 Documents the channel holds before producers have to wait.
    #[serde(default = "default_queue_capacity", alias = "channel_size")]
    pub queue_capacity: usize,
    /// 🚰 How many bulk workers drain the channel. The file sink always uses one.
    #[serde(default = "default_sink_parallelism", alias = "num_sink_workers")]
    pub sink_parallelism: usize,
    /// ⏱️ Quiet seconds before a bulk worker flushes what it has.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// ⏰ Quiet seconds before a bulk worker gives up and goes home.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
}

fn default_queue_capacity() -> usize {
    10000
}

fn default_sink_parallelism() -> usize {
    1
}

fn default_idle_timeout_secs() -> u64 {
    5
}

fn default_task_timeout_secs() -> u64 {
    300
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            sink_parallelism: default_sink_parallelism(),
            idle_timeout_secs: default_idle_timeout_secs(),
            task_timeout_secs: default_task_timeout_secs(),
        }
    }
}

/// 🚀 Load the config: from a file, from env vars, or from the sheer power of hoping.
///
/// 📐 Tribal knowledge:
///   - `None` → env vars only. No file. No assumptions.
///   - `Some` → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Returns an error if config is unparseable. The message says which layer to blame.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    // 🏗️ Env vars are the base layer. `KVM_SINK_CONFIG__FILE__FILE_NAME` and friends.
    let config = Figment::new().merge(Env::prefixed("KVM_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (KVM_*). \
             The file exists in our hearts, but apparently not in a shape serde recognizes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (KVM_*). \
                 No file was provided. This one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_test_config(contents: &str) -> NamedTempFile {
        // 🧪 Figment wants TOML from disk, like it's method acting.
        let mut the_file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 Failed to create a temp config. The filesystem said 'new phone who dis'.");
        the_file
            .write_all(contents.as_bytes())
            .expect("💀 Failed to write test config.");
        the_file
    }

    #[test]
    fn the_one_where_a_cluster_to_cluster_config_parses_top_to_bottom() {
        let config_file = write_test_config(
            r#"
            [source_config.Elasticsearch]
            url = "http://old:9200"
            version = "5.6.16"
            indices = "logs-*"
            slices = 4
            query = "level:error"

            [sink_config.Elasticsearch]
            url = "http://new:9200"
            api_key = "c2VjcmV0"
            compress = true

            [migration]
            target_index = "logs-merged"
            rename_fields = "host:hostname,_type:kind"
            bulk_size_bytes = 1048576
            copy_mappings = true

            [runtime]
            sink_parallelism = 3
            "#,
        );

        let app_config = load_config(Some(config_file.path()))
            .expect("💀 A full config should parse. The schema drift goblin does not get this win.");

        match app_config.source_config {
            SourceConfig::Elasticsearch(source) => {
                assert_eq!(source.url, "http://old:9200");
                assert_eq!(source.indices, "logs-*");
                assert_eq!(source.slices, 4);
                assert_eq!(source.scroll_size, 5000, "untouched knobs keep their defaults");
            }
            honestly_who_knows => panic!("💀 Expected an Elasticsearch source, got {:?}", honestly_who_knows),
        }
        match app_config.sink_config {
            SinkConfig::Elasticsearch(sink) => {
                assert_eq!(sink.api_key.as_deref(), Some("c2VjcmV0"));
                assert!(sink.compress);
            }
            honestly_who_knows => panic!("💀 Expected an Elasticsearch sink, got {:?}", honestly_who_knows),
        }
        assert_eq!(app_config.migration.target_index.as_deref(), Some("logs-merged"));
        assert_eq!(app_config.migration.bulk_size_bytes, 1048576);
        assert_eq!(app_config.migration.scroll_keepalive, "10m");
        assert!(app_config.migration.copy_mappings);
        assert_eq!(app_config.runtime.sink_parallelism, 3);
        assert_eq!(app_config.runtime.queue_capacity, 10000);
    }

    #[test]
    fn the_one_where_runtime_defaults_show_up_uninvited_but_helpful() {
        let config_file = write_test_config(
            r#"
            [source_config.File]
            file_name = "input.json"

            [sink_config.File]
            file_name = "output.json"
            "#,
        );

        let app_config: AppConfig = Figment::new()
            .merge(Toml::file(config_file.path()))
            .extract()
            .expect("💀 Default runtime config should exist. Serde left us on read otherwise.");

        assert_eq!(app_config.runtime.queue_capacity, 10000);
        assert_eq!(app_config.runtime.sink_parallelism, 1);
        assert_eq!(app_config.runtime.idle_timeout_secs, 5);
        assert_eq!(app_config.runtime.task_timeout_secs, 300);
        assert_eq!(app_config.migration.bulk_size_bytes, 5 * 1024 * 1024);
        assert!(!app_config.migration.regenerate_id);
    }

    #[test]
    fn the_one_where_runtime_accepts_its_former_stage_names() {
        let config_file = write_test_config(
            r#"
            [supervisor_config]
            channel_size = 12
            num_sink_workers = 4

            [source_config.File]
            file_name = "input.json"

            [sink_config.File]
            file_name = "output.json"
            "#,
        );

        let app_config = load_config(Some(config_file.path()))
            .expect("💀 Runtime aliases should parse. The witness protection paperwork was valid.");

        assert_eq!(app_config.runtime.queue_capacity, 12);
        assert_eq!(app_config.runtime.sink_parallelism, 4);
    }

    #[test]
    fn the_one_where_a_config_with_no_sink_is_turned_away() {
        let config_file = write_test_config(
            r#"
            [source_config.File]
            file_name = "input.json"
            "#,
        );
        assert!(load_config(Some(config_file.path())).is_err());
    }
}
