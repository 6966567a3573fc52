//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 *[dramatic orchestral music swells]*
//! 🎬 "In a world where workers toil endlessly..."
//! 🎬 "One supervisor dared to manage them all."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor: part middle manager, part helicopter parent.
//!
//! 🧠 Knowledge graph, in the order things happen:
//! 1. connect to each cluster endpoint (version configured or detected) and log its health
//! 2. cluster → cluster only: prepare destination indices (settings, mappings, recreate)
//! 3. one bounded channel; consumers spawned first, then producers (one per scroll slice)
//! 4. the supervisor drops its own channel ends, so the workers alone decide when it closes
//! 5. join every handle, then refresh the destination indices if asked
//! 6. fold the tallies into a [`MigrationSummary`]
//!
//! Setup failures (connecting, opening a scroll, opening a file) come back as `Err`, but
//! only after every worker has been joined. Nobody gets left running in the background.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use futures::future::join_all;
use indicatif::MultiProgress;
use serde_json::{Map, Value, json};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::{self, ClusterApi, ProtocolGeneration, ScrollRequest};
use crate::app_config::{AppConfig, MigrationConfig, SinkConfig, SourceConfig};
use crate::channel::document_channel;
use crate::common::WorkerTally;
use crate::progress::{MigrationSummary, Progress};
use crate::transforms::HitMapper;
use crate::transport::HttpTransport;
use crate::workers::{
    BulkSettings, BulkWorker, FileConsumer, FileProducer, ScrollCursor, Worker,
};

/// 🗝️ Settings the server owns. Copying them to another cluster is a 400 waiting to happen.
const SERVER_MANAGED_SETTINGS: [&str; 4] = ["uuid", "version", "creation_date", "provided_name"];

/// 🔄 The settings an existing index will accept without being closed first.
const DYNAMIC_SETTINGS: [&str; 3] = ["number_of_replicas", "refresh_interval", "max_result_window"];

/// 📡 Where documents come from, resolved and connected.
enum Origin {
    Cluster {
        api: Arc<dyn ClusterApi>,
        request: ScrollRequest,
    },
    File(String),
}

/// 🚰 Where documents go, resolved and connected.
enum Destination {
    Cluster(Arc<dyn ClusterApi>),
    File(String),
}

/// 📦 The Supervisor: because even async tasks need someone hovering over them
/// asking "is it done yet?" every 5 milliseconds.
pub(crate) struct Supervisor {
    app_config: AppConfig,
}

impl Supervisor {
    pub(crate) fn new(app_config: AppConfig) -> Self {
        Self { app_config }
    }

    /// 🚀 Run the whole migration and report what happened.
    pub(crate) async fn run(self) -> Result<MigrationSummary> {
        let started = Instant::now();
        let migration = &self.app_config.migration;
        let runtime = &self.app_config.runtime;
        let mapper = Arc::new(HitMapper::from_config(migration)?);

        let mut origin = self.connect_origin().await?;
        let destination = self.connect_destination().await?;

        let mut prepared_indices = Vec::new();
        if let (Origin::Cluster { api: source, request }, Destination::Cluster(dest)) =
            (&mut origin, &destination)
        {
            if migration.copy_settings || migration.copy_mappings || migration.recreate_index {
                prepared_indices =
                    prepare_indices(&**source, &**dest, &request.indices, migration)
                        .await?;
                request.indices = prepared_indices.join(",");
            }
        }

        let (tx, rx) = document_channel(runtime.queue_capacity);
        let display = MultiProgress::new();
        let read = Progress::new(&display, "read");
        let written = Progress::new(&display, "written");

        // -- 🚰 consumers first, so the first pushed document already has somewhere to go
        let mut consumers: Vec<JoinHandle<Result<WorkerTally>>> = Vec::new();
        match &destination {
            Destination::Cluster(api) => {
                let settings = BulkSettings::from_config(migration, runtime);
                for _ in 0..runtime.sink_parallelism.max(1) {
                    consumers.push(
                        BulkWorker::new(api.clone(), rx.clone(), written.clone(), settings).start(),
                    );
                }
            }
            Destination::File(path) => {
                consumers.push(FileConsumer::new(path, rx.clone(), written.clone()).start());
            }
        }
        drop(rx);

        let mut producers: Vec<JoinHandle<Result<WorkerTally>>> = Vec::new();
        match &origin {
            Origin::Cluster { api, request } => {
                let mut slice_count = request.slice_count.max(1);
                if slice_count > 1 && api.generation() == ProtocolGeneration::Legacy {
                    // -- 🦕 every slice would read the whole index, so N slices means N copies
                    warn!(
                        "⚠️ sliced scroll needs a 5.x+ cluster; reading '{}' with one unsliced scroll instead of {}",
                        request.indices, slice_count
                    );
                    slice_count = 1;
                }
                for slice_id in 0..slice_count {
                    let slice = ScrollRequest {
                        slice_id,
                        slice_count,
                        ..request.clone()
                    };
                    producers.push(
                        ScrollCursor::new(api.clone(), slice, mapper.clone(), tx.clone(), read.clone())
                            .start(),
                    );
                }
            }
            Origin::File(path) => {
                producers.push(FileProducer::new(path, mapper.clone(), tx.clone(), read.clone()).start());
            }
        }
        // -- ✉️ from here on, only the producers hold senders. the last one out closes the channel.
        drop(tx);

        let producer_results = join_all(producers).await;
        let consumer_results = join_all(consumers).await;
        read.finish();
        written.finish();

        let mut read_tally = WorkerTally::default();
        let mut write_tally = WorkerTally::default();
        let mut producer_failures = 0u64;
        let mut first_failure: Option<anyhow::Error> = None;

        for outcome in producer_results {
            match flatten(outcome) {
                Ok(tally) => {
                    if tally.stopped_early {
                        producer_failures += 1;
                    }
                    read_tally = read_tally.merge(tally);
                }
                Err(e) => {
                    producer_failures += 1;
                    error!("💀 a producer failed: {:#}", e);
                    first_failure.get_or_insert(e);
                }
            }
        }
        for outcome in consumer_results {
            match flatten(outcome) {
                Ok(tally) => write_tally = write_tally.merge(tally),
                Err(e) => {
                    error!("💀 a consumer failed: {:#}", e);
                    first_failure.get_or_insert(e);
                }
            }
        }

        if let Some(failure) = first_failure {
            return Err(failure);
        }

        if migration.refresh_after {
            if let Destination::Cluster(dest) = &destination {
                self.refresh_destination(dest.as_ref(), &origin, &prepared_indices)
                    .await?;
            }
        }

        let summary = MigrationSummary {
            documents_read: read_tally.documents,
            documents_written: write_tally.documents,
            batches: write_tally.batches,
            skipped: read_tally.skipped + write_tally.skipped,
            producer_failures,
            elapsed: started.elapsed(),
        };
        info!(
            "🏁 migration finished: {} read, {} written, {} bulk requests",
            summary.documents_read, summary.documents_written, summary.batches
        );
        Ok(summary)
    }

    async fn connect_origin(&self) -> Result<Origin> {
        match &self.app_config.source_config {
            SourceConfig::Elasticsearch(config) => {
                let transport = HttpTransport::new(config.transport_config())?;
                let api = adapters::connect(transport, config.version.as_deref())
                    .await
                    .context("💀 Could not connect to the source cluster.")?;
                log_health(api.as_ref(), "source").await;
                let request = ScrollRequest {
                    indices: config.indices.clone(),
                    keepalive: self.app_config.migration.scroll_keepalive.clone(),
                    page_size: config.scroll_size,
                    query: config.query.clone(),
                    slice_id: 0,
                    slice_count: config.slices.max(1),
                    fields: config.fields.clone(),
                };
                Ok(Origin::Cluster { api, request })
            }
            SourceConfig::File(config) => Ok(Origin::File(config.file_name.clone())),
        }
    }

    async fn connect_destination(&self) -> Result<Destination> {
        match &self.app_config.sink_config {
            SinkConfig::Elasticsearch(config) => {
                let transport = HttpTransport::new(config.transport_config())?;
                let api = adapters::connect(transport, config.version.as_deref())
                    .await
                    .context("💀 Could not connect to the destination cluster.")?;
                log_health(api.as_ref(), "destination").await;
                Ok(Destination::Cluster(api))
            }
            SinkConfig::File(config) => Ok(Destination::File(config.file_name.clone())),
        }
    }

    /// 🔄 Refresh whatever the documents were written into, as best we can tell.
    async fn refresh_destination(
        &self,
        dest: &dyn ClusterApi,
        origin: &Origin,
        prepared_indices: &[String],
    ) -> Result<()> {
        let targets: Vec<String> = match &self.app_config.migration.target_index {
            Some(target) if !target.is_empty() => vec![target.clone()],
            _ if !prepared_indices.is_empty() => prepared_indices.to_vec(),
            _ => match origin {
                Origin::Cluster { request, .. } => vec![request.indices.clone()],
                Origin::File(_) => {
                    warn!("⚠️ refresh_after is set, but a file source has no index names to refresh. Set target_index.");
                    Vec::new()
                }
            },
        };
        for index in targets {
            dest.refresh(&index)
                .await
                .context(format!("💀 Refreshing '{}' after the migration failed.", index))?;
            info!("🔄 refreshed '{}'", index);
        }
        Ok(())
    }
}

fn flatten(outcome: Result<Result<WorkerTally>, tokio::task::JoinError>) -> Result<WorkerTally> {
    outcome.map_err(|e| anyhow!("💀 a worker panicked or was cancelled: {}", e))?
}

async fn log_health(api: &dyn ClusterApi, role: &str) {
    match api.cluster_health().await {
        Ok(health) => info!(
            "🩺 {} cluster '{}' is {}",
            role, health.cluster_name, health.status
        ),
        Err(e) => warn!("⚠️ could not read {} cluster health: {:#}", role, e),
    }
}

/// 🏗️ Copy settings and mappings from the source indices to their destinations.
///
/// Returns the concrete source index names the pattern expanded to; the scroll reads
/// exactly those.
async fn prepare_indices(
    source: &dyn ClusterApi,
    dest: &dyn ClusterApi,
    indices: &str,
    migration: &MigrationConfig,
) -> Result<Vec<String>> {
    let mappings = source.get_index_mappings(indices).await?;
    if mappings.indices.is_empty() {
        bail!(
            "💀 '{}' matched no indices on the source cluster. Nothing to prepare, nothing to migrate.",
            indices
        );
    }
    info!("🗂️ '{}' expanded to {} indices", indices, mappings.indices.len());

    let override_type = migration.override_type.as_deref().filter(|t| !t.is_empty());
    let mut already_prepared = HashSet::new();

    for name in &mappings.indices {
        let dest_name = migration
            .target_index
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| name.clone());
        // -- 🎯 many sources into one target: the first source index shapes it
        if !already_prepared.insert(dest_name.clone()) {
            continue;
        }

        let settings = if migration.copy_settings || migration.recreate_index {
            let raw = source.get_index_settings(name).await?;
            portable_settings(index_settings_of(&raw, name), migration)
        } else {
            Map::new()
        };

        if migration.recreate_index {
            dest.delete_index(&dest_name).await?;
            let body = if migration.copy_settings {
                json!({ "settings": { "index": settings } })
            } else {
                json!({})
            };
            dest.create_index(&dest_name, body).await?;
            info!("💣 recreated '{}'", dest_name);
        } else if migration.copy_settings {
            let dynamic: Map<String, Value> = settings
                .into_iter()
                .filter(|(key, _)| DYNAMIC_SETTINGS.contains(&key.as_str()))
                .collect();
            if !dynamic.is_empty() {
                dest.update_index_settings(&dest_name, json!({ "index": dynamic }))
                    .await?;
            }
        }

        if migration.copy_mappings {
            let source_mapping = mappings
                .mappings
                .get(name)
                .and_then(|doc| doc.get("mappings"))
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let normalized = normalize_mappings(
                source_mapping,
                source.generation(),
                dest.generation(),
                override_type,
            );
            if !normalized.is_empty() {
                dest.update_index_mapping(&dest_name, normalized).await?;
                info!("🗺️ copied the mapping of '{}' to '{}'", name, dest_name);
            }
        }
    }
    Ok(mappings.indices)
}

/// 🔎 `GET {index}/_settings` answers `{index: {"settings": {"index": {...}}}}`.
fn index_settings_of(raw: &Map<String, Value>, name: &str) -> Map<String, Value> {
    raw.get(name)
        .and_then(|doc| doc.get("settings"))
        .and_then(|settings| settings.get("index"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// 🧳 Strip what the server owns and apply the shard/replica overrides.
fn portable_settings(mut settings: Map<String, Value>, migration: &MigrationConfig) -> Map<String, Value> {
    for key in SERVER_MANAGED_SETTINGS {
        settings.remove(key);
    }
    if let Some(shards) = migration.shards {
        settings.insert("number_of_shards".to_string(), Value::String(shards.to_string()));
    }
    if let Some(replicas) = migration.replicas {
        settings.insert("number_of_replicas".to_string(), Value::String(replicas.to_string()));
    }
    settings
}

/// 🗺️ Move a mapping between the typed and typeless eras.
///
/// Typed → typeless unwraps the (first) type. Typeless → typed wraps it under the
/// override type, or `_doc` without one. Same era in, same mapping out.
fn normalize_mappings(
    mapping: Map<String, Value>,
    from: ProtocolGeneration,
    to: ProtocolGeneration,
    override_type: Option<&str>,
) -> Map<String, Value> {
    let typed = |generation| generation != ProtocolGeneration::Typeless;
    match (typed(from), typed(to)) {
        (true, false) => {
            if mapping.len() > 1 {
                warn!(
                    "⚠️ the source mapping has {} types; the typeless destination only gets the first",
                    mapping.len()
                );
            }
            mapping
                .into_iter()
                .next()
                .and_then(|(_, type_mapping)| match type_mapping {
                    Value::Object(inner) => Some(inner),
                    _ => None,
                })
                .unwrap_or_default()
        }
        (false, true) => {
            let mut wrapped = Map::new();
            wrapped.insert(
                override_type.unwrap_or("_doc").to_string(),
                Value::Object(mapping),
            );
            wrapped
        }
        _ => mapping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::{
        ElasticsearchSinkConfig, ElasticsearchSourceConfig, FileSinkConfig, FileSourceConfig,
        RuntimeConfig,
    };
    use std::io::Write;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn es_source(url: String, version: &str) -> ElasticsearchSourceConfig {
        ElasticsearchSourceConfig {
            url,
            username: None,
            password: None,
            api_key: None,
            version: Some(version.to_string()),
            proxy: None,
            compress: false,
            indices: "src".to_string(),
            query: None,
            fields: None,
            scroll_size: 100,
            slices: 1,
        }
    }

    fn es_sink(url: String, version: &str) -> ElasticsearchSinkConfig {
        ElasticsearchSinkConfig {
            url,
            username: None,
            password: None,
            api_key: None,
            version: Some(version.to_string()),
            proxy: None,
            compress: false,
        }
    }

    fn dump_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut the_file = tempfile::NamedTempFile::new().expect("temp file");
        for line in lines {
            writeln!(the_file, "{}", line).expect("write line");
        }
        the_file.flush().expect("flush");
        the_file
    }

    #[tokio::test]
    async fn the_one_where_a_file_becomes_another_file_with_a_new_index() -> Result<()> {
        let input = dump_file(&[
            r#"{"_index":"old","_type":"doc","_id":"1","_source":{"host":"a"}}"#,
            r#"{"_index":"old","_type":"doc","_id":"2","_source":{"host":"b"}}"#,
            r#"{"_index":"old","_type":"doc","_id":"3","_source":{"host":"c"}}"#,
        ]);
        let out_dir = tempfile::tempdir()?;
        let output = out_dir.path().join("out.json");

        let summary = Supervisor::new(AppConfig {
            source_config: SourceConfig::File(FileSourceConfig {
                file_name: input.path().display().to_string(),
            }),
            sink_config: SinkConfig::File(FileSinkConfig {
                file_name: output.display().to_string(),
            }),
            migration: MigrationConfig {
                target_index: Some("new".to_string()),
                rename_fields: "host:hostname".to_string(),
                ..MigrationConfig::default()
            },
            runtime: RuntimeConfig::default(),
        })
        .run()
        .await?;

        assert_eq!(summary.documents_read, 3);
        assert_eq!(summary.documents_written, 3);
        assert_eq!(summary.batches, 0);
        let written = tokio::fs::read_to_string(&output).await?;
        assert_eq!(written.lines().count(), 3);
        for line in written.lines() {
            let hit: Value = serde_json::from_str(line)?;
            assert_eq!(hit["_index"], "new");
            assert!(hit["_source"].get("hostname").is_some());
            assert!(hit["_source"].get("host").is_none());
        }
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_cluster_is_dumped_to_disk() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/src/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"_scroll_id":"s1","hits":{"total":{"value":2,"relation":"eq"},"hits":[
                    {"_index":"src","_type":"_doc","_id":"1","_source":{"n":1}},
                    {"_index":"src","_type":"_doc","_id":"2","_source":{"n":2},"_routing":"r"}
                ]}}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/_search/scroll"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"_scroll_id":"s1","hits":{"total":{"value":2,"relation":"eq"},"hits":[]}}"#,
            ))
            .mount(&server)
            .await;

        let out_dir = tempfile::tempdir()?;
        let output = out_dir.path().join("dump.json");
        let summary = Supervisor::new(AppConfig {
            source_config: SourceConfig::Elasticsearch(es_source(server.uri(), "7.10.2")),
            sink_config: SinkConfig::File(FileSinkConfig {
                file_name: output.display().to_string(),
            }),
            migration: MigrationConfig::default(),
            runtime: RuntimeConfig::default(),
        })
        .run()
        .await?;

        assert_eq!(summary.documents_read, 2);
        assert_eq!(summary.documents_written, 2);
        assert_eq!(summary.producer_failures, 0);
        let written = tokio::fs::read_to_string(&output).await?;
        assert!(written.contains(r#""_routing":"r""#), "{written}");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_an_old_cluster_is_read_once_no_matter_how_many_slices_were_asked_for()
    -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/src/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"_scroll_id":"s1","hits":{"total":2,"hits":[
                    {"_index":"src","_type":"doc","_id":"1","_source":{"n":1}},
                    {"_index":"src","_type":"doc","_id":"2","_source":{"n":2}}
                ]}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/_search/scroll"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"_scroll_id":"s1","hits":{"total":2,"hits":[]}}"#),
            )
            .mount(&server)
            .await;

        let out_dir = tempfile::tempdir()?;
        let output = out_dir.path().join("dump.json");
        let summary = Supervisor::new(AppConfig {
            source_config: SourceConfig::Elasticsearch(ElasticsearchSourceConfig {
                slices: 3,
                ..es_source(server.uri(), "2.4.6")
            }),
            sink_config: SinkConfig::File(FileSinkConfig {
                file_name: output.display().to_string(),
            }),
            migration: MigrationConfig::default(),
            runtime: RuntimeConfig::default(),
        })
        .run()
        .await?;

        assert_eq!(summary.documents_read, 2);
        assert_eq!(summary.documents_written, 2);
        let written = tokio::fs::read_to_string(&output).await?;
        assert_eq!(written.lines().count(), 2, "one scroll, one copy of each document");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_file_is_bulk_loaded_and_refreshed() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"took":1,"errors":false,"items":[]}"#),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/restored/_refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let input = dump_file(&[
            r#"{"_index":"old","_type":"doc","_id":"1","_source":{}}"#,
            r#"{"_index":"old","_type":"doc","_id":"2","_source":{}}"#,
        ]);
        let summary = Supervisor::new(AppConfig {
            source_config: SourceConfig::File(FileSourceConfig {
                file_name: input.path().display().to_string(),
            }),
            sink_config: SinkConfig::Elasticsearch(es_sink(server.uri(), "6.8.0")),
            migration: MigrationConfig {
                target_index: Some("restored".to_string()),
                refresh_after: true,
                ..MigrationConfig::default()
            },
            runtime: RuntimeConfig::default(),
        })
        .run()
        .await?;

        assert_eq!(summary.documents_written, 2);
        assert_eq!(summary.batches, 1);
        let requests = server.received_requests().await.unwrap_or_default();
        let bulk = requests
            .iter()
            .find(|r| r.url.path() == "/_bulk")
            .expect("a bulk request was sent");
        let body = String::from_utf8_lossy(&bulk.body);
        assert_eq!(body.lines().count(), 4);
        assert!(body.contains(r#""_index":"restored""#), "{body}");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_missing_input_file_fails_the_run() {
        let out_dir = tempfile::tempdir().expect("temp dir");
        let outcome = Supervisor::new(AppConfig {
            source_config: SourceConfig::File(FileSourceConfig {
                file_name: "/no/such/dump.json".to_string(),
            }),
            sink_config: SinkConfig::File(FileSinkConfig {
                file_name: out_dir.path().join("out.json").display().to_string(),
            }),
            migration: MigrationConfig::default(),
            runtime: RuntimeConfig::default(),
        })
        .run()
        .await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn the_one_where_a_typed_index_is_recreated_typeless() -> Result<()> {
        let source = MockServer::start().await;
        let dest = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs-*/_mapping"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"logs-1":{"mappings":{"doc":{"properties":{"msg":{"type":"text"}}}}},
                    "other":{"mappings":{}}}"#,
            ))
            .mount(&source)
            .await;
        Mock::given(method("GET"))
            .and(path("/logs-1/_settings"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"logs-1":{"settings":{"index":{"number_of_shards":"5","uuid":"abc","creation_date":"1","provided_name":"logs-1","version":{"created":"5060099"}}}}}"#,
            ))
            .mount(&source)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/logs-1"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&dest)
            .await;
        Mock::given(method("PUT"))
            .and(path("/logs-1"))
            .and(body_json(json!({"settings": {"index": {"number_of_shards": "1"}}})))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"acknowledged":true}"#))
            .expect(1)
            .mount(&dest)
            .await;
        Mock::given(method("PUT"))
            .and(path("/logs-1/_mapping"))
            .and(body_json(json!({"properties": {"msg": {"type": "text"}}})))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"acknowledged":true}"#))
            .expect(1)
            .mount(&dest)
            .await;

        let source_api = adapters::connect(
            HttpTransport::new(es_source(source.uri(), "5.6.0").transport_config())?,
            Some("5.6.0"),
        )
        .await?;
        let dest_api = adapters::connect(
            HttpTransport::new(es_sink(dest.uri(), "7.17.0").transport_config())?,
            Some("7.17.0"),
        )
        .await?;

        let migration = MigrationConfig {
            copy_settings: true,
            copy_mappings: true,
            recreate_index: true,
            shards: Some(1),
            ..MigrationConfig::default()
        };
        let expanded =
            prepare_indices(source_api.as_ref(), dest_api.as_ref(), "logs-*", &migration).await?;
        assert_eq!(expanded, vec!["logs-1".to_string()]);
        Ok(())
    }

    #[test]
    fn the_one_where_typeless_mappings_put_on_a_type_for_old_clusters() {
        let mapping = json!({"properties": {"x": {"type": "keyword"}}})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let wrapped = normalize_mappings(
            mapping.clone(),
            ProtocolGeneration::Typeless,
            ProtocolGeneration::Sliced,
            Some("event"),
        );
        assert_eq!(Value::Object(wrapped), json!({"event": {"properties": {"x": {"type": "keyword"}}}}));

        let untouched = normalize_mappings(
            mapping.clone(),
            ProtocolGeneration::Typeless,
            ProtocolGeneration::Typeless,
            None,
        );
        assert_eq!(untouched, mapping);
    }

    #[test]
    fn the_one_where_server_owned_settings_stay_home() {
        let raw = json!({"number_of_shards": "5", "number_of_replicas": "1", "uuid": "x", "provided_name": "p"})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let migration = MigrationConfig {
            replicas: Some(0),
            ..MigrationConfig::default()
        };
        assert_eq!(
            Value::Object(portable_settings(raw, &migration)),
            json!({"number_of_shards": "5", "number_of_replicas": "0"})
        );
    }
}
