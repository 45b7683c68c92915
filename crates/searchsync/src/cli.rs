use core::num::NonZeroUsize;

use clap::{Args, Parser};
use const_format::concatcp;
use eyre::{Result as EyreResult, WrapErr};
use searchsync_index::keys::DEFAULT_PAGE_SIZE;
use searchsync_index::writer::DEFAULT_MAX_BYTES;
use searchsync_index::{update_crawl_engine_mapping, IndexReconciler};
use searchsync_source::SourceKind;
use tokio::signal::ctrl_c;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::config;

pub const EXAMPLES: &str = r"
  # Synchronize knowledge articles
  $ searchsync

  # Synchronize the employee directory
  $ searchsync smoelenboek
";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(after_help = concatcp!(
    "Sources:\n",
    "  kennisartikel (default), smoelenboek (alias medewerkers), vac\n\n",
    "Every option can also be set through the environment variable shown\n",
    "next to it.\n\n",
    "Examples:",
    EXAMPLES
))]
pub struct RootCommand {
    /// Source to synchronize
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    #[command(flatten)]
    pub elastic: ElasticArgs,

    #[command(flatten)]
    pub sdg: SdgArgs,

    #[command(flatten)]
    pub objecten: ObjectenArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Upper bound of a single bulk request body, in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_BYTES)]
    pub max_batch_bytes: NonZeroUsize,

    /// Number of ids read per scroll page
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_PAGE_SIZE)]
    pub scroll_page_size: NonZeroUsize,

    /// Accept invalid TLS certificates from the search cluster
    #[arg(long, env = "ELASTIC_INSECURE")]
    pub insecure: bool,
}

#[derive(Debug, Args)]
pub struct ElasticArgs {
    /// Search cluster URL
    #[arg(long, value_name = "URL", env = "ELASTIC_BASE_URL")]
    pub elastic_url: Url,

    #[arg(long, value_name = "NAME", env = "ELASTIC_USERNAME")]
    pub elastic_username: String,

    #[arg(long, env = "ELASTIC_PASSWORD", hide_env_values = true)]
    pub elastic_password: String,
}

#[derive(Debug, Args)]
pub struct SdgArgs {
    /// SDG products API URL, for knowledge articles
    #[arg(long, value_name = "URL", env = "SDG_BASE_URL")]
    pub sdg_url: Option<Url>,

    #[arg(long, env = "SDG_API_KEY", hide_env_values = true)]
    pub sdg_api_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct ObjectenArgs {
    /// Objecten API URL, for employees and questions
    #[arg(long, value_name = "URL", env = "OBJECTEN_BASE_URL")]
    pub objecten_url: Option<Url>,

    #[arg(long, env = "OBJECTEN_TOKEN", hide_env_values = true)]
    pub objecten_token: Option<String>,

    /// Client id used to sign tokens when no static token is set
    #[arg(long, env = "OBJECTEN_CLIENT_ID")]
    pub objecten_client_id: Option<String>,

    #[arg(long, env = "OBJECTEN_CLIENT_SECRET", hide_env_values = true)]
    pub objecten_client_secret: Option<String>,

    /// Objecttypen API URL
    #[arg(long, value_name = "URL", env = "OBJECTTYPES_BASE_URL")]
    pub objecttypes_url: Option<Url>,

    #[arg(long, env = "OBJECTTYPES_TOKEN", hide_env_values = true)]
    pub objecttypes_token: Option<String>,

    /// Object type holding the questions; looked up by name when unset
    #[arg(long, value_name = "URL", env = "VAC_OBJECT_TYPE_URL")]
    pub vac_object_type: Option<Url>,
}

#[derive(Debug, Args)]
pub struct EngineArgs {
    /// Enterprise search URL; when set with a key and engine, the index is
    /// registered with that meta engine after the run
    #[arg(long, value_name = "URL", env = "ENTERPRISE_SEARCH_BASE_URL")]
    pub engine_url: Option<Url>,

    #[arg(long, env = "ENTERPRISE_SEARCH_PRIVATE_API_KEY", hide_env_values = true)]
    pub engine_api_key: Option<String>,

    /// Meta engine to attach the index to
    #[arg(long, value_name = "NAME", env = "ENTERPRISE_SEARCH_ENGINE")]
    pub meta_engine: Option<String>,

    /// Crawler engine whose document titles get completion added to their
    /// mapping after the run
    #[arg(long, value_name = "NAME", env = "ENTERPRISE_SEARCH_CRAWL_ENGINE")]
    pub crawl_engine: Option<String>,
}

impl RootCommand {
    pub async fn run(self) -> EyreResult<()> {
        let kind = SourceKind::from_name(self.source.as_deref());

        let adapter = config::adapter(kind, &self.sdg, &self.objecten)?;
        let client = config::elastic_client(&self.elastic, self.insecure)?;
        let registrar = config::engine_registrar(&self.engine, self.insecure)?;

        let reconciler = IndexReconciler::new(client.clone())
            .with_max_batch_bytes(self.max_batch_bytes)
            .with_scroll_page_size(self.scroll_page_size);

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        drop(tokio::spawn(async move {
            if ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling the run");
                interrupt.cancel();
            }
        }));

        info!(source = adapter.source(), "Starting synchronization");

        let summary = reconciler
            .sync(adapter.as_ref(), cancel.clone())
            .await
            .wrap_err_with(|| format!("failed to synchronize source `{}`", adapter.source()))?;

        if let Some(registrar) = registrar {
            if !registrar.register(&summary.index, &cancel).await {
                warn!(index = %summary.index, "Index was synchronized but not registered with the engine");
            }
        }

        if let Some(crawl_engine) = &self.engine.crawl_engine {
            let _updated = update_crawl_engine_mapping(&client, crawl_engine, &cancel).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_is_well_formed() {
        RootCommand::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let command = RootCommand::try_parse_from([
            "searchsync",
            "vac",
            "--elastic-url",
            "https://es.example.com",
            "--elastic-username",
            "elastic",
            "--elastic-password",
            "changeme",
            "--objecten-url",
            "https://objecten.example.com",
            "--max-batch-bytes",
            "1024",
        ])
        .unwrap();

        assert_eq!(command.source.as_deref(), Some("vac"));
        assert_eq!(command.elastic.elastic_url.as_str(), "https://es.example.com/");
        assert_eq!(command.max_batch_bytes.get(), 1024);
        assert_eq!(command.scroll_page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(
            command.objecten.objecten_url.map(String::from).as_deref(),
            Some("https://objecten.example.com/")
        );
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let required = [
            "searchsync",
            "--elastic-url",
            "https://es.example.com",
            "--elastic-username",
            "elastic",
            "--elastic-password",
            "changeme",
        ];

        for flag in ["--max-batch-bytes", "--scroll-page-size"] {
            let error = RootCommand::try_parse_from(required.into_iter().chain([flag, "0"]))
                .unwrap_err();

            assert!(error.to_string().contains(flag), "{error}");
        }

        let command = RootCommand::try_parse_from(
            required
                .into_iter()
                .chain(["--max-batch-bytes", "1", "--scroll-page-size", "1"]),
        )
        .unwrap();

        assert_eq!(command.max_batch_bytes, NonZeroUsize::MIN);
        assert_eq!(command.scroll_page_size, NonZeroUsize::MIN);
    }
}
