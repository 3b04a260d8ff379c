use crate::explain::{self, Output};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info_span, Instrument};
use trek_core::{Config, Lookup, ServiceRef, TargetService, UnsupportedFallback, Verdict};
use trek_k8s_lookup::KubeLookup;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nGit commit: ",
    env!("TREK_GIT_SHA"),
    "\nGit tree state: ",
    env!("TREK_GIT_TREE_STATE"),
);

#[derive(Debug, Parser)]
#[clap(
    name = "trek",
    version,
    long_version = LONG_VERSION,
    about = "Checks whether NetworkPolicies admit traffic from a pod to a service"
)]
pub struct Args {
    #[clap(long, default_value = "trek=warn,warn", env = "TREK_LOG")]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain", env = "TREK_LOG_FORMAT")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    /// Namespace of the source pod
    #[clap(long, short = 'n', default_value = "default", env = "TREK_NAMESPACE")]
    namespace: String,

    /// Name of the source pod
    #[clap(long)]
    from: String,

    /// Target port, compared verbatim against policy ports
    #[clap(long)]
    port: String,

    /// Target protocol
    #[clap(long = "proto", default_value = "TCP")]
    protocol: String,

    /// Lists the decisions that led to the verdict.
    #[clap(long)]
    explain: bool,

    #[clap(long, short = 'o', default_value = "plain")]
    output: Output,

    /// Verdict when the only rules that apply have unsupported (ipBlock) peers: `allow` or `deny`
    #[clap(long, default_value = "deny")]
    unsupported: UnsupportedFallback,

    /// Target service, as `name.namespace`
    target: ServiceRef,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<Verdict> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<Verdict> {
        let Self {
            log_level,
            log_format,
            client,
            namespace,
            from,
            port,
            protocol,
            explain,
            output,
            unsupported,
            target,
        } = self;

        log_format
            .try_init(log_level)
            .expect("must configure logging");

        let config = Config {
            unsupported_fallback: unsupported,
        };
        debug!(?config);

        let client = client
            .try_client()
            .await
            .context("failed to configure Kubernetes client")?;
        let lookup = KubeLookup::new(client);

        let source = lookup
            .pod(&namespace, &from)
            .instrument(info_span!("source", ns = %namespace, name = %from))
            .await
            .context("failed to read source pod")?;
        let target = TargetService::new(target, port, protocol);

        let result = trek_core::evaluate(&lookup, &config, target, source).await?;

        let stdout = std::io::stdout();
        explain::render(&result, output, explain, &mut stdout.lock())?;

        Ok(result.verdict)
    }
}
