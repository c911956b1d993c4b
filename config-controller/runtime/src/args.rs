use crate::{
    cache::ObjectCache,
    clusters::Clusters,
    config::ConfigService,
    core::{ConfigCriteria, ObjectKind},
    index::MeshInfo,
    permissions::{AccessPolicy, PermissionResolver},
    store::KubeStore,
    validation::Validator,
    validations::{self, ValidationService},
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::{config::KubeConfigOptions, Client};
use serde::Serialize;
use std::{io::Write, path::PathBuf, sync::Arc};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[clap(
    name = "mesh-config",
    about = "Lists, cross-references and validates service mesh configuration"
)]
pub struct Args {
    #[clap(long, default_value = "mesh_config=info,warn", env = "MESH_CONFIG_LOG")]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    /// The name by which the cluster reached through the client flags is known.
    #[clap(long, default_value = "home")]
    home_cluster: String,

    /// A remote cluster, given as NAME=CONTEXT where CONTEXT names a kubeconfig context.
    #[clap(long = "remote-cluster")]
    remote_clusters: Vec<RemoteCluster>,

    #[clap(long, default_value = "cluster.local")]
    cluster_domain: String,

    #[clap(long, default_value = "istio-system")]
    root_namespace: String,

    /// An identity allowed to write configuration. May be repeated.
    #[clap(long = "admin-user")]
    admin_users: Vec<String>,

    #[clap(long, default_value = "10")]
    cache_ttl_secs: u64,

    #[clap(long, default_value = "30")]
    timeout_secs: u64,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lists configuration objects.
    List {
        /// Lists from this cluster only. By default every cluster is listed.
        #[clap(long)]
        cluster: Option<String>,

        #[clap(long, short = 'n', default_value = "")]
        namespace: String,

        #[clap(long)]
        all_namespaces: bool,

        /// Comma-separated plural kinds, e.g. `virtualservices,gateways`.
        #[clap(long, default_value = "")]
        kinds: String,

        #[clap(long, default_value = "")]
        label_selector: String,

        #[clap(long, default_value = "")]
        workload_selector: String,
    },

    /// Shows an object and the current identity's permissions on its kind.
    Details {
        #[clap(flatten)]
        object: ObjectArgs,

        #[clap(long)]
        identity: Option<String>,
    },

    /// Validates the objects of a namespace, of a kind, or a single object.
    Validate {
        #[clap(long)]
        cluster: Option<String>,

        /// An empty namespace validates the whole mesh.
        #[clap(long, short = 'n', default_value = "")]
        namespace: String,

        #[clap(long)]
        kind: Option<String>,

        #[clap(long)]
        name: Option<String>,
    },

    /// Shows write permissions on a kind in every cluster.
    Permissions {
        #[clap(long, short = 'n')]
        namespace: String,

        #[clap(long)]
        kind: ObjectKind,

        #[clap(long)]
        identity: Option<String>,
    },

    /// Creates an object from a JSON manifest.
    Create {
        #[clap(long)]
        cluster: Option<String>,

        #[clap(long, short = 'n')]
        namespace: String,

        #[clap(long)]
        kind: ObjectKind,

        #[clap(long, short = 'f')]
        file: PathBuf,

        #[clap(long)]
        identity: Option<String>,
    },

    /// Applies a JSON merge patch to an object.
    Update {
        #[clap(flatten)]
        object: ObjectArgs,

        #[clap(long)]
        patch: String,

        #[clap(long)]
        identity: Option<String>,
    },

    Delete {
        #[clap(flatten)]
        object: ObjectArgs,

        #[clap(long)]
        identity: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
struct ObjectArgs {
    #[clap(long)]
    cluster: Option<String>,

    #[clap(long, short = 'n')]
    namespace: String,

    #[clap(long)]
    kind: String,

    #[clap(long)]
    name: String,
}

#[derive(Clone, Debug)]
struct RemoteCluster {
    name: String,
    context: String,
}

#[derive(Debug, thiserror::Error)]
#[error("expected NAME=CONTEXT: {0:?}")]
struct InvalidRemoteCluster(String);

struct Services {
    config: ConfigService,
    validations: ValidationService,
    permissions: PermissionResolver,
    home: String,
}

// === impl Args ===

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            home_cluster,
            remote_clusters,
            cluster_domain,
            root_namespace,
            admin_users,
            cache_ttl_secs,
            timeout_secs,
            command,
        } = self;

        log_format.try_init(log_level)?;

        let ttl = Duration::from_secs(cache_ttl_secs);
        let timeout = Duration::from_secs(timeout_secs);
        let client = client.try_client().await?;
        let home = Arc::new(KubeStore::new(&home_cluster, client, &cluster_domain));

        let mut clusters = Clusters::new(Arc::new(ObjectCache::new((*home).clone(), ttl)));
        for remote in remote_clusters {
            let store = remote.connect(&cluster_domain).await?;
            clusters = clusters.with_remote(Arc::new(ObjectCache::new(store, ttl)));
        }
        tracing::info!(
            home = %home_cluster,
            clusters = ?clusters.names().collect::<Vec<_>>(),
            "Connected"
        );

        let mesh = MeshInfo {
            dns_domain: cluster_domain,
            root_namespace,
            ..MeshInfo::default()
        };
        let policy = Arc::new(AccessPolicy::new(admin_users));
        let permissions = PermissionResolver::new(clusters.clone(), policy, timeout);
        let services = Services {
            config: ConfigService::new(clusters.clone(), permissions.clone(), timeout),
            validations: ValidationService::new(
                clusters,
                home,
                mesh,
                Validator::default(),
                timeout,
            ),
            permissions,
            home: home_cluster,
        };

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Cancelling");
                    cancel.cancel();
                }
            }
        });

        command.run(&services, &cancel).await
    }
}

// === impl Command ===

impl Command {
    async fn run(self, svc: &Services, cancel: &CancellationToken) -> Result<()> {
        match self {
            Self::List {
                cluster,
                namespace,
                all_namespaces,
                kinds,
                label_selector,
                workload_selector,
            } => {
                let criteria = ConfigCriteria::parse(
                    &namespace,
                    &kinds,
                    &label_selector,
                    &workload_selector,
                    all_namespaces,
                );
                match cluster {
                    Some(cluster) => {
                        print(&svc.config.list_config(&cluster, &criteria, cancel).await?)
                    }
                    None => print(&svc.config.list_config_all(&criteria, cancel).await?),
                }
            }

            Self::Details { object, identity } => {
                let cluster = svc.cluster(&object.cluster);
                let details = svc
                    .config
                    .get_config_details(
                        cluster,
                        &object.namespace,
                        &object.kind,
                        &object.name,
                        identity.as_deref(),
                        cancel,
                    )
                    .await?;
                print(&details)
            }

            Self::Validate {
                cluster,
                namespace,
                kind,
                name,
            } => {
                let scope = validations::scope(&namespace, kind.as_deref(), name.as_deref())?;
                let out = svc
                    .validations
                    .get_validations(svc.cluster(&cluster), scope, cancel)
                    .await?;
                print(&out)
            }

            Self::Permissions {
                namespace,
                kind,
                identity,
            } => {
                let perms = svc
                    .permissions
                    .resolve_all(&namespace, kind, identity.as_deref(), cancel)
                    .await?;
                print(&perms)
            }

            Self::Create {
                cluster,
                namespace,
                kind,
                file,
                identity,
            } => {
                let manifest = std::fs::File::open(&file)
                    .with_context(|| format!("failed to open {}", file.display()))?;
                let payload: serde_json::Value = serde_json::from_reader(manifest)?;
                let obj = svc
                    .config
                    .create_config(
                        svc.cluster(&cluster),
                        &namespace,
                        kind,
                        payload,
                        identity.as_deref(),
                        cancel,
                    )
                    .await?;
                print(&obj)
            }

            Self::Update {
                object,
                patch,
                identity,
            } => {
                let kind = object.kind.parse::<ObjectKind>()?;
                let patch: serde_json::Value =
                    serde_json::from_str(&patch).context("patch must be JSON")?;
                let obj = svc
                    .config
                    .update_config(
                        svc.cluster(&object.cluster),
                        &object.namespace,
                        kind,
                        &object.name,
                        patch,
                        identity.as_deref(),
                        cancel,
                    )
                    .await?;
                print(&obj)
            }

            Self::Delete { object, identity } => {
                let kind = object.kind.parse::<ObjectKind>()?;
                svc.config
                    .delete_config(
                        svc.cluster(&object.cluster),
                        &object.namespace,
                        kind,
                        &object.name,
                        identity.as_deref(),
                        cancel,
                    )
                    .await?;
                Ok(())
            }
        }
    }
}

// === impl Services ===

impl Services {
    /// The requested cluster, or the home cluster.
    fn cluster<'a>(&'a self, cluster: &'a Option<String>) -> &'a str {
        cluster.as_deref().unwrap_or(&self.home)
    }
}

// === impl RemoteCluster ===

impl RemoteCluster {
    async fn connect(self, domain: &str) -> Result<KubeStore> {
        let options = KubeConfigOptions {
            context: Some(self.context.clone()),
            ..Default::default()
        };
        let config = kube::Config::from_kubeconfig(&options)
            .await
            .with_context(|| format!("failed to load kubeconfig context {}", self.context))?;
        let client = Client::try_from(config)?;
        Ok(KubeStore::new(self.name, client, domain))
    }
}

impl std::str::FromStr for RemoteCluster {
    type Err = InvalidRemoteCluster;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, context)) if !name.is_empty() && !context.is_empty() => Ok(Self {
                name: name.to_string(),
                context: context.to_string(),
            }),
            _ => Err(InvalidRemoteCluster(s.to_string())),
        }
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
