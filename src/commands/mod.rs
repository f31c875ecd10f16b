// ABOUTME: Command handlers for the shipyard CLI.
// ABOUTME: Wires configuration into the store, cluster client and lifecycle services.

mod apps;
mod deploy;
mod serve;

pub use apps::{app, archive, config, db};
pub use deploy::{deploy, history, routes, status, stop};
pub use serve::serve;

use shipyard::catalog::Catalog;
use shipyard::cluster::{CliCluster, ClusterOps};
use shipyard::config::Config;
use shipyard::deploy::{Reconciler, Sequencer};
use shipyard::output::Output;
use shipyard::scripts::{ScriptOps, ScriptRunner};
use shipyard::status::StatusAggregator;
use shipyard::store::{EntityStore, FileStore};
use std::sync::Arc;

/// Services built from one configuration.
pub struct Context {
    pub config: Config,
    pub output: Output,
    store: Arc<dyn EntityStore>,
    cluster: Arc<dyn ClusterOps>,
    scripts: Arc<dyn ScriptOps>,
}

impl Context {
    pub fn new(config: Config, output: Output) -> Self {
        let store: Arc<dyn EntityStore> = Arc::new(FileStore::new(config.state_file_path()));
        let cluster: Arc<dyn ClusterOps> = Arc::new(CliCluster::new(
            config.cluster_cli.clone(),
            config.namespace.clone(),
        ));
        let scripts: Arc<dyn ScriptOps> = Arc::new(ScriptRunner::new(&config.scripts_dir));
        Self {
            config,
            output,
            store,
            cluster,
            scripts,
        }
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(
            self.store.clone(),
            self.cluster.clone(),
            self.scripts.clone(),
            self.config.workspace(),
        )
    }

    pub fn sequencer(&self) -> Sequencer {
        Sequencer::new(
            self.store.clone(),
            self.cluster.clone(),
            self.scripts.clone(),
            self.config.workspace(),
        )
    }

    pub fn status(&self) -> StatusAggregator {
        StatusAggregator::new(self.store.clone(), self.cluster.clone())
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.store.clone(),
            self.cluster.clone(),
            self.config.poll_interval,
        )
    }

    pub fn scripts(&self) -> &Arc<dyn ScriptOps> {
        &self.scripts
    }
}
