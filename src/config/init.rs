// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Creates a commented shipyard.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, namespace: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, template_yaml(namespace))?;

    Ok(())
}

fn template_yaml(namespace: Option<&str>) -> String {
    let namespace = match namespace {
        Some(ns) => format!("namespace: {ns}"),
        None => "# namespace: my-project".to_string(),
    };
    format!(
        r#"# Per-application staging directories and the state file live here.
work_dir: ./work
# Must contain install-chart.sh, uninstall-chart.sh and cluster-login.sh.
scripts_dir: ./scripts
# chart: ./scripts/managed-chart.tgz
{namespace}
# cluster_cli: oc
# poll_interval: 10s
# login:
#   server: https://api.cluster.example.com:6443
#   token:
#     env: SHIPYARD_CLUSTER_TOKEN
"#
    )
}
