//! CLI command definitions using clap.

use clap::Parser;

/// labelmirror - node label mirror
#[derive(Parser, Debug)]
#[command(name = "labelmirror")]
#[command(version)]
#[command(about = "Watches cluster nodes and mirrors their namespaced labels into a ConfigMap")]
#[command(
    long_about = "labelmirror lists the cluster's nodes once, then follows the node watch \
stream, folding label changes into a single ConfigMap so other components can read node \
topology without talking to the control plane."
)]
pub struct Cli {
    /// Namespace where the mirror ConfigMap lives
    #[arg(short, long)]
    pub namespace: String,

    /// Name of the mirror ConfigMap
    #[arg(short = 'c', long = "cm-name")]
    pub configmap_name: String,

    /// Recognized label namespace prefix
    #[arg(long, default_value = "kubernetes.io")]
    pub label_prefix: String,

    /// Apply the bootstrap snapshot and exit without watching
    #[arg(long, default_value_t = false)]
    pub one_shot: bool,

    /// Persist after every event instead of only at shutdown
    #[arg(long, default_value_t = false)]
    pub write_through: bool,

    /// Adopt an existing ConfigMap's data instead of replacing it
    #[arg(long, default_value_t = false)]
    pub adopt_existing: bool,

    /// Consecutive watch re-subscribe attempts before giving up
    #[arg(long, default_value_t = 5)]
    pub max_resubscribe_attempts: usize,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_parses_required_flags() {
        let cli = Cli::try_parse_from([
            "labelmirror",
            "--namespace",
            "kube-system",
            "--cm-name",
            "node-labels",
        ])
        .unwrap();

        assert_eq!(cli.namespace, "kube-system");
        assert_eq!(cli.configmap_name, "node-labels");
        assert_eq!(cli.label_prefix, "kubernetes.io");
        assert!(!cli.one_shot);
    }

    #[test]
    fn test_missing_configmap_name_is_rejected() {
        let cli = Cli::try_parse_from(["labelmirror", "--namespace", "kube-system"]);
        assert!(cli.is_err());
    }
}
