use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "audit-policy-check",
    version,
    about = "Evaluate recorded requests against an audit policy"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Path to the audit policy file (overrides config file setting)
    #[arg(short, long)]
    pub policy: Option<PathBuf>,

    /// JSON-lines file of request attributes, or `-` for stdin
    #[arg(short, long, required_unless_present = "dump_rules")]
    pub requests: Option<PathBuf>,

    /// Decision log path (overrides config file setting)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the normalized policy rules as YAML and exit
    #[arg(long)]
    pub dump_rules: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_required_without_dump() {
        assert!(Cli::try_parse_from(["audit-policy-check"]).is_err());
    }

    #[test]
    fn dump_rules_needs_no_requests() {
        let cli = Cli::try_parse_from(["audit-policy-check", "--dump-rules", "-p", "p.yaml"])
            .unwrap();
        assert!(cli.dump_rules);
        assert_eq!(cli.policy, Some(PathBuf::from("p.yaml")));
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
    }

    #[test]
    fn overrides_parse() {
        let cli = Cli::try_parse_from([
            "audit-policy-check",
            "--requests",
            "-",
            "--output",
            "out/decisions.jsonl",
        ])
        .unwrap();
        assert_eq!(cli.requests, Some(PathBuf::from("-")));
        assert_eq!(cli.output, Some(PathBuf::from("out/decisions.jsonl")));
        assert!(!cli.dump_rules);
    }
}
