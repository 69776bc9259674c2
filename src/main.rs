use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell as CompShell};
use owo_colors::OwoColorize;
use std::path::PathBuf;

use chainbench::commands::{experiment, load};

#[derive(Parser)]
#[command(name = "chainbench")]
#[command(version = "0.1.0")]
#[command(about = "Load-test and benchmark orchestrator for consensus clusters")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inject transactions into an already-running cluster and report
    Load {
        /// Expected cluster size (node homes under the data root)
        #[arg(long = "nodes", default_value = "12", value_parser = clap::value_parser!(u32).range(1..=1000))]
        nodes: u32,
        /// Total transactions, split across nodes
        #[arg(long = "txs", default_value = "1000")]
        txs: u64,
        /// Sequence assignment: explicit or implicit
        #[arg(long = "sequencing", default_value = "explicit")]
        sequencing: String,
        /// Root directory of the node homes
        #[arg(long = "data-root", default_value = ".nodes")]
        data_root: PathBuf,
        /// Consensus node binary
        #[arg(long = "binary", default_value = "hcpd")]
        binary: PathBuf,
        #[arg(long = "chain-id", default_value = "hcp-testnet-1")]
        chain_id: String,
        /// Backoff between retries of transient submit failures (e.g. "500ms", "1s")
        #[arg(long = "retry-backoff", default_value = "1s")]
        retry_backoff: String,
        /// Retry budget per transaction slot before it counts as failed
        #[arg(long = "max-retries", default_value = "60")]
        max_retries: u32,
        /// Markdown report path (defaults to a timestamped name)
        #[arg(long = "output")]
        output: Option<PathBuf>,
        /// Label used in artifact filenames
        #[arg(long = "label", default_value = "chainbench_load")]
        label: String,
    },
    /// Run the cluster-lifecycle experiment matrix
    Experiment {
        /// Full matrix (4/8/16/32 nodes × 100/500/1000 txs); may take long
        #[arg(long = "full")]
        full: bool,
        /// Override node counts, e.g. "4,8"
        #[arg(long = "node-counts")]
        node_counts: Option<String>,
        /// Override transaction counts, e.g. "100,500"
        #[arg(long = "tx-counts")]
        tx_counts: Option<String>,
        /// Sequence assignment: explicit or implicit
        #[arg(long = "sequencing", default_value = "implicit")]
        sequencing: String,
        /// Base directory for per-configuration node homes
        #[arg(long = "data-root", default_value = ".nodes")]
        data_root: PathBuf,
        #[arg(long = "log-dir", default_value = "logs")]
        log_dir: PathBuf,
        /// Consensus node binary
        #[arg(long = "binary", default_value = "hcpd")]
        binary: PathBuf,
        /// Directory containing start_nodes.sh
        #[arg(long = "bootstrap-dir", default_value = ".")]
        bootstrap_dir: PathBuf,
        #[arg(long = "chain-id", default_value = "hcp-testnet-1")]
        chain_id: String,
        #[arg(long = "label", default_value = "scale_matrix")]
        label: String,
        /// Directory for the JSON and Markdown artifacts
        #[arg(long = "out-dir", default_value = ".")]
        out_dir: PathBuf,
    },
    /// Generate shell completions (internal)
    #[command(hide = true)]
    Completions {
        /// Shell: bash, zsh, fish
        shell: String,
    },
    /// Generate man page (internal)
    #[command(hide = true)]
    Man,
}

fn print_banner() {
    let banner = r#"
     ▄████▄ chainbench v0.1.0
     ██╔═══╝ consensus cluster load testing
     ╚█████▄ one matrix cell at a time
"#;

    if atty::is(atty::Stream::Stdout) {
        println!("{}", banner.cyan());
    } else {
        println!("chainbench v0.1.0 — consensus cluster load testing");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Completions { .. } | Commands::Man) {
        print_banner();
    }

    match cli.command {
        Commands::Load {
            nodes,
            txs,
            sequencing,
            data_root,
            binary,
            chain_id,
            retry_backoff,
            max_retries,
            output,
            label,
        } => {
            load::handle_load(load::LoadOptions {
                nodes,
                txs,
                sequencing,
                data_root,
                binary,
                chain_id,
                retry_backoff,
                max_retries,
                output,
                label,
            })
            .await?;
        }
        Commands::Experiment {
            full,
            node_counts,
            tx_counts,
            sequencing,
            data_root,
            log_dir,
            binary,
            bootstrap_dir,
            chain_id,
            label,
            out_dir,
        } => {
            experiment::handle_experiment(experiment::ExperimentOptions {
                full,
                node_counts,
                tx_counts,
                sequencing,
                data_root,
                log_dir,
                binary,
                bootstrap_dir,
                chain_id,
                label,
                out_dir,
            })
            .await?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            let sh = match shell.as_str() {
                "bash" => CompShell::Bash,
                "zsh" => CompShell::Zsh,
                "fish" => CompShell::Fish,
                "powershell" | "pwsh" => CompShell::PowerShell,
                "elvish" => CompShell::Elvish,
                other => {
                    eprintln!(
                        "Unsupported shell: {} (use bash|zsh|fish|powershell|elvish)",
                        other
                    );
                    std::process::exit(2);
                }
            };
            generate(sh, &mut cmd, name, &mut std::io::stdout());
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            man.render(&mut std::io::stdout())?;
        }
    }

    Ok(())
}
