use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, info};
use op_type_usage::{NodeList, RequiredOps, UsageManager, parse_required_ops};
use std::process;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "op-type-usage")]
#[command(about = "Operator type usage for reduced-type kernel builds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print build defines for the type info stored in config files.
    Defines {
        /// Required operators config; later files replace earlier type info.
        #[arg(long = "config", required = true)]
        configs: Vec<String>,

        #[arg(short = 'o', long)]
        out: Option<String>,
    },

    /// Tell whether one typed kernel registration is needed.
    Check {
        #[arg(long = "config", required = true)]
        configs: Vec<String>,

        /// Operator as domain:optype, e.g. ai.onnx:Add
        #[arg(long)]
        op: String,

        /// Type string from the kernel registration, e.g. float
        #[arg(long = "type")]
        type_in_registration: String,
    },

    /// Print directives and config entries after a round trip self-check.
    Dump {
        #[arg(long = "config", required = true)]
        configs: Vec<String>,
    },

    /// Feed node dumps to the manager, in order, and report the result.
    Scan {
        /// JSON node dump ({"value_types": {...}, "nodes": [...]}).
        #[arg(long = "nodes", required = true)]
        nodes: Vec<String>,

        /// Config whose type info is restored before scanning.
        #[arg(long = "config")]
        configs: Vec<String>,

        /// Write the operators of the last --config back out with type info.
        #[arg(long, requires = "configs")]
        write_config: Option<String>,
    },
}

fn main() {
    let env = env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "warn");
    env_logger::Builder::from_env(env).init();

    if let Err(e) = handle(Cli::parse()) {
        error!("{:#}", e);
        process::exit(1)
    }
}

fn handle(cli: Cli) -> Result<()> {
    match cli.cmd {
        Commands::Defines { configs, out } => {
            let manager = manager_from_configs(&configs)?;
            let text: String = manager
                .build_directives()
                .iter()
                .map(|line| format!("{}\n", line))
                .collect();
            match out {
                Some(out) => {
                    std::fs::write(&out, text).with_context(|| format!("write {}", out))?;
                    println!("Wrote {}", out);
                }
                None => print!("{}", text),
            }
        }

        Commands::Check {
            configs,
            op,
            type_in_registration,
        } => {
            let manager = manager_from_configs(&configs)?;
            let (domain, optype) = op
                .split_once(':')
                .with_context(|| format!("operator must be domain:optype, got {}", op))?;
            let needed = manager.is_registration_needed(domain, optype, &type_in_registration)?;
            println!("{}", if needed { "needed" } else { "not needed" });
        }

        Commands::Dump { configs } => {
            let manager = manager_from_configs(&configs)?;
            manager.verify_round_trip()?;
            print!("{}", manager.dump()?);
        }

        Commands::Scan {
            nodes,
            configs,
            write_config,
        } => {
            let mut manager = UsageManager::new()?;
            let mut last_config = None;
            for path in &configs {
                let ops = read_config(path)?;
                manager.restore_from_required_ops(&ops)?;
                last_config = Some(ops);
            }

            for path in &nodes {
                let text =
                    std::fs::read_to_string(path).with_context(|| format!("read {}", path))?;
                let list: NodeList =
                    serde_json::from_str(&text).with_context(|| format!("parse {}", path))?;
                info!("{}: {} nodes", path, list.nodes.len());
                for node in &list.nodes {
                    manager
                        .process_node(node, &list.value_types)
                        .with_context(|| format!("{}: {}:{}", path, node.domain, node.op_type))?;
                }
            }

            manager.verify_round_trip()?;
            print!("{}", manager.dump()?);

            if let (Some(out), Some(mut ops)) = (write_config, last_config) {
                manager.annotate(&mut ops)?;
                std::fs::write(&out, ops.to_string()).with_context(|| format!("write {}", out))?;
                println!("Wrote {}", out);
            }
        }
    }
    Ok(())
}

fn read_config(path: &str) -> Result<RequiredOps> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    parse_required_ops(&text).with_context(|| format!("parse config {}", path))
}

fn manager_from_configs(paths: &[String]) -> Result<UsageManager> {
    let mut manager = UsageManager::new()?;
    for path in paths {
        manager.restore_from_required_ops(&read_config(path)?)?;
    }
    Ok(manager)
}
