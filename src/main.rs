use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use kv_ecs::controller::launch::{Launcher, SshLauncher, StubLauncher};
use kv_ecs::controller::service::{Controller, DEFAULT_DEADLINE};
use kv_ecs::coordination::client::CoordinationService;
use kv_ecs::coordination::memory::MemoryCoordination;
use kv_ecs::error::BootstrapError;
use kv_ecs::topology::types::CacheStrategy;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<String> = None;
    let mut server_bin = "kv-server".to_string();
    let mut local = false;
    let mut deadline = DEFAULT_DEADLINE;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                config_path = args.get(i + 1).cloned();
                i += 2;
            }
            "--server-bin" => {
                if let Some(value) = args.get(i + 1) {
                    server_bin = value.clone();
                }
                i += 2;
            }
            "--timeout-ms" => {
                if let Some(ms) = args.get(i + 1).and_then(|v| v.parse::<u64>().ok()) {
                    deadline = Duration::from_millis(ms);
                }
                i += 2;
            }
            "--local" => {
                local = true;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(config_path) = config_path else {
        eprintln!("Usage: {} --config <path> [--local] [--server-bin <path>] [--timeout-ms <n>]", args[0]);
        eprintln!("Example: {} --config ./ecs.config --local", args[0]);
        std::process::exit(1);
    };

    let dcs: Arc<dyn CoordinationService> = Arc::new(MemoryCoordination::new());
    let launcher: Arc<dyn Launcher> = if local {
        Arc::new(StubLauncher::new(dcs.clone()))
    } else {
        Arc::new(SshLauncher::new(server_bin, "127.0.0.1:2181"))
    };

    let mut controller =
        match Controller::bootstrap(&config_path, dcs, launcher, deadline).await {
            Ok(controller) => controller,
            Err(BootstrapError::Config(e)) => {
                tracing::error!("invalid configuration {}: {}", config_path, e);
                std::process::exit(1);
            }
            Err(BootstrapError::Coordination(e)) => {
                tracing::error!("coordination service unreachable: {}", e);
                std::process::exit(2);
            }
        };

    tracing::info!("controller ready; reading admin commands from stdin");
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut partial_failure = false;

    while let Ok(Some(line)) = lines.next_line().await {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => {}
            ["add", count, strategy, size] => {
                let parsed = (
                    count.parse::<usize>(),
                    strategy.parse::<CacheStrategy>(),
                    size.parse::<usize>(),
                );
                match parsed {
                    (Ok(count), Ok(strategy), Ok(size)) => {
                        match controller.add_nodes(count, strategy, size).await {
                            Some(nodes) => {
                                if nodes.len() < count {
                                    partial_failure = true;
                                }
                                for node in &nodes {
                                    println!("provisioned {}", node);
                                }
                            }
                            None => {
                                partial_failure = true;
                                println!("add failed");
                            }
                        }
                    }
                    _ => println!("usage: add <count> <FIFO|LRU|LFU> <size>"),
                }
            }
            ["start"] => report("start", controller.start().await, &mut partial_failure),
            ["stop"] => report("stop", controller.stop().await, &mut partial_failure),
            ["shutdown"] => {
                report("shutdown", controller.shutdown().await, &mut partial_failure)
            }
            ["remove", rest @ ..] if !rest.is_empty() => {
                let names: Vec<String> = rest.iter().map(|s| s.to_string()).collect();
                report(
                    "remove",
                    controller.remove_nodes(&names).await,
                    &mut partial_failure,
                );
            }
            ["nodes"] => {
                for node in controller.get_nodes().values() {
                    println!("{} {:?}", node, node.status);
                }
            }
            ["locate", key] => match controller.get_node_by_key(key) {
                Ok(member) => println!("{} -> {}@{}", key, member.name, member.addr()),
                Err(e) => println!("lookup failed: {}", e),
            },
            ["quit"] | ["exit"] => break,
            _ => print_help(),
        }
    }

    std::process::exit(if partial_failure { 3 } else { 0 });
}

fn report(op: &str, ok: bool, partial_failure: &mut bool) {
    if ok {
        println!("{} ok", op);
    } else {
        *partial_failure = true;
        println!("{} reported failures; check the log", op);
    }
}

fn print_help() {
    println!("commands:");
    println!("  add <count> <FIFO|LRU|LFU> <size>");
    println!("  start | stop | shutdown");
    println!("  remove <name>...");
    println!("  nodes | locate <key>");
    println!("  quit");
}
