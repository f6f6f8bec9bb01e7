use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use vigil_config::ConfigLoader;
use vigil_processor::{
    build_notify_manager, init_logging, stop_on, wait_for_shutdown, Processor, ProcessorExit,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Vigil monitoring event processor")]
struct Args {
    /// 配置文件路径
    #[arg(long, default_value = "vigil.toml")]
    config: PathBuf,

    /// 队列清空后退出
    #[arg(long)]
    exit_on_queue_empty: bool,

    /// 打印默认配置后退出
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", ConfigLoader::default_toml()?);
        return Ok(());
    }

    let mut config = ConfigLoader::new(&args.config).load()?;
    if args.exit_on_queue_empty {
        config.processor.exit_on_queue_empty = true;
    }

    init_logging(&config.logging)?;
    info!(config = %args.config.display(), "Starting vigil-processor");

    let store = vigil_core::open(&config.store.url).await?;
    let notify = Arc::new(build_notify_manager(&config.notifiers).await);
    let processor = Processor::new(store, &config, notify)?;

    let _signals = stop_on(wait_for_shutdown(), processor.stop_handle());

    match processor.run().await? {
        ProcessorExit::Stopped => info!(instance = %processor.instance_id(), "Processor stopped"),
        ProcessorExit::QueueEmpty => {
            info!(instance = %processor.instance_id(), "Queue drained, exiting")
        }
    }
    Ok(())
}
