use crate::args::SubCommands;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::util::SubscriberInitExt;

mod args;
mod config;
mod trace;

fn main() -> eyre::Result<()> {
    // We don't care if it can't find a .env file
    let _ = dotenv::dotenv();

    color_eyre::install()?;
    let args = args::ClapArgs::parse();
    trace::create_subscriber("WARN,nlu=INFO,nlu_ml=INFO").init();
    let conf = Arc::new(config::initialise_config(&args.config)?);

    let now = std::time::Instant::now();

    match args.commands {
        SubCommands::Inspect(inspect) => {
            inspect.run(conf)?;
        }
        SubCommands::Classify(classify) => {
            classify.run(conf)?;
        }
        SubCommands::Tag(tag) => {
            tag.run(conf)?;
        }
    }

    tracing::debug!("Runtime: {:.2?}", now.elapsed());

    Ok(())
}
