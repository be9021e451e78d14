use crate::{config::BotConfig, context::TradingContext, steps::bot_pipeline};
use marketscan::pipeline::PipelineOutcome;
use tracing::{error, info, instrument};

/// Run the bot pipeline every `config.wait`, or once with `--run-once`.
///
/// A failed run is logged and retried on the next tick; with `--run-once` the
/// error is returned so it becomes the exit status.
#[instrument(skip(config), fields(market = %config.market_symbol(), time_frame = %config.time_frame))]
pub async fn run(config: BotConfig) -> anyhow::Result<()> {
    let mut pipeline = bot_pipeline(&config);
    info!(
        steps = pipeline.step_names().len(),
        trade = config.trade,
        dry_run = config.dry_run,
        "Starting strat bot"
    );

    loop {
        let mut context = TradingContext::new(config.clone());
        match pipeline.run(&mut context).await {
            Ok(PipelineOutcome::Completed { steps_run }) => {
                info!(steps_run, signal = %context.signal, "Run completed");
            }
            Ok(PipelineOutcome::Halted { step, reason }) => {
                info!(step, %reason, "Run stopped early");
            }
            Err(e) if config.run_once => return Err(e),
            Err(e) => {
                error!("Run failed: {:#}", e);
            }
        }

        if config.run_once {
            break;
        }

        let stats = pipeline.stats();
        info!(
            runs = stats.run_count,
            "Next run in {} minutes (Ctrl+C to stop)",
            config.wait.as_secs() / 60
        );
        tokio::select! {
            _ = tokio::time::sleep(config.wait) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}
