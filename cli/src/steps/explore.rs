use super::ScanContext;
use crate::{
    pipeline::{Step, StepFlow},
    services::explorer,
    utils::Logger,
};
use anyhow::Context;

/// Serve the report in the browser until Ctrl+C
pub struct LaunchExplorer {
    logger: Logger,
}

impl LaunchExplorer {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("LAUNCH_EXPLORER"),
        }
    }
}

impl Default for LaunchExplorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Step<ScanContext> for LaunchExplorer {
    fn name(&self) -> &'static str {
        "LAUNCH_EXPLORER"
    }

    async fn run(&mut self, context: &mut ScanContext) -> anyhow::Result<StepFlow> {
        if !context.options.explore {
            return Ok(StepFlow::Halt("explorer disabled".to_string()));
        }

        let report = context
            .report
            .clone()
            .context("no report to explore; ANALYZE_STOCKS must run first")?;

        self.logger.info(&format!("Exploring {} rows", report.rows.len()));
        explorer::serve(report, context.options.port, context.options.open_browser)
            .await
            .context("explorer server failed")?;
        Ok(StepFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::steps::ScanOptions;

    #[tokio::test]
    async fn test_disabled_explorer_halts() {
        let options = ScanOptions {
            explore: false,
            ..ScanOptions::default()
        };
        let mut context = ScanContext::new(options, Settings::default());
        let flow = LaunchExplorer::new().run(&mut context).await.unwrap();
        assert_eq!(flow, StepFlow::Halt("explorer disabled".to_string()));
    }

    #[tokio::test]
    async fn test_explorer_requires_report() {
        let mut context = ScanContext::new(ScanOptions::default(), Settings::default());
        assert!(LaunchExplorer::new().run(&mut context).await.is_err());
    }
}
