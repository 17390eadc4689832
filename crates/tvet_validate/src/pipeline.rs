//! Sequential tool execution with per-tool timeouts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::ToolResult;
use crate::result::ValidationResult;
use crate::tools;

/// A pluggable validation step.
///
/// Implementations must be cheap to share; the pipeline holds them behind
/// `Arc` and may run the same tool across concurrent remediation runs.
#[async_trait]
pub trait ValidationTool: Send + Sync {
    fn name(&self) -> &str;

    /// Validate the document text. Errors are converted by the pipeline
    /// into synthetic failed results, never propagated.
    async fn run(&self, text: &str) -> ToolResult<ValidationResult>;
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound for a single tool invocation.
    pub tool_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tool_timeout: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    pub fn with_timeout(mut self, tool_timeout: Duration) -> Self {
        self.tool_timeout = tool_timeout;
        self
    }
}

/// Runs registered tools strictly in registration order.
///
/// The pipeline always returns one result per tool: a timeout or tool error
/// yields a synthetic failed result instead of aborting the pass.
#[derive(Clone)]
pub struct ValidationPipeline {
    tools: Vec<Arc<dyn ValidationTool>>,
    config: PipelineConfig,
}

impl ValidationPipeline {
    /// An empty pipeline; register tools before running.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            tools: Vec::new(),
            config,
        }
    }

    /// The built-in tool sequence: syntax, format, plan, lint, security.
    pub fn standard() -> Self {
        Self::standard_with_config(PipelineConfig::default())
    }

    /// The built-in tool sequence with a custom configuration.
    pub fn standard_with_config(config: PipelineConfig) -> Self {
        Self::new(config)
            .with_tool(Arc::new(tools::SyntaxTool))
            .with_tool(Arc::new(tools::FormatTool))
            .with_tool(Arc::new(tools::PlanTool))
            .with_tool(Arc::new(tools::LintTool))
            .with_tool(Arc::new(tools::SecurityTool))
    }

    pub fn with_tool(mut self, tool: Arc<dyn ValidationTool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn register(&mut self, tool: Arc<dyn ValidationTool>) {
        self.tools.push(tool);
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Runs every tool against the text. Never fails.
    pub async fn run(&self, text: &str) -> Vec<ValidationResult> {
        let mut results = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            info!(tool = tool.name(), "running validation tool");
            let started = Instant::now();
            let outcome = timeout(self.config.tool_timeout, tool.run(text)).await;
            let elapsed = started.elapsed().as_secs_f64();

            let result = match outcome {
                Ok(Ok(result)) => result.with_duration(elapsed),
                Ok(Err(error)) => {
                    warn!(tool = tool.name(), %error, "validation tool failed");
                    ValidationResult::failed(tool.name())
                        .with_error(format!("Tool execution failed: {error}"))
                        .with_duration(elapsed)
                }
                Err(_) => {
                    warn!(
                        tool = tool.name(),
                        timeout_seconds = self.config.tool_timeout.as_secs_f64(),
                        "validation tool timed out"
                    );
                    ValidationResult::failed(tool.name())
                        .with_error(format!(
                            "Tool execution failed: timed out after {:.0}s",
                            self.config.tool_timeout.as_secs_f64()
                        ))
                        .with_duration(elapsed)
                }
            };

            info!(
                tool = %result.tool,
                passed = result.passed,
                "validation tool completed"
            );
            results.push(result);
        }
        results
    }
}
