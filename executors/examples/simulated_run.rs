//! End-to-end demo: execute a plan offline.
//!
//! Builds a small diamond-shaped plan, runs it through the simulation
//! executor (no API key needed) and prints the report. Run with:
//!
//! ```sh
//! cargo run -p ragdag-executors --example simulated_run
//! ```

use anyhow::Result;
use ragdag_core::api::{EngineConfig, Plan, Processor};
use ragdag_executors::executor_from_config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // 1. Load config; with no API key this selects the simulation executor.
    let config = EngineConfig::default();
    let executor = executor_from_config(&config.llm)?;

    // 2. A plan as the upstream planner would produce it.
    let plan: Plan = serde_json::from_value(serde_json::json!({
        "goal": "Turn raw customer feedback into an action plan",
        "nodes": [
            {
                "id": "extract_themes",
                "description": "Extract main themes from the feedback",
                "inputs": [],
                "promptTemplate": "Extract key themes from:\n\n{{input}}",
                "outputType": "json"
            },
            {
                "id": "prioritize_issues",
                "description": "Prioritize issues by impact",
                "inputs": ["extract_themes"],
                "promptTemplate": "Prioritize these themes:\n{{extract_themes}}",
                "outputType": "text"
            },
            {
                "id": "summarize_findings",
                "description": "Summarize the findings",
                "inputs": ["extract_themes"],
                "promptTemplate": "Summarize:\n{{extract_themes}}",
                "outputType": "text"
            },
            {
                "id": "action_plan",
                "description": "Draft the action plan",
                "inputs": ["prioritize_issues", "summarize_findings"],
                "promptTemplate": "Combine priorities:\n{{prioritize_issues}}\n\nand summary:\n{{summarize_findings}}",
                "outputType": "text"
            }
        ],
        "finalOutput": "action_plan"
    }))?;

    // 3. Run it.
    let processor = Processor::builder()
        .executor(executor)
        .config(config)
        .build()?;

    let input = "Customers love the speed but find the navigation confusing.";
    let report = processor.run(&plan, input).await?;

    println!("goal:          {}", report.plan.goal);
    println!("batches:       {}", report.parallel_batches);
    println!("critical path: {}", report.critical_path.join(" -> "));
    println!(
        "cache:         {} hits / {} misses",
        report.caching.hits, report.caching.misses
    );
    println!("total cost:    ${:.4}", report.total_cost);
    println!();
    for m in &report.metrics {
        println!(
            "  [batch {}] {:<20} {:>4}ms  {:?}",
            m.parallel_batch, m.node_id, m.duration_ms, m.status
        );
    }
    println!();
    println!("final output:\n{}", report.final_output.content.to_text());

    Ok(())
}
