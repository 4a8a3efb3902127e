mod aws;
mod cli;
mod config;
mod demo;
mod error;
mod pipeline;
mod ui;
mod waiter;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aws::{AwsClients, S3Uri};
use cli::{Cli, Command};
use config::JobwatchConfig;
use demo::SimulatedJob;
use error::JobwatchError;
use pipeline::{ProcessingPipeline, ReviewPipeline};
use ui::WaitProgress;
use waiter::{AsyncJobWaiter, WaitError, WaitPolicy};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = JobwatchConfig::load(cli.config.as_deref())?;
    if let Some(secs) = cli.interval {
        config.wait.interval_secs = secs;
    }
    if let Some(max) = cli.max_attempts {
        config.wait.max_attempts = max;
    }
    config.validate()?;

    let policy = match cli.command {
        // The demo ticks every second unless asked otherwise.
        Command::Demo { .. } => WaitPolicy::new(
            Duration::from_secs(cli.interval.unwrap_or(1)),
            config.wait.max_attempts,
        ),
        _ => config.wait.policy(),
    };
    run(cli.command, &config, AsyncJobWaiter::new(policy)).await
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,jobwatch=debug"
    } else {
        "warn,jobwatch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(command: Command, config: &JobwatchConfig, waiter: AsyncJobWaiter) -> Result<()> {
    let max = config.wait.max_attempts;

    match command {
        Command::Demo { polls, fail } => run_demo(waiter, polls, fail).await?,

        Command::Process { code, no_wait } => {
            let clients = &aws_clients(config).await;
            let pipeline =
                ProcessingPipeline::new(&clients.processing, &clients.store, config, waiter);
            if let Some(path) = &code {
                let uri = pipeline.upload_code(path).await?;
                println!("Uploaded {} to {uri}", path.display());
            }

            let spec = pipeline.submit().await?;
            if no_wait {
                ui::print_record("Submitted Processing Job", &spec);
                return Ok(());
            }

            let progress = WaitProgress::start(&spec.name, max);
            match pipeline
                .wait(&spec.name, |attempt, r| progress.poll(attempt, &r.status.to_string()))
                .await
            {
                Ok(record) => {
                    progress.success(&record.status.to_string());
                    ui::print_record("Processing Job", &record);
                }
                Err(e) => {
                    progress.failure(&e.to_string());
                    return Err(e.into());
                }
            }
        }

        Command::JobStatus { name } => {
            let clients = &aws_clients(config).await;
            let pipeline =
                ProcessingPipeline::new(&clients.processing, &clients.store, config, waiter);
            let record = pipeline.status(&name).await?;
            ui::print_record("Processing Job", &record);
        }

        Command::CreateFlow { template } => {
            let template = match &template {
                Some(path) => Some(tokio::fs::read_to_string(path).await?),
                None => None,
            };
            let clients = &aws_clients(config).await;
            let pipeline = review_pipeline(config, clients, waiter);

            let progress = WaitProgress::start("flow definition", max);
            match pipeline
                .create_flow(template.as_deref(), |attempt, r| {
                    progress.poll(attempt, &r.status.to_string())
                })
                .await
            {
                Ok(record) => {
                    progress.success(&record.status.to_string());
                    ui::print_record("Flow Definition", &record);
                    println!();
                    println!(
                        "Set review.flow_definition_arn = \"{}\" in jobwatch.toml to reuse it.",
                        record.arn.as_deref().unwrap_or_default()
                    );
                }
                Err(e) => {
                    progress.failure(&e.to_string());
                    return Err(e.into());
                }
            }
        }

        Command::Analyze {
            texts,
            threshold,
            flow_arn,
        } => {
            let flow_arn = flow_arn
                .or_else(|| config.review.flow_definition_arn.clone())
                .ok_or_else(|| {
                    JobwatchError::Config(
                        "no flow definition: pass --flow-arn or run `jobwatch create-flow`".into(),
                    )
                })?;
            let threshold = threshold.unwrap_or(config.review.confidence_threshold);
            if !(0.0..=1.0).contains(&threshold) {
                return Err(JobwatchError::Config(format!(
                    "--threshold must be within [0, 1], got {threshold}"
                ))
                .into());
            }

            let clients = &aws_clients(config).await;
            let pipeline = review_pipeline(config, clients, waiter);
            let analyzed = pipeline.analyze(&texts, &flow_arn, threshold).await?;
            ui::print_analysis(&analyzed);

            let loops: Vec<&str> = analyzed
                .iter()
                .filter_map(|a| a.human_loop.as_deref())
                .collect();
            if !loops.is_empty() {
                println!();
                println!("Wait for the reviewers with: jobwatch wait-loops {}", loops.join(" "));
            }
        }

        Command::WaitLoops { names } => {
            let clients = &aws_clients(config).await;
            let pipeline = review_pipeline(config, clients, waiter);
            for name in &names {
                let progress = WaitProgress::start(name, max);
                let record = match pipeline
                    .wait_loop(name, |attempt, r| progress.poll(attempt, &r.status.to_string()))
                    .await
                {
                    Ok(record) => {
                        progress.success(&record.status.to_string());
                        record
                    }
                    Err(e) => {
                        progress.failure(&e.to_string());
                        return Err(e.into());
                    }
                };
                let outcome = pipeline.fetch_outcome(&record).await?;
                ui::print_outcome(&outcome);
            }
        }

        Command::Preview { uri, lines } => {
            let uri: S3Uri = uri.parse().map_err(JobwatchError::from)?;
            let clients = aws_clients(config).await;
            for line in aws::storage::preview(&clients.store, &uri, lines).await? {
                println!("{line}");
            }
        }

    }

    Ok(())
}

/// Only the commands that talk to AWS resolve credentials and region.
async fn aws_clients(config: &JobwatchConfig) -> AwsClients {
    AwsClients::load(config.region.as_deref()).await
}

fn review_pipeline<'a>(
    config: &'a JobwatchConfig,
    clients: &'a AwsClients,
    waiter: AsyncJobWaiter,
) -> ReviewPipeline<'a, aws::A2iClient, aws::ComprehendClient, aws::S3Store> {
    ReviewPipeline::new(
        &clients.review,
        &clients.sentiment,
        &clients.store,
        config,
        waiter,
    )
}

async fn run_demo(waiter: AsyncJobWaiter, polls: u32, fail: bool) -> Result<()> {
    let name = pipeline::timestamped_name("demo-job", chrono::Utc::now());
    let mut job = SimulatedJob::new(name.as_str(), polls, fail);
    let progress = WaitProgress::start(&name, waiter.policy.max_attempts);

    let result = waiter
        .wait_observed(&mut job, |attempt, r| {
            progress.poll(attempt, &r.status.to_string())
        })
        .await;

    match result {
        Ok(waited) if waited.record.status.is_failure() => {
            let record = waited.record;
            let err = JobwatchError::RemoteFailure {
                name: record.name,
                status: record.status.to_string(),
                reason: record.failure_reason,
            };
            progress.failure(&err.to_string());
            Err(err.into())
        }
        Ok(waited) => {
            progress.success(&waited.record.status.to_string());
            ui::print_record("Simulated Job", &waited.record);
            println!("  {} polls in {:.1?}", waited.attempts, waited.elapsed);
            Ok(())
        }
        Err(WaitError::Timeout {
            attempts,
            last_status,
        }) => {
            let err = JobwatchError::WaitTimeout {
                name,
                status: last_status.unwrap_or_default(),
                attempts,
            };
            progress.failure(&err.to_string());
            Err(err.into())
        }
        Err(WaitError::Source(never)) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_waiter(max_attempts: u32) -> AsyncJobWaiter {
        AsyncJobWaiter::new(WaitPolicy::new(Duration::from_millis(1), max_attempts))
    }

    #[tokio::test]
    async fn demo_is_dispatched_without_aws() {
        let config = JobwatchConfig::default();
        let command = Command::Demo {
            polls: 2,
            fail: false,
        };
        run(command, &config, fast_waiter(5)).await.unwrap();
    }

    #[tokio::test]
    async fn failing_demo_reports_remote_failure() {
        let config = JobwatchConfig::default();
        let command = Command::Demo {
            polls: 1,
            fail: true,
        };
        let err = run(command, &config, fast_waiter(5)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JobwatchError>(),
            Some(JobwatchError::RemoteFailure { .. })
        ));
    }
}
