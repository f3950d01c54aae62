use std::time::Duration;

use be_engine::{JobClient, JobFilter, JobRequest, parse_modules, parse_targets};

use super::Context;
use crate::config::CreateJobArgs;
use crate::error::CliError;

pub async fn run(ctx: &Context, args: CreateJobArgs) -> Result<(), CliError> {
    let token = ctx.token(args.access.token.as_deref())?;
    let targets = parse_targets(&args.targets)?;
    // A bad `--sink` must fail before any job is created.
    let registry = if args.redirect {
        Some(ctx.registry(&args.output.sinks)?)
    } else {
        None
    };

    let request = JobRequest::scan(
        args.job_type,
        args.port,
        args.sample,
        parse_modules(&args.modules),
        targets,
    );
    let client = JobClient::new(
        ctx.config.job_url.as_str(),
        Duration::from_secs(ctx.config.connect_timeout_secs),
    )?;
    let job = client.submit(&token, &request, ctx.verbose).await?;

    match registry {
        Some(registry) => {
            tracing::info!(url = %ctx.config.stream_url, job_id = %job.job_id, "redirecting to stream");
            let filter = JobFilter::new(Some(job.job_id));
            ctx.stream(&ctx.config.stream_url, &token, filter, registry).await
        }
        None => {
            println!("You can connect to your stream with: {}", job.stream_url);
            println!("The identifier of the job is: {}", job.job_id);
            Ok(())
        }
    }
}
