use be_engine::JobFilter;

use super::Context;
use crate::config::StreamArgs;
use crate::error::CliError;

pub async fn run(ctx: &Context, args: StreamArgs) -> Result<(), CliError> {
    let token = ctx.token(args.access.token.as_deref())?;
    let registry = ctx.registry(&args.output.sinks)?;
    let filter = JobFilter::new(args.job_id);

    tracing::info!(url = %ctx.config.stream_url, job_id = ?filter.job_id(), "opening stream");
    ctx.stream(&ctx.config.stream_url, &token, filter, registry).await
}
