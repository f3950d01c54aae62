use be_engine::JobFilter;

use super::Context;
use crate::config::FirehoseArgs;
use crate::error::CliError;

pub async fn run(ctx: &Context, args: FirehoseArgs) -> Result<(), CliError> {
    let token = ctx.token(args.access.token.as_deref())?;
    let registry = ctx.registry(&args.output.sinks)?;

    tracing::info!(url = %ctx.config.firehose_url, "opening firehose");
    ctx.stream(&ctx.config.firehose_url, &token, JobFilter::none(), registry)
        .await
}
