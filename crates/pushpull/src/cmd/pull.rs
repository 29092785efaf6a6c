use std::path::Path;

use pushpull_relay::{pull, CancelToken, ReceiveOptions, SinkEvent, StopReason};
use pushpull_transport::{Role, TransportContext};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, PullArgs};
use crate::config::{resolve_policy, resolve_transform, FileConfig, RelaySettings};
use crate::exit::{relay_error, transport_error, CliResult, INTERRUPTED, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: PullArgs, format: OutputFormat, config: Option<&Path>) -> CliResult<i32> {
    let file = FileConfig::load(config)?;
    let settings = RelaySettings::resolve(&args.relay, &file, Role::Active)?;
    let policy = resolve_policy(args.fail_fast, &file)?;
    let transform = resolve_transform(&args.transform, &file)?.reversed();

    let cancel = CancelToken::new();
    install_ctrlc_handler(cancel.clone())?;

    let ctx = TransportContext::with_config(settings.transport.clone());
    let channel = ctx
        .establish(settings.role, &settings.endpoint, &cancel)
        .map_err(|err| transport_error("establish failed", err))?;

    info!(
        endpoint = %settings.endpoint,
        role = %settings.role,
        mode = %settings.mode,
        ?policy,
        transforms = ?transform.names(),
        "pulling messages"
    );
    let mode = settings.mode;
    let options = ReceiveOptions::with_policy(policy)
        .with_limit(args.count)
        .with_transform(transform);
    let mut sink = |event: SinkEvent| print_event(&event, mode, format);
    let report = pull(
        channel,
        mode,
        settings.frame.clone(),
        options,
        &mut sink,
        &cancel,
    )
    .map_err(|err| relay_error("receive failed", err))?;
    ctx.shutdown();

    match report.stop {
        StopReason::Interrupted => Ok(INTERRUPTED),
        StopReason::EndOfStream | StopReason::Limit => Ok(SUCCESS),
    }
}
