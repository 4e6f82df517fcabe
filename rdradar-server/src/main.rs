use clap::Parser;
use log::info;
use miette::{IntoDiagnostic, Result};
use rdradar_core::{formats, FrameSynchronizer};
use rdradar_server::{config, pipeline::Pipeline, source::ByteSource, Cli, Session, VERSION};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

mod web;

use web::Web;

/// Chunks buffered between the byte source and the pipeline
const CHUNK_QUEUE_DEPTH: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    if args.list_formats {
        for name in formats::names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let user_dir = config::formats_dir();
    let format = config::resolve_format(
        &args.format,
        args.format_file.as_deref(),
        user_dir.as_deref(),
    )
    .into_diagnostic()?;

    if let Some(path) = &args.save_format {
        config::save_format_file(path, format.config()).into_diagnostic()?;
        info!("Wrote format '{}' to {}", format.name(), path.display());
        return Ok(());
    }

    let sync = FrameSynchronizer::new(format.clone(), args.sync_config()).into_diagnostic()?;

    info!("rdradar-server {} using format '{}'", VERSION, format.name());

    Toplevel::new(move |s| async move {
        let session = Session::new(args.clone(), format.config().clone());
        let (tx, rx) = mpsc::channel(CHUNK_QUEUE_DEPTH);

        let source = ByteSource::from_args(&args);
        s.start(SubsystemBuilder::new("Source", move |subsys| {
            source.run(subsys, tx)
        }));

        let pipeline = Pipeline::new(session.clone(), sync, rx);
        s.start(SubsystemBuilder::new("Pipeline", move |subsys| {
            pipeline.run(subsys)
        }));

        if args.port.is_some() {
            let web = Web::new(session);
            s.start(SubsystemBuilder::new("Web", |subsys| web.run(subsys)));
        }
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(5))
    .await
    .map_err(Into::into)
}
