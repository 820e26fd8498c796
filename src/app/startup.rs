//! Application startup: arguments, configuration, logging, then the route

use crate::app::cli::args::Args;
use crate::app::cli::config::RouteSettings;
use crate::app::route::{run_route, RouteSummary};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::exchange::{processor_fn, Exchange, Processor};
use clap::Parser;
use std::sync::Arc;

/// Initialize application startup
pub fn startup() {
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: could not start the async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let exit_code = runtime.block_on(run(args));
    std::process::exit(exit_code);
}

async fn run(args: Args) -> i32 {
    let (mut settings, config_path) = match RouteSettings::load(args.config_file.as_deref()).await {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Err(e) = settings.apply_args(&args).and_then(|()| settings.validate()) {
        eprintln!("Error: {}", e);
        return 1;
    }

    let log_file = settings
        .effective_log_file()
        .map(|path| path.to_string_lossy().to_string());
    if let Err(e) = init_logging(
        settings.log_level.as_deref(),
        settings.log_format.as_deref(),
        log_file.as_deref(),
        args.use_color(settings.color),
    ) {
        eprintln!("Error: could not initialise logging: {}", e);
        return 1;
    }

    log::info!(
        "seqroute {} starting route '{}'",
        env!("CARGO_PKG_VERSION"),
        settings.route.name
    );
    match &config_path {
        Some(path) => log::debug!("Configuration loaded from {}", path.display()),
        None => log::debug!("No configuration file; using defaults and command line"),
    }
    log::debug!("Route settings: {:?}", settings);

    let result = ShutdownCoordinator::guard_with_coordinator(
        |coordinator, _shutdown_rx| async move {
            let flag = coordinator.flag();
            let sink = console_sink(settings.resequencer.sequence_header.clone());
            tokio::task::spawn_blocking(move || run_route(&settings, sink, flag)).await
        },
    )
    .await;

    match result {
        Ok(Ok(summary)) => {
            print_trace(&summary);
            if summary.interrupted {
                130
            } else {
                0
            }
        }
        Ok(Err(e)) => {
            log_error_with_context(&e, "Route failed");
            1
        }
        Err(e) => {
            log::error!("FATAL: route thread panicked: {}", e);
            1
        }
    }
}

/// Sink printing `<seq>\t<body>` for each exchange in delivery order
fn console_sink(header: String) -> Arc<dyn Processor<Exchange>> {
    Arc::new(processor_fn(move |exchange: Exchange| {
        println!(
            "{}\t{}",
            exchange.header(&header).unwrap_or("-"),
            exchange.body
        );
        Ok(())
    }))
}

fn print_trace(summary: &RouteSummary) {
    for event in &summary.trace {
        println!("{}", event.to_json());
    }
}
