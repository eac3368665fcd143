use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use swarm_pso::coordinator::CoordinatorHandle;
use swarm_pso::core::config::SwarmSettings;
use swarm_pso::core::domain::DomainSpec;
use swarm_pso::core::record::NullSink;
use swarm_pso::core::swarm::{Swarm, SwarmStatus};
use swarm_pso::results::JsonResultsLog;

fn usage() -> ! {
    eprintln!("Usage: swarm_pso_server <bind_addr> [settings_path] [results_path]");
    eprintln!("       swarm_pso_server --rosenbrock [settings_path]");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  swarm_pso_server 0.0.0.0:5005 settings.json results.json");
    eprintln!("  swarm_pso_server --rosenbrock");
    std::process::exit(2);
}

fn load_settings(path: Option<PathBuf>) -> Result<SwarmSettings, String> {
    let Some(path) = path else {
        return Ok(SwarmSettings::default());
    };
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("cannot parse {}: {e}", path.display()))
}

/// Self-contained Rosenbrock session; no workers, no network.
fn run_rosenbrock(settings: SwarmSettings) -> Result<(), String> {
    let mut swarm = Swarm::new(settings, DomainSpec::rosenbrock(), Box::new(NullSink))
        .map_err(|e| e.to_string())?;
    swarm.solve_locally().map_err(|e| e.to_string())?;
    info!(
        best = ?swarm.global_best(),
        fitness = swarm.global_best_fitness(),
        "rosenbrock session finished"
    );
    println!(
        "best {:?} fitness {}",
        swarm.global_best(),
        swarm.global_best_fitness()
    );
    Ok(())
}

async fn run_server(
    bind_addr: String,
    settings: SwarmSettings,
    results_path: PathBuf,
) -> Result<(), String> {
    let sink = JsonResultsLog::create(&results_path);
    let handle = CoordinatorHandle::spawn(
        settings,
        DomainSpec::robot_calibration(),
        Box::new(sink),
    )
    .map_err(|e| e.to_string())?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("cannot bind {bind_addr}: {e}"))?;

    let server = {
        let handle = Arc::new(handle.clone());
        tokio::spawn(swarm_pso::net::server::serve(listener, handle))
    };

    // Stay up until every generation has run; late pollers still get the
    // completion message through the serve task until we exit.
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let snapshot = handle.snapshot().await.map_err(|e| e.to_string())?;
        if snapshot.status == SwarmStatus::Completed {
            info!(
                generation = snapshot.generation,
                best = ?snapshot.global_best,
                fitness = snapshot.global_best_fitness,
                results = %results_path.display(),
                "optimization complete"
            );
            server.abort();
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let mut args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
    }

    let outcome = if args[0] == "--rosenbrock" {
        args.remove(0);
        let settings_path = (!args.is_empty()).then(|| PathBuf::from(args.remove(0)));
        if !args.is_empty() {
            usage();
        }
        load_settings(settings_path).and_then(run_rosenbrock)
    } else {
        let bind_addr = args.remove(0);
        let settings_path = (!args.is_empty()).then(|| PathBuf::from(args.remove(0)));
        let results_path = if args.is_empty() {
            PathBuf::from("results.json")
        } else {
            PathBuf::from(args.remove(0))
        };
        if !args.is_empty() {
            usage();
        }
        match load_settings(settings_path) {
            Ok(settings) => run_server(bind_addr, settings, results_path).await,
            Err(e) => Err(e),
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
