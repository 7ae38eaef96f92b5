use std::sync::{Arc, Mutex};
use tokio::time::{self, Duration};
use tracing::{error, info};

use shop_loadtest::client::{build_client, HttpClient, ShopClient};
use shop_loadtest::config::Config;
use shop_loadtest::logging::init_logging;
use shop_loadtest::metrics::{gather_metrics_string, register_metrics, start_metrics_server};
use shop_loadtest::profiles::{allocate_profiles, task_trees};
use shop_loadtest::selector::WeightedTaskSelector;
use shop_loadtest::user::{run_virtual_user, start_delay_for, UserSummary, VirtualUserConfig};

/// Prints helpful configuration documentation.
fn print_config_help() {
    eprintln!("Required environment variables:");
    eprintln!(
        "  TARGET_URL              - Base URL of the shop front end (must start with http:// or https://)"
    );
    eprintln!();
    eprintln!("Optional environment variables:");
    eprintln!("  CONFIG_FILE             - YAML config file; environment variables override it");
    eprintln!("  NUM_USERS               - Number of virtual users (default: 10, must be > 0)");
    eprintln!("  SPAWN_RATE              - Users started per second (default: 0 = all at once)");
    eprintln!(
        "  USER_PROFILES           - Profile mix, e.g. web=3,api=1 (default: web=1,api=1,errorhandling=1)"
    );
    eprintln!("  TEST_DURATION           - Total test duration: 10m, 2h, 1d (default: 2h)");
    eprintln!("  MIN_WAIT / MAX_WAIT     - Pause between tasks (default: 3000ms / 15000ms)");
    eprintln!(
        "  CHECKOUT_TOTAL_THRESHOLD - Basket total above which a 406 on checkout is expected (default: 100)"
    );
    eprintln!();
    eprintln!("HTTP configuration:");
    eprintln!("  REQUEST_TIMEOUT         - Per-request timeout (default: 30s)");
    eprintln!("  SKIP_TLS_VERIFY         - Skip TLS certificate verification (default: false)");
    eprintln!("  CUSTOM_HEADERS          - Comma-separated headers (use \\, for literal commas)");
    eprintln!();
    eprintln!("Observability:");
    eprintln!("  METRICS_PORT            - Prometheus endpoint port, 0 disables (default: 9090)");
    eprintln!("  METRIC_NAMESPACE        - Prometheus metric namespace (default: shop_loadtest)");
    eprintln!("  LOG_FORMAT              - text or json (default: text)");
    eprintln!("  LOG_LEVEL               - Log filter, overridden by RUST_LOG (default: info)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration from environment variables and the optional YAML file
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}\n", e);
            print_config_help();
            std::process::exit(1);
        }
    };

    init_logging(config.log_format, &config.log_level);

    // Task trees are validated once; a bad weight stops the run before any user starts
    let trees = match task_trees(&config.weight_overrides) {
        Ok(trees) => trees,
        Err(e) => {
            eprintln!("Configuration error: {}\n", e);
            std::process::exit(1);
        }
    };
    let allocation = allocate_profiles(&config.user_profiles, config.num_users)?;

    config.print_summary();
    for (profile, count) in config.profile_counts(&allocation) {
        info!(profile = %profile, users = count, "Profile allocation");
    }

    register_metrics()?;
    let registry_arc = Arc::new(Mutex::new(prometheus::default_registry().clone()));

    if config.metrics_port != 0 {
        let registry = registry_arc.clone();
        let metrics_port = config.metrics_port;
        tokio::spawn(async move {
            start_metrics_server(metrics_port, registry).await;
        });
    }

    let client_config = config.to_client_config();
    let start_time = time::Instant::now();

    let mut handles = Vec::with_capacity(allocation.len());
    for (user_id, profile) in allocation.into_iter().enumerate() {
        let tree = match trees.get(&profile) {
            Some(tree) => tree.clone(),
            None => {
                error!(profile = %profile, "No task tree for profile");
                continue;
            }
        };

        // Each user gets its own client so cookie jars never mix
        let http: Arc<dyn HttpClient> = Arc::new(ShopClient::new(
            config.target_url.clone(),
            build_client(&client_config)?,
        ));

        let user_config = VirtualUserConfig {
            user_id,
            profile,
            selector: WeightedTaskSelector::new(tree)?,
            http,
            policy: config.tolerance,
            wait: config.wait,
            test_duration: config.test_duration,
            start_delay: start_delay_for(user_id, config.spawn_rate, config.test_duration),
            seed: None,
        };

        handles.push(tokio::spawn(run_virtual_user(user_config, start_time)));
    }

    let mut totals = UserSummary::default();
    for handle in handles {
        match handle.await {
            Ok(summary) => totals.merge(&summary),
            Err(e) => error!(error = %e, "Virtual user task panicked"),
        }
    }

    info!(
        actions = totals.actions,
        succeeded = totals.succeeded,
        tolerated = totals.tolerated,
        failed = totals.failed,
        elapsed_secs = start_time.elapsed().as_secs(),
        "Test duration completed"
    );

    // Brief pause to allow in-flight metrics to be updated
    tokio::time::sleep(Duration::from_secs(2)).await;
    println!("Collecting and printing final metrics...");

    let final_metrics_output = gather_metrics_string(&registry_arc);
    println!("\n--- FINAL METRICS ---\n{}", final_metrics_output);
    println!("--- END OF FINAL METRICS ---\n");

    Ok(())
}
