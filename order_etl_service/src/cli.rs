use std::{env, env::VarError};

/// There's no real CLI for the service, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // CLICKHOUSE_PASSWORD is deliberately absent
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "ETL_DATA_DIR",
        "ETL_FILE_PATTERN",
        "ETL_BATCH_SIZE",
        "ETL_QUEUE_CAPACITY",
        "ETL_QUEUE_POLL_MS",
        "ETL_WATCH_RETRIES",
        "ETL_WATCH_RETRY_DELAY_MS",
        "ETL_WATCH",
        "CLICKHOUSE_HOST",
        "CLICKHOUSE_PORT",
        "CLICKHOUSE_USER",
        "CLICKHOUSE_DATABASE",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
