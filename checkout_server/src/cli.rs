use std::{env, env::VarError};

/// There's no real CLI for the server. Any argument prints the help text and the current configuration.
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
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 15] = [
        "RUST_LOG",
        "CPG_HOST",
        "CPG_PORT",
        "CPG_DATABASE_URL",
        "CPG_DB_MAX_CONNECTIONS",
        "CPG_CURRENCY",
        "CPG_ADMIN_EMAIL",
        "CPG_STRIPE_API_URL",
        "CPG_STRIPE_WEBHOOK_TOLERANCE",
        "CPG_ALLOW_UNSIGNED_WEBHOOKS",
        "CPG_EMAIL_API_URL",
        "CPG_EMAIL_SENDER",
        "CPG_NOTIFICATION_QUEUE_SIZE",
        "CPG_NOTIFICATION_MAX_RETRIES",
        "CPG_NOTIFICATION_BACKOFF_MS",
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
