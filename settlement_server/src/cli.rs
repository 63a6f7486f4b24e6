use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
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
    const DISPLAY_ENVS: [&str; 20] = [
        "RUST_LOG",
        "CSP_HOST",
        "CSP_PORT",
        "CSP_DATABASE_URL",
        "CSP_USE_X_FORWARDED_FOR",
        "CSP_USE_FORWARDED",
        "CSP_GATEWAY_TIMEOUT_SECS",
        "CSP_VNPAY_TMN_CODE",
        "CSP_VNPAY_PAY_URL",
        "CSP_VNPAY_RETURN_URL",
        "CSP_MOMO_PARTNER_CODE",
        "CSP_MOMO_ENDPOINT",
        "CSP_MOMO_REDIRECT_URL",
        "CSP_MOMO_IPN_URL",
        "CSP_PAYOS_CLIENT_ID",
        "CSP_PAYOS_ENDPOINT",
        "CSP_BANK_NAME",
        "CSP_BANK_BIN",
        "CSP_BANK_ACCOUNT_NUMBER",
        "CSP_BANK_ACCOUNT_NAME",
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
