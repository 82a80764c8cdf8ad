use std::net::SocketAddr;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("stockroom-api")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .help("Address to listen on")
                .default_value("0.0.0.0:8080")
                .env("STOCKROOM_BIND")
                .value_parser(clap::value_parser!(SocketAddr)),
        )
        .arg(
            Arg::new("jwt-secret")
                .long("jwt-secret")
                .help("HS256 signing secret for bearer tokens")
                .long_help(
                    "HS256 signing secret for bearer tokens. When absent an insecure development secret is used and a warning is logged.",
                )
                .env("STOCKROOM_JWT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("token-ttl-hours")
                .long("token-ttl-hours")
                .help("Lifetime of issued tokens, in hours")
                .default_value("24")
                .env("STOCKROOM_TOKEN_TTL_HOURS")
                .value_parser(clap::value_parser!(i64).range(1..=24 * 365)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Postgres connection string; in-memory stores are used when absent")
                .env("STOCKROOM_DSN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("argon2-memory-kib")
                .long("argon2-memory-kib")
                .help("Argon2 memory cost in KiB")
                .env("STOCKROOM_ARGON2_MEMORY_KIB")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("argon2-iterations")
                .long("argon2-iterations")
                .help("Argon2 iteration count")
                .env("STOCKROOM_ARGON2_ITERATIONS")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .help("Log output format")
                .default_value("json")
                .env("STOCKROOM_LOG_FORMAT")
                .value_parser(["json", "pretty"]),
        )
}
