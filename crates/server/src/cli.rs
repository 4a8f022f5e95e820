use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[clap(name = "salus server")]
pub struct Cli {
    #[clap(long, env, default_value = "salus.db")]
    pub sqlite_connection_string: String,
    #[clap(long, env, default_value = "5000")]
    pub port: u16,
    #[clap(long, env, default_value = "127.0.0.1")]
    pub bind_addr: String,
    /// Origin allowed to make cross origin requests, `*` allows any
    #[arg(long, env, default_value = "*")]
    pub cors_origin: String,
    /// Largest request body accepted by the table conversion endpoint
    #[arg(long, env, default_value = "1048576")]
    pub table_body_limit_bytes: usize,
}
