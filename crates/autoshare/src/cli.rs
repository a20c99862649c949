//! Command-line interface definition.

use autoshare_core::config::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SUBDOMAIN_LENGTH};
use autoshare_core::record::AUTOMATIC_TTL;
use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Share a local directory over HTTP behind an auto-provisioned DNS name
#[derive(Parser, Debug)]
#[command(name = "autoshare", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AUTOSHARE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage DNS records directly
    Dns {
        #[command(subcommand)]
        command: DnsCommand,
    },
    /// Serve a directory, publishing it under a temporary subdomain
    Serve(ServeArgs),
}

#[derive(Subcommand, Debug)]
pub enum DnsCommand {
    /// Create an A record for this host
    Create(CreateArgs),
    /// List records in the zone
    List(ListArgs),
    /// Delete a record by id
    Delete(DeleteArgs),
}

/// How the address to publish is chosen
#[derive(Args, Debug, Clone)]
pub struct AddressArgs {
    /// Publish this IP instead of detecting one
    #[arg(long)]
    pub ip: Option<IpAddr>,

    /// Use the local interface address instead of the public one
    #[arg(long, conflicts_with = "ip")]
    pub local_ip: bool,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub address: AddressArgs,

    /// Subdomain label (random when omitted)
    #[arg(long)]
    pub subdomain: Option<String>,

    /// Length of the random subdomain
    #[arg(long, default_value_t = DEFAULT_SUBDOMAIN_LENGTH)]
    pub length: usize,

    /// Create the record without the Cloudflare proxy
    #[arg(long)]
    pub no_proxied: bool,

    /// Record TTL in seconds (1 = automatic)
    #[arg(long, default_value_t = AUTOMATIC_TTL)]
    pub ttl: u32,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show every record, not only the ones this tool created
    #[arg(long)]
    pub all: bool,

    /// Only records with this exact name
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Record identifier
    pub record_id: String,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Directory to serve
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Port to listen on (0 = any free port)
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Answer directory requests without index.html with 403
    #[arg(short = 'n', long)]
    pub no_directory_listing: bool,

    /// Subdomain label (random when omitted)
    #[arg(short, long)]
    pub subdomain: Option<String>,

    /// Length of the random subdomain
    #[arg(long, default_value_t = DEFAULT_SUBDOMAIN_LENGTH)]
    pub length: usize,

    #[command(flatten)]
    pub address: AddressArgs,

    /// Record TTL in seconds (1 = automatic)
    #[arg(long, default_value_t = AUTOMATIC_TTL)]
    pub ttl: u32,

    /// Serve only, without creating a DNS record
    #[arg(long)]
    pub no_dns: bool,

    /// Create the record without the Cloudflare proxy
    #[arg(long)]
    pub no_proxy: bool,
}
