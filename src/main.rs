use bamctl::api::BamClient;
use bamctl::classify::{ObjectKind, Scope};
use bamctl::commands::{self, RoleServers, Summary};
use bamctl::config::BamConfig;
use bamctl::error::{ConfigError, Result};
use bamctl::input::InputSource;
use bamctl::{BamApi, servers};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// DNS/DHCP bulk operations against BlueCat Address Manager
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

/// Settings that override the TOML file and `BLUECAT_*` environment
#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Address Manager hostname
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// API user name
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// API password
    #[arg(short, long, global = true)]
    password: Option<String>,

    /// Configuration name
    #[arg(long = "cfg", visible_alias = "configuration", global = true)]
    configuration: Option<String>,

    /// DNS View name, needed for zone names
    #[arg(long, global = true)]
    view: Option<String>,

    /// TOML settings file
    #[arg(long = "config", global = true)]
    config_file: Option<PathBuf>,

    /// Log level (DEBUG, INFO, WARNING, ERROR, CRITICAL or a number)
    #[arg(short, long, global = true)]
    logging: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Retries for read calls after a transport failure
    #[arg(long, global = true)]
    retries: Option<u32>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    no_verify_tls: bool,

    /// Use plain HTTP instead of HTTPS
    #[arg(long, global = true)]
    http: bool,
}

impl ConnectionArgs {
    /// Defaults, then the settings file, then the environment, then these flags
    fn load_config(&self) -> std::result::Result<BamConfig, ConfigError> {
        let mut config = BamConfig::load(self.config_file.as_deref())?;

        if let Some(server) = &self.server {
            config.server = Some(server.clone());
        }
        if let Some(username) = &self.username {
            config.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(configuration) = &self.configuration {
            config.configuration = Some(configuration.clone());
        }
        if let Some(view) = &self.view {
            config.view = Some(view.clone());
        }
        if let Some(logging) = &self.logging {
            config.logging = logging.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout = Duration::from_secs(timeout);
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if self.no_verify_tls {
            config.verify_tls = false;
        }
        if self.http {
            config.use_https = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete every DHCP range in the listed networks
    DeleteDhcpRanges {
        /// CIDR, zone name, file of them, or `-` for stdin (the default)
        input: Option<String>,

        /// List the ranges without deleting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the lease-time options of addresses, networks, blocks or ranges
    GetLeaseTime {
        /// Entity id, IP, CIDR, start-end range, file of them, or `-`
        object: String,

        /// Only options deployed to this DHCP server
        #[arg(long)]
        dhcpserver: Option<String>,

        /// Treat the identifier as this type
        #[arg(long = "type")]
        kind: Option<ObjectKind>,
    },

    /// Set the lease-time options where they are not already set
    AddLeaseTime {
        /// Entity id, IP, CIDR, start-end range, file of them, or `-`
        object: String,

        /// Lease time in seconds
        lease_time: u32,

        /// Scope the options to this DHCP server
        #[arg(long)]
        dhcpserver: Option<String>,

        /// Treat the identifier as this type
        #[arg(long = "type")]
        kind: Option<ObjectKind>,
    },

    /// Replace the DHCP deployment roles of the listed networks
    ReplaceDhcpRole {
        /// Primary DHCP server name
        primary: String,

        /// Failover DHCP server name
        failover: Option<String>,

        /// File of CIDRs or IPs, `-` or absent for stdin
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.connection.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|e| {
        eprintln!("Invalid log level {:?}: {}", config.logging, e);
        EnvFilter::new("warn")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    debug!("Loaded configuration: {:?}", config);

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(command: Command, config: &BamConfig) -> Result<()> {
    let client = BamClient::login(config).await?;
    let result = execute(&client, command, config).await;

    if let Err(e) = client.logout().await {
        warn!("Logout failed: {}", e);
    }

    let summary = result?;
    info!(
        "{} lines: {} processed, {} not found, {} invalid",
        summary.total(),
        summary.processed,
        summary.not_found,
        summary.invalid
    );
    Ok(())
}

async fn execute<A>(api: &A, command: Command, config: &BamConfig) -> Result<Summary>
where
    A: BamApi + ?Sized,
{
    let configuration = config
        .configuration
        .as_deref()
        .ok_or(ConfigError::Missing("configuration"))?;
    let scope = Scope::resolve(api, configuration, config.view.as_deref()).await?;

    let mut out = std::io::stdout().lock();
    let summary = match command {
        Command::DeleteDhcpRanges { input, dry_run } => {
            let source = input
                .as_deref()
                .map_or(InputSource::Stdin, InputSource::for_argument);
            let mut reader = source.open().await?;
            commands::delete_dhcp_ranges(api, &scope, &mut reader, &mut out, dry_run).await?
        }
        Command::GetLeaseTime {
            object,
            dhcpserver,
            kind,
        } => {
            let server_id = match dhcpserver {
                Some(name) => {
                    Some(servers::find_server_id(api, &name, scope.configuration_id).await?)
                }
                None => None,
            };
            let mut reader = InputSource::for_argument(&object).open().await?;
            commands::get_lease_times(api, &scope, &mut reader, kind, server_id, &mut out).await?
        }
        Command::AddLeaseTime {
            object,
            lease_time,
            dhcpserver,
            kind,
        } => {
            let server_id = match dhcpserver {
                Some(name) => {
                    Some(servers::find_server_id(api, &name, scope.configuration_id).await?)
                }
                None => None,
            };
            let mut reader = InputSource::for_argument(&object).open().await?;
            commands::add_lease_times(
                api,
                &scope,
                &mut reader,
                kind,
                server_id,
                &lease_time.to_string(),
                &mut out,
            )
            .await?
        }
        Command::ReplaceDhcpRole {
            primary,
            failover,
            input,
        } => {
            let primary_interface =
                servers::find_interface_id(api, &primary, scope.configuration_id).await?;
            let failover_interface = match failover {
                Some(name) => {
                    Some(servers::find_interface_id(api, &name, scope.configuration_id).await?)
                }
                None => None,
            };
            let role_servers = RoleServers {
                primary_interface,
                failover_interface,
            };
            debug!("DHCP role servers: {:?}", role_servers);

            let mut reader = InputSource::for_path(input.as_deref()).open().await?;
            commands::replace_dhcp_roles(api, &scope, role_servers, &mut reader, &mut out).await?
        }
    };

    out.flush()?;
    Ok(summary)
}
