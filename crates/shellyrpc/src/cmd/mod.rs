use std::future::Future;
use std::time::Duration;

use clap::{Args, Subcommand};
use shellyrpc::{Client, ClientConfig};

use crate::exit::{io_error, session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod call;
pub mod info;
pub mod methods;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Call an RPC method and print its result.
    Call(CallArgs),
    /// Show device identity (Shelly.GetDeviceInfo).
    Info,
    /// List the methods the device allows (Shelly.ListMethods).
    Methods,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Call(args) => call::run(args, device, format),
        Command::Info => info::run(device, format),
        Command::Methods => methods::run(device, format),
        Command::Version(args) => version::run(args),
    }
}

/// Connection options shared by every device command.
#[derive(Args, Debug, Default)]
pub struct DeviceArgs {
    /// Device host, optionally with :port.
    #[arg(long, env = "SHELLY_HOST", global = true)]
    pub host: Option<String>,
    /// Digest auth username.
    #[arg(long, default_value = shellyrpc::session::DEFAULT_USERNAME, global = true)]
    pub username: String,
    /// Digest auth password.
    #[arg(long, env = "SHELLY_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,
    /// Per-call timeout (e.g. 5s, 500ms). Default: 15s.
    #[arg(long, global = true)]
    pub timeout: Option<String>,
    /// Log raw request and response frames.
    #[arg(long, global = true)]
    pub debug_frames: bool,
}

impl DeviceArgs {
    pub fn config(&self) -> CliResult<ClientConfig> {
        let Some(host) = self.host.as_deref().filter(|h| !h.trim().is_empty()) else {
            return Err(CliError::new(USAGE, "--host is required"));
        };
        let send_timeout = self.timeout.as_deref().map(parse_duration).transpose()?;

        Ok(ClientConfig {
            username: self.username.clone(),
            password: self.password.clone(),
            send_timeout,
            debug: self.debug_frames,
            ..ClientConfig::new(host)
        })
    }
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Method name, e.g. Switch.GetStatus.
    pub method: String,
    /// Method parameters as a JSON object.
    #[arg(long)]
    pub params: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Open a client, run `op` against it, and close the connection.
pub fn with_client<T, F, Fut>(device: &DeviceArgs, op: F) -> CliResult<T>
where
    F: FnOnce(Client) -> Fut,
    Fut: Future<Output = (Client, CliResult<T>)>,
{
    let config = device.config()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;

    runtime.block_on(async {
        let client = match Client::connect(&config) {
            Ok(client) => client,
            Err(err) => return Err(session_error("connect failed", err)),
        };
        let (client, result) = op(client).await;
        client.close().await;
        result
    })
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn config_requires_host() {
        let err = DeviceArgs::default().config().unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn config_carries_options() {
        let args = DeviceArgs {
            host: Some("192.168.1.40".into()),
            username: "admin".into(),
            password: Some("secret".into()),
            timeout: Some("500ms".into()),
            debug_frames: true,
        };
        let config = args.config().unwrap();
        assert_eq!(config.host, "192.168.1.40");
        assert_eq!(config.password(), Some("secret"));
        assert_eq!(config.effective_send_timeout(), Duration::from_millis(500));
        assert!(config.debug);
    }
}
