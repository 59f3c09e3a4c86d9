use crate::device::DEFAULT_DEVICE_PORT;
use crate::store::StoreConfig;
use crate::validate::validate_address;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "relay-hub", about = "Appliance dashboard backend for a networked relay board")]
pub struct Config {
    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: String,

    /// Relay board address used until one is persisted
    #[arg(long, env = "DEVICE_ADDRESS", default_value = "192.168.1.100", value_parser = parse_device_address)]
    pub device_address: String,

    /// Relay board HTTP port
    #[arg(long, env = "DEVICE_PORT", default_value_t = DEFAULT_DEVICE_PORT)]
    pub device_port: u16,

    #[arg(long, env = "SETTINGS_PATH", default_value = "relay-hub-settings.json")]
    pub settings_path: PathBuf,

    /// Price per kWh
    #[arg(long, env = "ELECTRICITY_RATE", default_value_t = 8.5)]
    pub electricity_rate: f64,

    /// Comma separated appliance ids wired with inverted relays
    #[arg(long, env = "INVERTED_RELAYS", value_delimiter = ',')]
    pub inverted_relays: Vec<u32>,

    #[arg(long, env = "METRICS_INTERVAL_MS", default_value_t = 2000, value_parser = clap::value_parser!(u64).range(1..))]
    pub metrics_interval_ms: u64,

    #[arg(long, env = "TIMER_SWEEP_MS", default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub timer_sweep_ms: u64,
}

fn parse_device_address(value: &str) -> Result<String, String> {
    validate_address(value)
        .map(|()| value.to_string())
        .map_err(|e| e.to_string())
}

impl Config {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            default_address: self.device_address.clone(),
            electricity_rate: self.electricity_rate,
            inverted_relays: self.inverted_relays.clone(),
        }
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms)
    }

    pub fn timer_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.timer_sweep_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["relay-hub"]).unwrap();
        assert_eq!(config.device_address, "192.168.1.100");
        assert_eq!(config.metrics_interval(), Duration::from_secs(2));
        assert_eq!(config.timer_sweep_interval(), Duration::from_secs(1));
        assert!(config.inverted_relays.is_empty());
        assert_eq!(config.device_port, 80);
    }

    #[test]
    fn test_zero_intervals_rejected() {
        assert!(Config::try_parse_from(["relay-hub", "--timer-sweep-ms", "0"]).is_err());
        assert!(Config::try_parse_from(["relay-hub", "--metrics-interval-ms", "0"]).is_err());
        assert!(Config::try_parse_from(["relay-hub", "--timer-sweep-ms", "250"]).is_ok());
    }

    #[test]
    fn test_device_address_validated() {
        assert!(Config::try_parse_from(["relay-hub", "--device-address", "999.1.1.1"]).is_err());
        assert!(Config::try_parse_from(["relay-hub", "--device-address", "127.0.0.1:8081"]).is_err());

        let config = Config::try_parse_from([
            "relay-hub",
            "--device-address",
            "127.0.0.1",
            "--device-port",
            "8081",
        ])
        .unwrap();
        assert_eq!(config.device_address, "127.0.0.1");
        assert_eq!(config.device_port, 8081);
    }

    #[test]
    fn test_inverted_relays_list() {
        let config =
            Config::try_parse_from(["relay-hub", "--inverted-relays", "2,4", "--electricity-rate", "6.25"])
                .unwrap();
        assert_eq!(config.store_config().inverted_relays, vec![2, 4]);
        assert_eq!(config.store_config().electricity_rate, 6.25);
    }
}
