use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use config::{Config as ConfigLoader, Environment};
use is_terminal::IsTerminal;
use once_cell::sync::Lazy;
use serde::Deserialize;

const PREFIX: &str = "IPLOOKUP";

pub const SUBJECT_PLACEHOLDER: &str = "{ip}";

pub static CONFIG: Lazy<Config> = Lazy::new(|| init_config());

#[derive(Debug, Default)]
pub enum LogStyle {
    #[default]
    Auto,
    Always,
    Never,
}

impl LogStyle {
    pub fn is_color(&self) -> bool {
        match self {
            LogStyle::Auto => std::io::stdout().is_terminal(),
            LogStyle::Always => true,
            LogStyle::Never => false,
        }
    }
}

impl<'de> Deserialize<'de> for LogStyle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?.to_lowercase();
        match s.as_str() {
            "auto" => Ok(LogStyle::Auto),
            "always" => Ok(LogStyle::Always),
            "never" => Ok(LogStyle::Never),
            _ => Err(serde::de::Error::unknown_variant(
                &s,
                &["auto", "always", "never"],
            )),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Log {
    pub level: String,
    pub style: LogStyle,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: Self::level(),
            style: LogStyle::default(),
        }
    }
}

impl Log {
    fn level() -> String {
        String::from("iplookup=info")
    }
}

/// Upstream sources and the worker pool that queries them.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Lookup {
    pub workers: usize,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub ipshudi_url: String,
    pub ip138_url: String,
}

impl Default for Lookup {
    fn default() -> Self {
        Self {
            workers: 2,
            user_agent: Self::user_agent(),
            connect_timeout_secs: 5,
            ipshudi_url: String::from("https://www.ipshudi.com/{ip}.htm"),
            ip138_url: String::from("https://www.ip138.com/iplookup.php?ip={ip}"),
        }
    }
}

impl Lookup {
    fn user_agent() -> String {
        String::from(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("lookup workers must be greater than zero".into());
        }
        if self.user_agent.trim().is_empty() {
            return Err("lookup user agent must be set".into());
        }
        for (name, url) in [("ipshudi", &self.ipshudi_url), ("ip138", &self.ip138_url)] {
            if !url.contains(SUBJECT_PLACEHOLDER) {
                return Err(format!(
                    "{name} url must contain the {SUBJECT_PLACEHOLDER} placeholder"
                ));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    pub log: Log,
    pub addr: SocketAddr,
    pub history_file: String,
    pub web_dir: String,
    pub debug: bool,
    pub lookup: Lookup,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log: Log::default(),
            addr: Self::addr(),
            history_file: Self::history_file(),
            web_dir: Self::web_dir(),
            debug: true,
            lookup: Lookup::default(),
        }
    }
}

impl Config {
    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 5000)
    }

    fn history_file() -> String {
        String::from("data/ip_history.txt")
    }

    fn web_dir() -> String {
        String::from("dist")
    }
}

pub fn init_config() -> Config {
    let config = ConfigLoader::builder()
        .add_source(
            Environment::with_prefix(PREFIX)
                .separator("_")
                .try_parsing(true),
        )
        .add_source(
            Environment::with_prefix(PREFIX)
                .separator("__")
                .prefix_separator("_")
                .try_parsing(true),
        )
        .build()
        .and_then(|cfg| cfg.try_deserialize::<Config>());

    match config {
        Ok(config) => {
            if let Err(err) = config.lookup.validate() {
                panic!("{}", err);
            }
            println!("{:#?}", config);
            config
        }
        Err(err) => {
            panic!("{:?}", err);
        }
    }
}
