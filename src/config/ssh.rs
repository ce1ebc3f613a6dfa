/// SSH tunnel descriptor embedded in remote connection settings
use super::settings::HostAndPort;
use super::ConfigError;
use std::fmt;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_PUBLIC_KEY_PATH: &str = "~/.ssh/id_rsa.pub";
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "~/.ssh/id_rsa";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SshAuthMethod {
    #[default]
    Unknown,
    Password,
    PublicKey,
}

impl SshAuthMethod {
    pub fn id(self) -> u8 {
        match self {
            SshAuthMethod::Unknown => 0,
            SshAuthMethod::Password => 1,
            SshAuthMethod::PublicKey => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(SshAuthMethod::Unknown),
            1 => Some(SshAuthMethod::Password),
            2 => Some(SshAuthMethod::PublicKey),
            _ => None,
        }
    }
}

/// SSH tunnel settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshInfo {
    /// SSH server address
    pub host: HostAndPort,
    pub user: String,
    pub password: String,
    pub public_key: String,
    pub private_key: String,
    /// Passphrase of the private key
    pub passphrase: String,
    pub method: SshAuthMethod,
}

impl Default for SshInfo {
    fn default() -> Self {
        Self {
            host: HostAndPort::new("", DEFAULT_SSH_PORT),
            user: String::new(),
            password: String::new(),
            public_key: DEFAULT_PUBLIC_KEY_PATH.to_string(),
            private_key: DEFAULT_PRIVATE_KEY_PATH.to_string(),
            passphrase: String::new(),
            method: SshAuthMethod::Unknown,
        }
    }
}

impl SshInfo {
    /// A tunnel is only used when an auth method and a host are set
    pub fn is_valid(&self) -> bool {
        self.method != SshAuthMethod::Unknown && !self.host.host.is_empty()
    }

    /// Parse the `key:value` lines written by `Display`
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut info = SshInfo::default();
        for line in text.split("\r\n").filter(|line| !line.is_empty()) {
            let (key, value) = line.split_once(':').ok_or_else(|| {
                ConfigError::ValidationError(format!("Invalid ssh field: {}", line))
            })?;
            match key {
                "host" => {
                    let (host, port) = value.rsplit_once(':').ok_or_else(|| {
                        ConfigError::ValidationError(format!("Invalid ssh host: {}", value))
                    })?;
                    let port = port.parse::<u16>().map_err(|_| {
                        ConfigError::ValidationError(format!("Invalid ssh port: {}", port))
                    })?;
                    info.host = HostAndPort::new(host, port);
                }
                "user" => info.user = value.to_string(),
                "password" => info.password = value.to_string(),
                "public_key" => info.public_key = value.to_string(),
                "private_key" => info.private_key = value.to_string(),
                "passphrase" => info.passphrase = value.to_string(),
                "method" => {
                    info.method = value
                        .parse::<u8>()
                        .ok()
                        .and_then(SshAuthMethod::from_id)
                        .ok_or_else(|| {
                            ConfigError::ValidationError(format!("Invalid ssh method: {}", value))
                        })?;
                }
                _ => log::debug!("ignoring unknown ssh field {}", key),
            }
        }
        Ok(info)
    }
}

impl fmt::Display for SshInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host:{}:{}\r\nuser:{}\r\npassword:{}\r\npublic_key:{}\r\nprivate_key:{}\r\npassphrase:{}\r\nmethod:{}",
            self.host.host,
            self.host.port,
            self.user,
            self.password,
            self.public_key,
            self.private_key,
            self.passphrase,
            self.method.id()
        )
    }
}
