use crate::{ConfigError, Result};

/// The only JDWP transport the backends can re-encode.
pub const SOCKET_TRANSPORT: &str = "dt_socket";

/// Debugger attach parameters taken from a JDWP agent flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugSettings {
    pub enabled: bool,
    /// The agent flag exactly as it was passed, e.g.
    /// `-agentlib:jdwp=transport=dt_socket,server=n,address=5005`.
    pub raw_flag: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub server: bool,
    pub suspend: bool,
}

/// Parse the `key=value,...` parameter list of a JDWP agent flag.
///
/// `raw_flag` is the complete flag, kept verbatim for backends that cannot
/// describe the attach mode with their own properties.
pub fn parse_debug_spec(raw_flag: &str, params: &str) -> Result<DebugSettings> {
    let mut settings = DebugSettings {
        enabled: true,
        raw_flag: raw_flag.to_owned(),
        ..DebugSettings::default()
    };

    for param in params.split(',') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key {
            "address" => {
                let (host, port) = parse_address(value)?;
                settings.host = host;
                settings.port = Some(port);
            }
            "server" => settings.server = parse_java_boolean(value),
            "suspend" => settings.suspend = parse_java_boolean(value),
            "transport" => {
                if value != SOCKET_TRANSPORT {
                    return Err(ConfigError::UnsupportedTransport {
                        transport: value.to_owned(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(settings)
}

fn parse_address(address: &str) -> Result<(Option<String>, u16)> {
    let invalid = || ConfigError::InvalidDebugAddress {
        address: address.to_owned(),
    };
    match address.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().map_err(|_| invalid())?;
            Ok((Some(host.to_owned()), port))
        }
        None => Ok((None, address.parse().map_err(|_| invalid())?)),
    }
}

/// `y`/`n` shorthand, otherwise Java's `Boolean.parseBoolean` (only a
/// case-insensitive `true` is true).
pub fn parse_java_boolean(value: &str) -> bool {
    match value {
        "y" => true,
        "n" => false,
        other => other.eq_ignore_ascii_case("true"),
    }
}
