//! `"[host]:port"` addresses.

const DEFAULT_HOST: &str = "127.0.0.1";

/// A parsed endpoint address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Address {
    pub(crate) host: String,
    pub(crate) port: u16,
}

/// Splits on the last `:`; an empty host defaults to the loopback address,
/// the port must be a non-zero decimal.
pub(crate) fn parse(address: &str) -> Option<Address> {
    let (host, port) = address.rsplit_once(':')?;
    let port = port.parse::<u16>().ok()?;
    if port == 0 {
        return None;
    }

    let host = if host.is_empty() { DEFAULT_HOST } else { host };

    Some(Address {
        host: host.to_string(),
        port,
    })
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::parse;

    #[test]
    fn host_and_port() {
        let address = parse("example.org:11000").unwrap();
        assert_eq!(address.host, "example.org");
        assert_eq!(address.port, 11_000);
    }

    #[test]
    fn empty_host_defaults_to_loopback() {
        let address = parse(":11000").unwrap();
        assert_eq!(address.host, "127.0.0.1");
    }

    #[test]
    fn the_last_colon_wins() {
        let address = parse("::1:11000");
        // An IPv6 host keeps its leading colons.
        let address = address.unwrap();
        assert_eq!(address.host, "::1");
        assert_eq!(address.port, 11_000);
    }

    #[test]
    fn bad_addresses_are_refused() {
        assert!(parse("nocolon").is_none());
        assert!(parse("host:").is_none());
        assert!(parse("host:0").is_none());
        assert!(parse("host:notaport").is_none());
        assert!(parse("host:70000").is_none());
    }
}
