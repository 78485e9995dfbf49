use std::net::{AddrParseError, IpAddr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

/// Builds a socket address, binding to all interfaces when `address` is
/// unset.
pub fn parse_addr(
    address: &Option<String>,
    port: u16,
) -> Result<SocketAddr, AddrParseError> {
    let addr = match address {
        | Some(addr) => IpAddr::from_str(addr)?,
        | _ => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };

    Ok(SocketAddr::from((addr, port)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_or_falls_back() {
        let addr = parse_addr(&Some("127.0.0.1".to_owned()), 8888).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:8888");

        let any = parse_addr(&None, 80).unwrap();
        assert_eq!(any.to_string(), "[::]:80");

        assert!(parse_addr(&Some("not-an-ip".to_owned()), 80).is_err());
    }
}
