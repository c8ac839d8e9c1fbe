use std::net::{IpAddr, Ipv4Addr};

use log::info;
use pcap::Device;

use crate::error_handling::types::NetworkError;

/// Resolves the IPv4 address the tracked interface answers on.
///
/// The first non-loopback IPv4 address listed for the interface wins.
pub fn resolve_local_ipv4(interface: &str) -> Result<Ipv4Addr, NetworkError> {
    let devices =
        Device::list().map_err(|e| NetworkError::InterfaceLookupFailed(e.to_string()))?;
    let device = devices
        .into_iter()
        .find(|d| d.name == interface)
        .ok_or_else(|| NetworkError::InterfaceNotFound(interface.to_string()))?;

    let address = first_usable_ipv4(device.addresses.iter().map(|a| a.addr))
        .ok_or_else(|| NetworkError::NoIpv4Address(interface.to_string()))?;
    info!("local address of {} is {}", interface, address);
    Ok(address)
}

pub fn first_usable_ipv4<I>(addresses: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    addresses.into_iter().find_map(|addr| match addr {
        IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn test_skips_ipv6_and_loopback() {
        let addrs = vec![
            IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)),
        ];

        assert_eq!(
            first_usable_ipv4(addrs),
            Some(Ipv4Addr::new(192, 168, 1, 20))
        );
    }

    #[test]
    fn test_no_usable_address() {
        let addrs = vec![IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST)];
        assert_eq!(first_usable_ipv4(addrs), None);
    }

    #[test]
    fn test_unknown_interface_is_an_error() {
        // Device::list itself may fail in a sandbox, both outcomes are errors
        let result = resolve_local_ipv4("no-such-iface0");
        assert!(matches!(
            result,
            Err(NetworkError::InterfaceNotFound(_)) | Err(NetworkError::InterfaceLookupFailed(_))
        ));
    }
}
