//! Wake-on-LAN 驱动

use crate::error::TransportError;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

/// 魔术包长度：6 字节 0xFF + 16 次 MAC
pub const MAGIC_PACKET_LEN: usize = 102;

pub const WOL_SENT: &str = "WOL magic packet sent";
pub const WOL_IP_MODE: &str = "WOL sent (IP mode)";

const WOL_PORT: u16 = 9;

/// 解析 `AA:BB:CC:DD:EE:FF` / `AA-BB-...` / 连写形式的 MAC。
pub fn parse_mac(address: &str) -> Option<[u8; 6]> {
    let hex: String = address
        .trim()
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .collect();
    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let mut mac = [0u8; 6];
    for (i, byte) in mac.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(mac)
}

pub fn magic_packet(mac: &[u8; 6]) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xFFu8; MAGIC_PACKET_LEN];
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(mac);
    }
    packet
}

/// 向指定地址发送魔术包（开启广播选项）。
pub async fn send_magic_packet(
    mac: &[u8; 6],
    to: SocketAddr,
    limit: Duration,
) -> Result<(), TransportError> {
    let packet = magic_packet(mac);
    let attempt = async {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.set_broadcast(true)?;
        socket.send_to(&packet, to).await
    };

    match timeout(limit, attempt).await {
        Err(_) => Err(TransportError::Timeout(format!(
            "WOL send timeout ({}ms)",
            limit.as_millis()
        ))),
        Ok(Err(err)) => Err(TransportError::Connection(err.to_string())),
        Ok(Ok(_)) => Ok(()),
    }
}

/// MAC 形态的地址广播到 255.255.255.255:9；其余地址按 IP 模式直接成功。
pub async fn send(address: &str, limit: Duration) -> Result<String, TransportError> {
    let Some(mac) = parse_mac(address) else {
        debug!(target: "fm.protocol", address = %address, "wol_ip_mode");
        return Ok(WOL_IP_MODE.to_string());
    };

    let broadcast = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, WOL_PORT));
    send_magic_packet(&mac, broadcast, limit).await?;
    Ok(WOL_SENT.to_string())
}
