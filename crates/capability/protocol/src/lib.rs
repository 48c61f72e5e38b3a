//! # 设备协议能力模块
//!
//! 把一条人工录入的命令码下发到物理设备：
//! - **命令编码**：十六进制字节序列或带转义的文本
//! - **TCP / 串口转 TCP**：连接后写入，首个数据块即响应，宽限期内无响应视为已发送
//! - **UDP**：单个数据报，发送完成即成功
//! - **WOL**：MAC 地址时广播魔术包，否则按 IP 模式直接返回
//! - **HTTP**：`GET http://{ip}[:{port}]/{code}`
//!
//! ## 架构设计
//!
//! ```text
//! DispatchTarget (protocol + ip + port) + command code
//!       │
//!       ▼
//! ProtocolTransport (match ProtocolType)
//!       │
//!       ├── tcp::send      (TCP / RS232)
//!       ├── udp::send
//!       ├── wol::send
//!       └── HttpDriver::send
//! ```

mod codec;
mod error;
mod http;
mod tcp;
mod transport;
mod udp;
mod wol;

pub use codec::{encode_command, parse_hex_payload};
pub use error::TransportError;
pub use http::{HttpDriver, build_http_url};
pub use transport::{
    COMMAND_SENT, DEFAULT_DEVICE_PORT, DeviceTransport, DispatchTarget, ProtocolTransport,
    TransportConfig,
};
pub use wol::{MAGIC_PACKET_LEN, WOL_IP_MODE, WOL_SENT, magic_packet, parse_mac, send_magic_packet};

pub use tcp::send as send_tcp;
pub use udp::send as send_udp;
