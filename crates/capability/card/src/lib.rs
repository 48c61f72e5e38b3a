//! # 智能卡扫描能力模块
//!
//! ```text
//! 读卡器事件 (attach / insert / remove / detach)
//!       │
//!       ▼
//! ReaderStateMachine ──► ReaderNotice::ScanRequested
//!       │
//!       ▼
//! scan(CardChannel, aids)
//!       ├── UID（驱动内置或 GET DATA）
//!       ├── 逐个 SELECT AID（SUCCESS / FAIL / ERROR 全部记录）
//!       ├── 成功 AID：READ RECORD 扫描 → GET DATA 序列号 → GET BALANCE
//!       └── ATR 识别卡类型
//!       │
//!       ▼
//! ScanReport（identifier + 首个匹配 AID）
//! ```
//!
//! 启用 `pcsc` 特性后，[`spawn_reader_monitor`] 在阻塞线程中驱动真实读卡器。

pub mod aid;
pub mod apdu;
pub mod atr;
mod error;
pub mod reader;
pub mod scanner;

#[cfg(feature = "pcsc")]
mod pcsc_reader;

pub use aid::aid_label;
pub use apdu::{ApduResponse, bytes_to_hex, hex_to_bytes};
pub use atr::{GENERIC_CARD_TYPE, PHONE_CARD_TYPE, classify_card_type};
pub use error::CardError;
pub use reader::{ReaderEvent, ReaderNotice, ReaderState, ReaderStateMachine, ReaderUpdate};
pub use scanner::{
    AidScanResult, AidStatus, AppData, CardChannel, RecordData, ScanReport, UNKNOWN_IDENTIFIER,
    scan,
};

#[cfg(feature = "pcsc")]
pub use pcsc_reader::{PcscChannel, spawn_reader_monitor};
