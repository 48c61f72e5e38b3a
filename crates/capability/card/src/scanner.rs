//! 插卡扫描流程
//!
//! 每次插卡执行一次：读 UID → 逐个 SELECT AID → 成功的 AID 做数据探测 → ATR 识别。
//! 每个探测都返回 `Option`，由显式的回退链组合，任何一步失败都不会中断扫描。

use serde::Serialize;
use tracing::{debug, warn};

use crate::apdu::{self, ApduResponse, bytes_to_hex, hex_to_bytes};
use crate::aid::aid_label;
use crate::atr::classify_card_type;
use crate::error::CardError;

/// 没有 UID 时下发的标识
pub const UNKNOWN_IDENTIFIER: &str = "unknown";

const RECORD_SFIS: std::ops::RangeInclusive<u8> = 1..=3;
const RECORD_NUMBERS: std::ops::RangeInclusive<u8> = 1..=3;

/// 与卡片的 APDU 通道
///
/// 读卡器驱动（PC/SC）和测试脚本都实现这个 trait；调用方保证同一时刻只有一次扫描。
pub trait CardChannel {
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, CardError>;

    /// ATR 十六进制串
    fn atr(&self) -> String;

    /// 驱动直接提供的 UID（有些驱动在连接时就读到了）
    fn builtin_uid(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AidStatus {
    Success,
    Fail,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordData {
    pub sfi: u8,
    pub record: u8,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fci: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<RecordData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AidScanResult {
    pub aid: String,
    pub label: String,
    pub status: AidStatus,
    /// 状态字，ERROR 时为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_data: Option<AppData>,
}

/// 一次插卡的完整扫描结果（`scan` 事件的数据体）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub uid: Option<String>,
    pub atr: String,
    pub card_type: String,
    pub aid_results: Vec<AidScanResult>,
    pub matched_aids: Vec<String>,
}

impl ScanReport {
    /// 下发给标签 API 的标识：UID，缺失时为 "unknown"
    pub fn identifier(&self) -> &str {
        self.uid.as_deref().unwrap_or(UNKNOWN_IDENTIFIER)
    }

    pub fn first_matched_aid(&self) -> Option<&str> {
        self.matched_aids.first().map(String::as_str)
    }
}

/// 对一张卡执行扫描；`aids` 为配置的十六进制 AID 列表，按顺序探测。
pub fn scan(channel: &mut dyn CardChannel, aids: &[String]) -> ScanReport {
    let uid = read_uid(channel);
    let atr = channel.atr();
    let card_type = classify_card_type(&atr).to_string();

    let aid_results: Vec<AidScanResult> = aids.iter().map(|aid| probe_aid(channel, aid)).collect();
    let matched_aids = aid_results
        .iter()
        .filter(|result| result.status == AidStatus::Success)
        .map(|result| result.aid.clone())
        .collect();

    debug!(
        target: "fm.card",
        uid = uid.as_deref().unwrap_or(UNKNOWN_IDENTIFIER),
        card_type = %card_type,
        aid_count = aid_results.len(),
        "card_scanned"
    );

    ScanReport {
        uid,
        atr,
        card_type,
        aid_results,
        matched_aids,
    }
}

fn read_uid(channel: &mut dyn CardChannel) -> Option<String> {
    if let Some(uid) = channel.builtin_uid().filter(|uid| !uid.is_empty()) {
        return Some(uid.to_ascii_uppercase());
    }
    let response = exchange(channel, &apdu::GET_UID)?;
    (response.is_ok() && !response.data.is_empty()).then(|| bytes_to_hex(&response.data))
}

fn probe_aid(channel: &mut dyn CardChannel, aid: &str) -> AidScanResult {
    let aid = aid.trim().to_ascii_uppercase();
    let mut result = AidScanResult {
        label: aid_label(&aid).to_string(),
        aid,
        status: AidStatus::Error,
        sw: None,
        response_data: None,
        app_data: None,
    };

    let Some(aid_bytes) = hex_to_bytes(&result.aid) else {
        warn!(target: "fm.card", aid = %result.aid, "aid_not_hex");
        return result;
    };

    let select = match apdu::select_aid(&aid_bytes) {
        Ok(select) => select,
        Err(err) => {
            warn!(target: "fm.card", aid = %result.aid, error = %err, "aid_invalid");
            return result;
        }
    };
    let raw = match channel.transmit(&select) {
        Ok(raw) => raw,
        Err(err) => {
            debug!(target: "fm.card", aid = %result.aid, error = %err, "aid_select_error");
            return result;
        }
    };
    let Some(response) = ApduResponse::parse(&raw) else {
        return result;
    };
    result.sw = Some(response.sw_hex());

    let fci = if response.is_ok() {
        response.data
    } else if let Some(remaining) = response.remaining() {
        let mut data = response.data;
        // GET RESPONSE 失败时保留已有数据
        if let Some(rest) = exchange(channel, &apdu::get_response(remaining)).filter(ApduResponse::is_ok)
        {
            data.extend_from_slice(&rest.data);
        }
        data
    } else {
        result.status = AidStatus::Fail;
        return result;
    };

    result.status = AidStatus::Success;
    let fci = (!fci.is_empty()).then(|| bytes_to_hex(&fci));
    result.app_data = Some(read_app_data(channel, fci.clone()));
    result.response_data = fci;
    result
}

fn read_app_data(channel: &mut dyn CardChannel, fci: Option<String>) -> AppData {
    let records = read_records(channel);
    let serial_number = read_serial(channel)
        .or_else(|| fci.clone())
        .or_else(|| records.first().map(|record| record.data.clone()));
    let balance = read_balance(channel);

    AppData {
        serial_number,
        fci,
        balance,
        records,
    }
}

fn read_records(channel: &mut dyn CardChannel) -> Vec<RecordData> {
    let mut records = Vec::new();
    for sfi in RECORD_SFIS {
        for record in RECORD_NUMBERS {
            if let Some(data) = exchange_data(channel, &apdu::read_record(sfi, record)) {
                records.push(RecordData {
                    sfi,
                    record,
                    data: bytes_to_hex(&data),
                });
            }
        }
    }
    records
}

fn read_serial(channel: &mut dyn CardChannel) -> Option<String> {
    exchange_data(channel, &apdu::GET_DATA_SERIAL).map(|data| bytes_to_hex(&data))
}

fn read_balance(channel: &mut dyn CardChannel) -> Option<u32> {
    let data = exchange_data(channel, &apdu::GET_BALANCE)?;
    let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

fn exchange(channel: &mut dyn CardChannel, command: &[u8]) -> Option<ApduResponse> {
    let raw = channel.transmit(command).ok()?;
    ApduResponse::parse(&raw)
}

/// 9000 且带数据时返回数据
fn exchange_data(channel: &mut dyn CardChannel, command: &[u8]) -> Option<Vec<u8>> {
    exchange(channel, command)
        .filter(|response| response.is_ok() && !response.data.is_empty())
        .map(|response| response.data)
}
