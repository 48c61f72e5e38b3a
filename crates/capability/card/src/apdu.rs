//! APDU 构造与响应解析

use crate::error::CardError;

/// 读取 UID（PC/SC 伪 APDU）
pub const GET_UID: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

/// 卡片序列号（GET DATA, tag 9F7F）
pub const GET_DATA_SERIAL: [u8; 5] = [0x80, 0xCA, 0x9F, 0x7F, 0x00];

/// 余额查询，响应为 4 字节大端
pub const GET_BALANCE: [u8; 5] = [0x90, 0x4C, 0x00, 0x00, 0x04];

/// ISO 7816-4 AID 长度范围
pub const AID_LEN: std::ops::RangeInclusive<usize> = 5..=16;

const BUZZER_SHORT: u8 = 0x01;
const BUZZER_LONG: u8 = 0xFF;

/// `00 A4 04 00 Lc AID 00`
pub fn select_aid(aid: &[u8]) -> Result<Vec<u8>, CardError> {
    if !AID_LEN.contains(&aid.len()) {
        return Err(CardError::InvalidAid(aid.len()));
    }
    let mut apdu = Vec::with_capacity(aid.len() + 6);
    apdu.extend_from_slice(&[0x00, 0xA4, 0x04, 0x00, aid.len() as u8]);
    apdu.extend_from_slice(aid);
    apdu.push(0x00);
    Ok(apdu)
}

/// `61xx` 后取剩余数据
pub fn get_response(length: u8) -> [u8; 5] {
    [0x00, 0xC0, 0x00, 0x00, length]
}

/// `00 B2 rec (sfi<<3|4) 00`
pub fn read_record(sfi: u8, record: u8) -> [u8; 5] {
    [0x00, 0xB2, record, (sfi << 3) | 0x04, 0x00]
}

/// ACR122U 蜂鸣器：`FF 00 52 dd 00`，短音 0x01，长音 0xFF
pub fn buzzer(long: bool) -> [u8; 5] {
    let duration = if long { BUZZER_LONG } else { BUZZER_SHORT };
    [0xFF, 0x00, 0x52, duration, 0x00]
}

/// 响应数据 + 状态字
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    pub data: Vec<u8>,
    pub sw1: u8,
    pub sw2: u8,
}

impl ApduResponse {
    /// 少于 2 字节的响应没有状态字，返回 `None`。
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let split = raw.len().checked_sub(2)?;
        Some(Self {
            data: raw[..split].to_vec(),
            sw1: raw[split],
            sw2: raw[split + 1],
        })
    }

    pub fn sw(&self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    pub fn sw_hex(&self) -> String {
        format!("{:04X}", self.sw())
    }

    pub fn is_ok(&self) -> bool {
        self.sw() == 0x9000
    }

    /// `61xx`：还有 xx 字节可取
    pub fn remaining(&self) -> Option<u8> {
        (self.sw1 == 0x61).then_some(self.sw2)
    }
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// 忽略空白；奇数位或非十六进制字符返回 `None`。
pub fn hex_to_bytes(hex: &str) -> Option<Vec<u8>> {
    let digits: Vec<char> = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let high = pair[0].to_digit(16)?;
            let low = pair[1].to_digit(16)?;
            Some((high * 16 + low) as u8)
        })
        .collect()
}
