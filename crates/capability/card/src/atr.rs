//! ATR 卡类型识别

pub const PHONE_CARD_TYPE: &str = "PHONE (HCE)";
pub const GENERIC_CARD_TYPE: &str = "NFC Tag";

/// PC/SC 存储卡 ATR 中的 RID + 标准 + 卡名
const STORAGE_CARDS: &[(&str, &str)] = &[
    ("A0000003060300 01", "MIFARE Classic 1K"),
    ("A0000003060300 02", "MIFARE Classic 4K"),
    ("A0000003060300 03", "MIFARE Ultralight"),
    ("A0000003060300 26", "MIFARE Mini"),
];

/// 手机 HCE 常见的 ATR 前缀
const PHONE_PREFIXES: &[&str] = &["3B8880", "3B8980", "3B8A80", "3B8F80", "3B80800101"];

const ISO14443_4_CARDS: &[(&str, &str)] = &[("3B8180018080", "MIFARE DESFire")];

/// 按固定表识别卡类型；未命中时为通用 NFC 标签。
pub fn classify_card_type(atr_hex: &str) -> &'static str {
    let atr = atr_hex.to_ascii_uppercase().replace(' ', "");

    for (pattern, name) in STORAGE_CARDS {
        if atr.contains(&pattern.replace(' ', "")) {
            return name;
        }
    }
    for (prefix, name) in ISO14443_4_CARDS {
        if atr.starts_with(prefix) {
            return name;
        }
    }
    if PHONE_PREFIXES.iter().any(|prefix| atr.starts_with(prefix)) {
        return PHONE_CARD_TYPE;
    }
    GENERIC_CARD_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_1k_wins_over_phone_prefix() {
        assert_eq!(
            classify_card_type("3B8F8001804F0CA000000306030001000000006A"),
            "MIFARE Classic 1K"
        );
    }

    #[test]
    fn hce_phone_prefix() {
        assert_eq!(classify_card_type("3b8880010000000000000000"), PHONE_CARD_TYPE);
        assert_eq!(classify_card_type("3B80800101"), PHONE_CARD_TYPE);
    }

    #[test]
    fn unknown_atr_is_generic() {
        assert_eq!(classify_card_type("3B00"), GENERIC_CARD_TYPE);
        assert_eq!(classify_card_type(""), GENERIC_CARD_TYPE);
    }
}
