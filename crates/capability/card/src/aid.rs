//! 常见 AID 的显示名

const KNOWN_AIDS: &[(&str, &str)] = &[
    ("325041592E5359532E4444463031", "PPSE (Contactless Payment)"),
    ("315041592E5359532E4444463031", "PSE (Contact Payment)"),
    ("D2760000850101", "NDEF Type 4 Tag"),
    ("D2760000850100", "NDEF Tag Application"),
    ("A0000000031010", "Visa Credit/Debit"),
    ("A0000000032010", "Visa Electron"),
    ("A0000000032020", "V Pay"),
    ("A0000000041010", "Mastercard Credit/Debit"),
    ("A0000000043060", "Mastercard Maestro"),
    ("A000000025010101", "AMEX"),
    ("A0000000651010", "JCB"),
    ("A000000333010101", "UnionPay Debit"),
    ("A000000333010102", "UnionPay Credit"),
    ("A0000001523010", "Discover/Diners"),
    ("D4100000030001", "T-Money"),
    ("D4100000030002", "T-Money (Alt)"),
    ("D4100000040001", "Cashbee"),
    ("D4100000060001", "Railplus"),
    ("D410000001", "Korea Smart Card"),
    ("D4100000010001", "Korean National ID"),
    ("A0000002471001", "Korean ePassport"),
    ("A0000000040100", "MIFARE DESFire"),
    ("A00000039656434C", "MIFARE Plus"),
    ("A0000001160000", "HID iCLASS"),
    ("F0010203040506", "Android HCE Sample"),
    ("F041434D450101", "HCE Loyalty Sample"),
    ("F0414343455353", "Access Control"),
    ("F0524F4F4D3031", "Smart Room"),
    ("F0434C41535330", "Smart Classroom"),
];

pub const CUSTOM_AID_LABEL: &str = "Custom";

/// 已知 AID 返回显示名，否则为 "Custom"。
pub fn aid_label(aid: &str) -> &'static str {
    KNOWN_AIDS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(aid))
        .map(|(_, label)| *label)
        .unwrap_or(CUSTOM_AID_LABEL)
}
