use fm_protocol::encode_command;

#[test]
fn spaced_hex_decodes_to_bytes() {
    assert_eq!(encode_command("AA 01 FF"), vec![0xAA, 0x01, 0xFF]);
}

#[test]
fn prefixed_and_comma_separated_hex_decodes() {
    assert_eq!(encode_command("0x02,0x30, 0x31"), vec![0x02, 0x30, 0x31]);
    assert_eq!(encode_command("0xaB 0xcd"), vec![0xAB, 0xCD]);
}

#[test]
fn uppercase_hex_prefix_falls_back_to_text() {
    assert_eq!(encode_command("0XAB 0xcd"), b"0XAB 0xcd".to_vec());
}

#[test]
fn text_escapes_are_substituted() {
    assert_eq!(encode_command("PWR ON\\r\\n"), b"PWR ON\r\n".to_vec());
    assert_eq!(encode_command("a\\tb"), b"a\tb".to_vec());
}

#[test]
fn unknown_escapes_stay_literal() {
    assert_eq!(encode_command("x\\0y"), b"x\\0y".to_vec());
}

#[test]
fn non_hex_text_is_utf8() {
    assert_eq!(encode_command("전원"), "전원".as_bytes().to_vec());
    assert!(encode_command("").is_empty());
}
