//! 命令编码
//!
//! 命令码若是（去掉 `0x`、逗号视为空白后的）两位十六进制分组序列，则按字节解码；
//! 否则按文本处理，只替换 `\r`、`\n`、`\t` 三种转义。编码永不失败。

/// 把命令码编码为待发送的字节。
pub fn encode_command(code: &str) -> Vec<u8> {
    match parse_hex_payload(code) {
        Some(bytes) => bytes,
        None => unescape(code).into_bytes(),
    }
}

/// 尝试按十六进制分组解析，不匹配时返回 `None`。
pub fn parse_hex_payload(code: &str) -> Option<Vec<u8>> {
    // 只去小写 `0x`，`0X` 保留原样
    let normalized = code.replace("0x", "").replace(',', " ");
    let normalized = normalized.trim();
    if normalized.is_empty() {
        return None;
    }

    let mut bytes = Vec::with_capacity(normalized.len() / 2);
    let mut chars = normalized.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        // 每个分组必须是紧挨着的两位十六进制数字
        let high = chars.next()?.to_digit(16)?;
        let low = chars.next()?.to_digit(16)?;
        bytes.push((high * 16 + low) as u8);
    }
    Some(bytes)
}

fn unescape(code: &str) -> String {
    code.replace("\\r", "\r")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}
