//! 時間表示のフォーマット

/// 秒数を "1h 2m 3s" 形式に変換（小数点以下切り捨て、0秒は "0s"）
pub fn format_time(sec: f64) -> String {
    let total = if sec.is_finite() && sec > 0.0 { sec.floor() as u64 } else { 0 };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;

    let mut parts = Vec::new();
    if h > 0 {
        parts.push(format!("{}h", h));
    }
    if m > 0 {
        parts.push(format!("{}m", m));
    }
    if s > 0 {
        parts.push(format!("{}s", s));
    }
    if parts.is_empty() {
        parts.push("0s".to_string());
    }
    parts.join(" ")
}

/// シーンの時間範囲 "0s - 1m 5s"
pub fn format_range(start_sec: f64, end_sec: f64) -> String {
    format!("{} - {}", format_time(start_sec), format_time(end_sec))
}
