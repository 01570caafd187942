fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WarnEvent<'a> {
    pub code: &'a str,
    pub stage: &'a str,
    pub action: &'a str,
    pub conversation: &'a str,
    pub path: &'a str,
    pub reason: &'a str,
    pub err: &'a str,
}

pub fn emit(event: WarnEvent<'_>) {
    tracing::warn!(
        code = %sanitize_value(event.code),
        stage = %sanitize_value(event.stage),
        action = %sanitize_value(event.action),
        conversation = %sanitize_value(event.conversation),
        path = %sanitize_value(event.path),
        reason = %sanitize_value(event.reason),
        err = %sanitize_value(event.err),
        "archive warning"
    );
}
