//! Just enough HTML handling for one server-rendered table.

/// Byte ranges of successive `<tag ...>...</tag>` blocks in `s`, searched
/// case-insensitively. Nested tags of the same name are not supported.
pub fn tag_blocks(s: &str, tag: &str) -> Vec<(usize, usize)> {
    let lc = s.to_ascii_lowercase();
    let open = format!("<{}", tag.to_ascii_lowercase());
    let close = format!("</{}", tag.to_ascii_lowercase());

    let mut out = Vec::new();
    let mut from = 0;
    while let Some(rel) = lc[from..].find(&open) {
        let start = from + rel;
        // Skip `<trx`-style prefixes of longer tag names.
        let next = lc[start + open.len()..].chars().next();
        if !matches!(next, Some(c) if c == '>' || c.is_ascii_whitespace() || c == '/') {
            from = start + open.len();
            continue;
        }
        let Some(close_rel) = lc[start..].find(&close) else {
            break;
        };
        let close_start = start + close_rel;
        let end = lc[close_start..]
            .find('>')
            .map(|i| close_start + i + 1)
            .unwrap_or(lc.len());
        out.push((start, end));
        from = end;
    }
    out
}

/// Everything between the end of the opening tag and the start of the
/// closing tag.
pub fn inner(block: &str) -> &str {
    let Some(open_end) = block.find('>') else {
        return "";
    };
    match block.rfind('<') {
        Some(close_start) if close_start > open_end => &block[open_end + 1..close_start],
        _ => "",
    }
}

/// The opening tag of a block, e.g. `<table id="x" class="y">`.
pub fn open_tag(block: &str) -> &str {
    match block.find('>') {
        Some(i) => &block[..=i],
        None => block,
    }
}

/// Strip tags, decode entities, collapse whitespace.
pub fn text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode_entities(&out))
}

pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').filter(|&semi| semi <= 10) {
            Some(semi) => {
                let entity = &tail[1..semi];
                match decode_entity(entity) {
                    Some(c) => out.push(c),
                    None => out.push_str(&tail[..=semi]),
                }
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "rupee" => Some('₹'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
