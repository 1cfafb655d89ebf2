use crate::config::ops::RequiredOps;
use crate::error::{Error, Result};
use crate::key::DEFAULT_DOMAIN;
use regex::Regex;

/// Parse required operators config text.
///
/// Blank lines and lines starting with '#' are skipped. The same
/// (domain, opset) may appear on several lines; its operators are merged.
/// Listing an operator twice with different entries is an error.
pub fn parse_required_ops(text: &str) -> Result<RequiredOps> {
    // 1) domain (may be empty)  2) opsets  3) operators, rest of line
    let re = Regex::new(r"^\s*([^;\s]*)\s*;\s*([0-9][0-9,\s]*?)\s*;\s*(.*?)\s*$")
        .map_err(|e| Error::ConfigParse {
            line: 0,
            reason: e.to_string(),
        })?;

    let mut out = RequiredOps::new();
    for (lineno, line) in text.lines().enumerate() {
        let lno = lineno + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let err = |reason: String| Error::ConfigParse { line: lno, reason };

        let caps = re
            .captures(line)
            .ok_or_else(|| err(format!("cannot parse line: {:?}", trimmed)))?;

        let domain = match &caps[1] {
            "" => DEFAULT_DOMAIN,
            d => d,
        };

        let mut opsets = Vec::new();
        for part in caps[2].split(',') {
            let p = part.trim();
            if p.is_empty() {
                continue;
            }
            opsets.push(
                p.parse::<u32>()
                    .map_err(|e| err(format!("bad opset {:?}: {}", p, e)))?,
            );
        }

        let operators = split_operators(&caps[3]).map_err(err)?;
        if operators.is_empty() {
            return Err(err(format!("no operators listed for {}", domain)));
        }

        for (op, entry) in operators {
            if let Some(entry) = entry {
                match serde_json::from_str::<serde_json::Value>(entry) {
                    Ok(v) if v.is_object() => {}
                    _ => return Err(err(format!("type info for {} is not a JSON object", op))),
                }
            }
            let entry = entry.map(str::to_string);

            for &opset in &opsets {
                if let Some(prev) = out.insert(domain, opset, op, entry.clone()) {
                    if prev != entry {
                        return Err(err(format!(
                            "{}:{} opset {} listed twice with different type info",
                            domain, op, opset
                        )));
                    }
                }
            }
        }
    }

    Ok(out)
}

/// Split "Add{...},Conv" into [("Add", Some("{...}")), ("Conv", None)].
/// Commas inside a brace-delimited entry, including inside JSON strings,
/// do not split.
fn split_operators(s: &str) -> std::result::Result<Vec<(&str, Option<&str>)>, String> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced '}}' in {:?}", s))?;
            }
            ',' if depth == 0 => {
                items.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || in_string {
        return Err(format!("unterminated type info in {:?}", s));
    }
    items.push(&s[start..]);

    let mut out = Vec::new();
    for item in items {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (name, entry) = match item.find('{') {
            Some(pos) => (item[..pos].trim(), Some(&item[pos..])),
            None => (item, None),
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("bad operator name {:?}", name));
        }
        if let Some(entry) = entry {
            if !entry.ends_with('}') {
                return Err(format!("trailing text after type info for {}", name));
            }
        }
        out.push((name, entry));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_operators_with_entries() {
        let ops = parse_required_ops(
            "# reduced build\n\
             \n\
             ai.onnx;12,13;Add{\"inputs\": {\"0\": [\"double\", \"float\"]}},Conv\n\
             ai.onnx;13;OneHot{\"custom\": [\"float_int64_t_int64_t\"]}\n\
             com.microsoft;1;QLinearAdd\n",
        )
        .unwrap();

        let add = Some(r#"{"inputs": {"0": ["double", "float"]}}"#.to_string());
        assert_eq!(ops.get("ai.onnx", 12, "Add"), Some(&add));
        assert_eq!(ops.get("ai.onnx", 13, "Add"), Some(&add));
        assert_eq!(ops.get("ai.onnx", 12, "Conv"), Some(&None));
        assert_eq!(ops.get("ai.onnx", 12, "OneHot"), None);
        assert_eq!(ops.get("com.microsoft", 1, "QLinearAdd"), Some(&None));
    }

    #[test]
    fn written_config_parses_back() {
        let text = "ai.onnx;13;Add{\"inputs\": {\"0\": [\"float\"]}},Cast{\"inputs\": {\"0\": [\"int64_t\"]}, \"outputs\": {\"0\": [\"float\"]}},Relu\n";
        let ops = parse_required_ops(text).unwrap();
        assert_eq!(ops.to_string(), text);
        assert_eq!(parse_required_ops(&ops.to_string()).unwrap(), ops);
    }

    #[test]
    fn empty_domain_is_onnx() {
        let ops = parse_required_ops(";11;Relu").unwrap();
        assert_eq!(ops.get("ai.onnx", 11, "Relu"), Some(&None));
    }

    #[test]
    fn conflicting_entries_fail() {
        let err = parse_required_ops(
            "ai.onnx;13;Add{\"inputs\": {\"0\": [\"float\"]}}\n\
             ai.onnx;13;Add{\"inputs\": {\"0\": [\"double\"]}}\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConfigParse { line: 2, .. }));
    }

    #[test]
    fn reports_line_numbers() {
        for (text, line) in [
            ("ai.onnx;13;Add\nnot a config line\n", 2),
            ("ai.onnx;x;Add\n", 1),
            ("ai.onnx;13;Add{\"inputs\": \n", 1),
            ("ai.onnx;13;Add{\"inputs\"}\n", 1),
            ("ai.onnx;13;\n", 1),
        ] {
            match parse_required_ops(text) {
                Err(Error::ConfigParse { line: l, .. }) => assert_eq!(l, line, "{:?}", text),
                other => panic!("expected parse error for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn split_ignores_commas_inside_entries() {
        let items = split_operators(r#"Gather{"inputs": {"0": ["float"], "1": ["int32_t", "int64_t"]}}, Relu,"#)
            .unwrap();
        assert_eq!(
            items,
            vec![
                (
                    "Gather",
                    Some(r#"{"inputs": {"0": ["float"], "1": ["int32_t", "int64_t"]}}"#)
                ),
                ("Relu", None),
            ]
        );
    }
}
