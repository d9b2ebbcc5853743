//! Incremental parsing of response header lines.

/// Status and the headers the transfer engine acts on, for the current response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    pub(crate) status: Option<u32>,
    pub(crate) location: Option<String>,
    pub(crate) content_length: Option<u64>,
}

impl ResponseHead {
    /// Feed one raw header line as delivered by curl. A status line starts a
    /// new response (e.g. after `100 Continue`), so previous fields are reset.
    pub(crate) fn feed(&mut self, raw: &[u8]) {
        let Ok(line) = std::str::from_utf8(raw) else {
            return;
        };
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if line.starts_with("HTTP/") {
            *self = ResponseHead {
                status: parse_status_line(line),
                ..ResponseHead::default()
            };
            return;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("location") && !value.is_empty() {
                self.location = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("content-length") {
                self.content_length = value.parse::<u64>().ok();
            }
        }
    }
}

fn parse_status_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Status codes that carry a `Location` to follow.
pub(crate) fn is_redirect(code: u32) -> bool {
    matches!(code, 301 | 302 | 303 | 307 | 308)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &[&str]) -> ResponseHead {
        let mut head = ResponseHead::default();
        for l in lines {
            head.feed(format!("{l}\r\n").as_bytes());
        }
        head
    }

    #[test]
    fn status_length_and_location() {
        let head = parse(&[
            "HTTP/1.1 302 Found",
            "Location: /next/file.bin",
            "content-length: 0",
            "",
        ]);
        assert_eq!(head.status, Some(302));
        assert_eq!(head.location.as_deref(), Some("/next/file.bin"));
        assert_eq!(head.content_length, Some(0));
    }

    #[test]
    fn new_status_line_resets_previous_response() {
        let head = parse(&[
            "HTTP/1.1 100 Continue",
            "Location: stale",
            "",
            "HTTP/2 200",
            "Content-Length: 12345",
        ]);
        assert_eq!(head.status, Some(200));
        assert!(head.location.is_none());
        assert_eq!(head.content_length, Some(12345));
    }

    #[test]
    fn missing_or_bad_length_is_unknown() {
        let head = parse(&["HTTP/1.1 200 OK", "Content-Length: lots"]);
        assert_eq!(head.content_length, None);
        let head = parse(&["HTTP/1.1 200 OK", "Transfer-Encoding: chunked"]);
        assert_eq!(head.content_length, None);
    }

    #[test]
    fn redirect_codes() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_redirect(code));
        }
        assert!(!is_redirect(200));
        assert!(!is_redirect(304));
        assert!(!is_redirect(404));
    }
}
