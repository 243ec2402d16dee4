use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_HEADER_RE: Regex =
        Regex::new(r"(?i)(?:To|From|Bcc|Cc|Reply-To|Sender):").unwrap();
    // Matches both literal and entity-encoded angle brackets so that
    // pre-escaped payloads cannot smuggle a script block through. `.` does
    // not cross newlines, so the opening and closing tags must share a line.
    static ref SCRIPT_RE: Regex = Regex::new(
        r"(?i)(?:<|&lt;)\s*script\s*(?:>|&gt;).*?(?:<|&lt;)\s*/\s*script\s*(?:>|&gt;)"
    )
    .unwrap();
}

/// Delete case-insensitive `To:` / `From:` / `Bcc:` / `Cc:` / `Reply-To:` /
/// `Sender:` tokens. Form values end up inside outbound emails, so any of
/// these surviving is an SMTP header injection vector.
pub fn remove_email_headers(s: &str) -> String {
    EMAIL_HEADER_RE.replace_all(s, "").to_string()
}

/// Delete `<script>...</script>` blocks, tags and contents both.
pub fn remove_script_tags_and_contents(s: &str) -> String {
    SCRIPT_RE.replace_all(s, "").to_string()
}

pub fn escape_html(s: &str) -> String {
    tera::escape_html(s)
}

/// The full sanitization pipeline, in load-bearing order: trim, strip header
/// tokens, strip script blocks, then HTML-escape. Script removal has to run
/// before escaping or the escaped tags would survive as text. The first three
/// passes are idempotent; HTML-escaping is not (an already-escaped `&amp;`
/// becomes `&amp;amp;`), so values must pass through here exactly once.
pub fn sanitize(raw: &str) -> String {
    let s = raw.trim();
    let s = remove_email_headers(s);
    let s = remove_script_tags_and_contents(&s);
    escape_html(&s)
}
