use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://\S+").expect("failed to compile URL pattern"));

/// Uppercase messages longer than this get normalized to lowercase.
const CAPS_MIN_CHARS: usize = 10;
/// Messages with more emoji scalars than this get all emoji stripped.
const EMOJI_MAX: usize = 10;

/// Stateless text transform applied to every chat message before it is
/// persisted or fanned out. The original text is not retained.
pub struct ContentFilter {
    blocked: Option<Regex>,
}

impl ContentFilter {
    pub fn new(blocked_terms: &[String]) -> Self {
        let terms: Vec<String> = blocked_terms
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| regex::escape(t.trim()))
            .collect();

        let blocked = if terms.is_empty() {
            None
        } else {
            Regex::new(&format!("(?i)({})", terms.join("|"))).ok()
        };

        Self { blocked }
    }

    /// Masking, URL redaction, caps normalization, then emoji stripping.
    /// The order is load-bearing: clients and storage both see the result.
    pub fn apply(&self, text: &str) -> String {
        let mut out = match &self.blocked {
            Some(re) => re
                .replace_all(text, |caps: &regex::Captures<'_>| {
                    "*".repeat(caps[0].chars().count())
                })
                .into_owned(),
            None => text.to_string(),
        };

        out = URL_RE.replace_all(&out, "[URL]").into_owned();

        if out.chars().count() > CAPS_MIN_CHARS && out == out.to_uppercase() {
            out = out.to_lowercase();
        }

        if out.chars().filter(|c| is_emoji(*c)).count() > EMOJI_MAX {
            out = out.chars().filter(|c| !is_emoji(*c)).collect();
        }

        out
    }
}

fn is_emoji(c: char) -> bool {
    matches!(u32::from(c),
        0x1F1E6..=0x1F1FF   // regional indicators
        | 0x1F300..=0x1F5FF // symbols & pictographs
        | 0x1F600..=0x1F64F // emoticons
        | 0x1F680..=0x1F6FF // transport
        | 0x1F900..=0x1F9FF // supplemental symbols
        | 0x1FA70..=0x1FAFF // extended pictographs
        | 0x2600..=0x26FF   // misc symbols
        | 0x2700..=0x27BF   // dingbats
        | 0x2B00..=0x2BFF   // arrows & stars
        | 0xFE0F            // variation selector-16
        | 0x200D            // zero-width joiner
    )
}
