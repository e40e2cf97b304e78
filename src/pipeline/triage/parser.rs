use std::sync::LazyLock;

use regex::Regex;

use super::types::{push_unique, Flag, FlagTag, ParsedTriage, Urgency};

/// A labeled section of the generator's narrative output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Summary,
    Findings,
    Flags,
    Urgency,
    Reasoning,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Summary,
        Section::Findings,
        Section::Flags,
        Section::Urgency,
        Section::Reasoning,
    ];

    fn from_header(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "summary" => Some(Self::Summary),
            "findings" => Some(Self::Findings),
            "flags" => Some(Self::Flags),
            "urgency" => Some(Self::Urgency),
            "reasoning" => Some(Self::Reasoning),
            _ => None,
        }
    }
}

/// Header at the start of a line, after optional list or markdown markers.
static LINE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t*#>\-\d.)]*\b(summary|findings|flags|urgency|reasoning)\s*:\**")
        .expect("Invalid line header regex")
});

/// Header anywhere in the text.
static INLINE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(summary|findings|flags|urgency|reasoning)\s*:\**")
        .expect("Invalid section header regex")
});

/// `[TAG] keyword` up to the next `[`, comma or line break.
static FLAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s*([A-Za-z_ \-]+?)\s*\]\s*([^\[,\r\n]*)").expect("Invalid flag regex")
});

static WORD_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+(?:-[A-Za-z]+)*").expect("Invalid token regex"));

static BLANK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("Invalid blank line regex"));

/// Glyphs treated as list markers in the findings section.
const MARKER_GLYPHS: &[char] = &['-', '*', '\u{2022}', '\u{2013}', '\u{00B7}', '>'];

#[derive(Debug, Clone, Copy)]
struct SectionSpan {
    section: Section,
    upper_case: bool,
    header_start: usize,
    content_start: usize,
}

fn scan_headers(re: &Regex, raw: &str) -> Vec<SectionSpan> {
    re.captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str();
            Some(SectionSpan {
                section: Section::from_header(name)?,
                upper_case: name.chars().all(|c| c.is_ascii_uppercase()),
                header_start: whole.start(),
                content_start: whole.end(),
            })
        })
        .collect()
}

/// Header positions in text order.
///
/// Line-anchored headers are authoritative, so prose like "red flags:" or
/// "asked about urgency:" inside a section never opens a new one. Inline
/// headers count only for sections with no line-anchored header, and only
/// when written in upper case (the single-line `SUMMARY: .. URGENCY: ..`
/// form). Text with no line-anchored header at all falls back to the
/// inline scan.
fn locate_sections(raw: &str) -> Vec<SectionSpan> {
    let mut spans = scan_headers(&LINE_HEADER_RE, raw);
    if spans.is_empty() {
        return scan_headers(&INLINE_HEADER_RE, raw);
    }

    let anchored: Vec<Section> = spans.iter().map(|s| s.section).collect();
    spans.extend(
        scan_headers(&INLINE_HEADER_RE, raw)
            .into_iter()
            .filter(|s| s.upper_case && !anchored.contains(&s.section)),
    );
    spans.sort_by_key(|s| s.header_start);
    spans
}

/// Content of every occurrence of `section`, in text order. Each runs to
/// the next recognized header or end of text.
pub fn section_texts(raw: &str, section: Section) -> Vec<&str> {
    let spans = locate_sections(raw);
    spans
        .iter()
        .enumerate()
        .filter(|(_, s)| s.section == section)
        .map(|(idx, s)| {
            let end = spans
                .get(idx + 1)
                .map(|next| next.header_start)
                .unwrap_or(raw.len());
            clean_section(&raw[s.content_start..end])
        })
        .collect()
}

/// Content of the first occurrence of `section`. `None` when the header is
/// absent.
pub fn section_text(raw: &str, section: Section) -> Option<&str> {
    section_texts(raw, section).into_iter().next()
}

/// Strip whitespace and the emphasis markers that open the next header.
fn clean_section(text: &str) -> &str {
    text.trim().trim_end_matches('*').trim_end()
}

/// Sections whose header does not appear in `raw`.
pub fn missing_sections(raw: &str) -> Vec<Section> {
    let present: Vec<Section> = locate_sections(raw).iter().map(|s| s.section).collect();
    Section::ALL
        .into_iter()
        .filter(|s| !present.contains(s))
        .collect()
}

// ── Per-section extraction ──────────────────────────────────

pub fn extract_summary(raw: &str) -> String {
    section_text(raw, Section::Summary)
        .unwrap_or_default()
        .to_string()
}

/// One finding per non-blank line; marker-only lines are dropped and a
/// leading marker glyph is removed from the rest.
pub fn extract_findings(raw: &str) -> Vec<String> {
    let Some(text) = section_text(raw, Section::Findings) else {
        return vec![];
    };

    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.chars().all(|c| MARKER_GLYPHS.contains(&c) || c.is_whitespace()) {
                return None;
            }
            let mut chars = line.chars();
            let stripped = match (chars.next(), chars.next()) {
                (Some(first), Some(second))
                    if MARKER_GLYPHS.contains(&first) && second.is_whitespace() =>
                {
                    line[first.len_utf8()..].trim_start()
                }
                _ => line,
            };
            Some(stripped.to_string())
        })
        .collect()
}

/// `[TAG] keyword` entries from the flags section. Unknown tags and empty
/// keywords are skipped; duplicate keywords keep their first tag.
pub fn extract_flags(raw: &str) -> Vec<Flag> {
    let Some(text) = section_text(raw, Section::Flags) else {
        return vec![];
    };

    let mut flags = Vec::new();
    for caps in FLAG_RE.captures_iter(text) {
        let (Some(tag), Some(keyword)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(tag) = FlagTag::from_label(tag.as_str()) else {
            continue;
        };
        let keyword = keyword.as_str().trim().trim_end_matches('.').trim();
        if keyword.is_empty() {
            continue;
        }
        push_unique(&mut flags, Flag::new(tag, keyword));
    }
    flags
}

/// First word token that is exactly a known label, trying each urgency
/// section in turn.
pub fn extract_urgency(raw: &str) -> Option<Urgency> {
    section_texts(raw, Section::Urgency).into_iter().find_map(|text| {
        WORD_TOKEN_RE
            .find_iter(text)
            .find_map(|token| Urgency::from_label(token.as_str()))
    })
}

/// Reasoning text up to the first blank line.
pub fn extract_reasoning(raw: &str) -> String {
    let Some(text) = section_text(raw, Section::Reasoning) else {
        return String::new();
    };
    let end = BLANK_LINE_RE.find(text).map(|m| m.start()).unwrap_or(text.len());
    text[..end].trim().to_string()
}

// ── Composition ─────────────────────────────────────────────

/// Parse the generator's narrative into typed fields.
///
/// Never fails: absent or malformed sections fall back to their defaults
/// (empty text, empty lists, `routine`).
pub fn parse_triage_response(raw: &str) -> ParsedTriage {
    let explicit_urgency = extract_urgency(raw);

    let parsed = ParsedTriage {
        summary: extract_summary(raw),
        findings: extract_findings(raw),
        flags: extract_flags(raw),
        urgency: explicit_urgency.unwrap_or_default(),
        reasoning: extract_reasoning(raw),
        urgency_explicit: explicit_urgency.is_some(),
    };

    let missing = missing_sections(raw);
    if !missing.is_empty() {
        tracing::warn!(
            missing = ?missing,
            response_len = raw.len(),
            "Generator output is missing sections"
        );
    }
    if !parsed.urgency_explicit {
        tracing::warn!("No parseable urgency in generator output, defaulting to routine");
    }
    tracing::debug!(
        urgency = %parsed.urgency,
        findings = parsed.findings.len(),
        flags = parsed.flags.len(),
        "Parsed generator output"
    );

    parsed
}
