use std::sync::LazyLock;

use regex::Regex;

use crate::model::{ExtractedIdentity, IdentityClaim, NameSource};

/// All tuning knobs for field matching in one place: the OCR confusable
/// table, fuzzy thresholds, and keyword lists. Matching logic reads these;
/// it owns no constants of its own.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Bidirectional letter/digit swaps OCR commonly makes.
    pub confusable_pairs: Vec<(char, char)>,
    /// Minimum fraction of a name token a fuzzy substring must cover.
    pub fuzzy_coverage: f32,
    /// Email local parts longer than this with no separator are treated as
    /// concatenated names and matched via the component scan instead.
    pub concat_min_len: usize,
    /// Document words shorter than this are ignored by the component scan.
    pub min_component_len: usize,
    /// Accepted components required for a concatenated-name match.
    pub min_components: usize,
    /// Institution/boilerplate words the component scan must skip.
    pub boilerplate: Vec<&'static str>,
    /// Keywords whose presence marks the expected institution.
    pub institution_keywords: Vec<&'static str>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            confusable_pairs: vec![('O', '0'), ('I', '1'), ('S', '5'), ('B', '8'), ('G', '6')],
            fuzzy_coverage: 0.80,
            concat_min_len: 10,
            min_component_len: 3,
            min_components: 2,
            boilerplate: vec![
                "THE",
                "AND",
                "STUDENT",
                "NUMBER",
                "NAME",
                "CARD",
                "SCHOOL",
                "YEAR",
                "COURSE",
                "SIGNATURE",
                "PRESIDENT",
                "REPUBLIC",
                "PHILIPPINES",
                "CITY",
                "PAMANTASAN",
                "LUNGSOD",
                "VALENZUELA",
                "UNIVERSITY",
                "COLLEGE",
            ],
            institution_keywords: vec![
                "PAMANTASAN NG LUNGSOD NG VALENZUELA",
                "PAMANTASAN",
                "UNIVERSITY",
                "COLLEGE",
                "PLV",
            ],
        }
    }
}

/// Ordered student-ID shapes. Guards on both sides keep a shorter shape from
/// firing inside a longer one (the regex crate has no lookaround), so the
/// listed order stays honest: first shape that matches cleanly wins.
static STUDENT_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:^|[^0-9-])(\d{2}-\d{4})(?:[^0-9-]|$)",
        r"(?:^|[^0-9-])(\d{4}-\d{4})(?:[^0-9-]|$)",
        r"(?:^|[^0-9-])(\d{8})(?:[^0-9-]|$)",
        r"(?:^|[^0-9-])(\d{2}-\d{4}-\d{2})(?:[^0-9-]|$)",
        r"(?:^|[^0-9-])(\d{2} \d{4})(?:[^0-9-]|$)",
        r"(?:^|[^0-9-])(\d{4} \d{4})(?:[^0-9-]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("student ID pattern must compile"))
    .collect()
});

/// Extracts candidate identity fields from OCR text and scores each against
/// the claim. Pure; never errors. Missing signals come back as `false`
/// matches, not failures.
pub fn extract(raw_text: &str, claim: &IdentityClaim, config: &MatchConfig) -> ExtractedIdentity {
    let upper = raw_text.to_uppercase();
    let normalized = normalize_text(&upper);

    let mut extracted = ExtractedIdentity::default();

    // Student ID: first shape hit in the raw (uppercased) text, compared by
    // digit stream only so document punctuation never affects the verdict.
    extracted.student_id = find_student_id(&upper);
    if let (Some(found), Some(claimed)) = (&extracted.student_id, &claim.student_id) {
        let found_digits = digit_stream(found);
        extracted.matches.student_id = !found_digits.is_empty() && found_digits == digit_stream(claimed);
    }

    // Name: resolve the candidate from the claim, then require every token
    // to appear in the document text.
    if let Some((candidate, source)) = resolve_candidate_name(claim) {
        extracted.matches.name = name_matches(&normalized, &candidate, source, config);
        extracted.name = Some(candidate);
        extracted.name_source = Some(source);
    }

    // Institution marker: any configured keyword, recording which one.
    extracted.institution = config
        .institution_keywords
        .iter()
        .find(|kw| normalized.contains(*kw))
        .map(|kw| kw.to_string());
    extracted.matches.institution = extracted.institution.is_some();

    extracted
}

/// Uppercased input stripped to `[A-Z0-9 ]` with whitespace collapsed.
fn normalize_text(upper: &str) -> String {
    let mapped: String = upper
        .chars()
        .map(|c| if c.is_ascii_uppercase() || c.is_ascii_digit() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn digit_stream(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn find_student_id(upper: &str) -> Option<String> {
    for pattern in STUDENT_ID_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(upper) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Builds the candidate name to match, preferring the email local part over
/// the free-text declared name: users pick display names, not their
/// institutional email addresses.
pub fn resolve_candidate_name(claim: &IdentityClaim) -> Option<(String, NameSource)> {
    if let Some(email) = &claim.email {
        let local = email.split('@').next().unwrap_or("");
        if !local.is_empty() {
            let segments: Vec<&str> = local
                .split(['.', '_'])
                .filter(|s| !s.is_empty())
                .collect();
            if segments.len() > 1 {
                let name = segments
                    .iter()
                    .map(|s| title_case(s))
                    .collect::<Vec<_>>()
                    .join(" ");
                return Some((name, NameSource::EmailDerived));
            }
            if !segments.is_empty() {
                return Some((title_case(segments[0]), NameSource::EmailDerived));
            }
        }
    }

    claim
        .declared_full_name
        .as_deref()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(|n| (n.to_string(), NameSource::ClaimName))
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Requires ALL candidate tokens to be found in the text (a deliberate
/// strictness: partial-name hits must not feed auto-approval). A single long
/// email-derived token goes through the concatenated-name scan instead,
/// since `josephvenedicttillo` never appears verbatim on a card.
fn name_matches(normalized: &str, candidate: &str, source: NameSource, config: &MatchConfig) -> bool {
    let tokens: Vec<String> = candidate
        .to_uppercase()
        .split_whitespace()
        .map(|t| t.to_string())
        .collect();
    if tokens.is_empty() {
        return false;
    }

    if tokens.len() == 1
        && source == NameSource::EmailDerived
        && tokens[0].len() > config.concat_min_len
    {
        return concatenated_name_matches(normalized, &tokens[0], config);
    }

    tokens.iter().all(|token| token_matches(normalized, token, config))
}

/// Three strategies per token, first hit wins: exact substring, substring
/// after OCR-confusable canonicalization, then a contiguous fuzzy window
/// covering at least `fuzzy_coverage` of the token.
fn token_matches(normalized: &str, token: &str, config: &MatchConfig) -> bool {
    if normalized.contains(token) {
        return true;
    }

    let canon_text = canonicalize_confusables(normalized, config);
    let canon_token = canonicalize_confusables(token, config);
    if canon_text.contains(&canon_token) {
        return true;
    }

    fuzzy_window_match(normalized, token, config.fuzzy_coverage)
}

/// Folds each confusable pair onto its letter form so `J0SE` and `JOSE`
/// compare equal in either direction.
fn canonicalize_confusables(s: &str, config: &MatchConfig) -> String {
    s.chars()
        .map(|c| {
            for &(letter, digit) in &config.confusable_pairs {
                if c == digit {
                    return letter;
                }
            }
            c
        })
        .collect()
}

/// Any contiguous substring of the token covering at least `coverage` of its
/// length that appears verbatim in the text counts as a hit.
fn fuzzy_window_match(normalized: &str, token: &str, coverage: f32) -> bool {
    let chars: Vec<char> = token.chars().collect();
    let min_len = ((chars.len() as f32) * coverage).ceil() as usize;
    if min_len == 0 || min_len > chars.len() {
        return false;
    }

    for window_len in (min_len..=chars.len()).rev() {
        for start in 0..=(chars.len() - window_len) {
            let window: String = chars[start..start + window_len].iter().collect();
            if normalized.contains(&window) {
                return true;
            }
        }
    }
    false
}

/// Component scan for concatenated email local parts: accept document words
/// that plausibly belong to the run-together name and require at least
/// `min_components` distinct ones. The same fragment printed twice is one
/// component, not two; the whole point of the rule is corroboration from
/// different parts of the name.
fn concatenated_name_matches(normalized: &str, concat: &str, config: &MatchConfig) -> bool {
    let mut accepted: Vec<&str> = Vec::new();

    for word in normalized.split_whitespace() {
        if word.len() < config.min_component_len {
            continue;
        }
        if config.boilerplate.iter().any(|b| *b == word) {
            continue;
        }
        if !word.chars().all(|c| c.is_ascii_uppercase()) {
            continue;
        }
        if accepted.contains(&word) {
            continue;
        }

        let component = concat.contains(word)
            || word.contains(concat)
            || prefix_aligns(concat, word);

        if component {
            accepted.push(word);
            if accepted.len() >= config.min_components {
                return true;
            }
        }
    }

    false
}

/// A word's first 3–4 characters lining up with the start of the
/// concatenated token is enough to count it (covers OCR-mangled endings).
fn prefix_aligns(concat: &str, word: &str) -> bool {
    for take in [4usize, 3] {
        if word.len() >= take && concat.starts_with(&word[..take]) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(email: Option<&str>, name: Option<&str>, student_id: Option<&str>) -> IdentityClaim {
        IdentityClaim {
            email: email.map(str::to_string),
            declared_full_name: name.map(str::to_string),
            student_id: student_id.map(str::to_string),
        }
    }

    fn cfg() -> MatchConfig {
        MatchConfig::default()
    }

    #[test]
    fn test_dotted_email_derives_title_cased_name() {
        let c = claim(Some("juan.dela.cruz@plv.edu.ph"), None, None);
        let (name, source) = resolve_candidate_name(&c).unwrap();
        assert_eq!(name, "Juan Dela Cruz");
        assert_eq!(source, NameSource::EmailDerived);
    }

    #[test]
    fn test_underscore_email_also_splits() {
        let c = claim(Some("maria_santos@plv.edu.ph"), None, None);
        let (name, source) = resolve_candidate_name(&c).unwrap();
        assert_eq!(name, "Maria Santos");
        assert_eq!(source, NameSource::EmailDerived);
    }

    #[test]
    fn test_plain_local_part_is_single_token() {
        let c = claim(Some("jsantos@plv.edu.ph"), Some("Jose Santos"), None);
        let (name, source) = resolve_candidate_name(&c).unwrap();
        // Email wins over declared name even undelimited.
        assert_eq!(name, "Jsantos");
        assert_eq!(source, NameSource::EmailDerived);
    }

    #[test]
    fn test_declared_name_fallback_without_email() {
        let c = claim(None, Some("Juan Dela Cruz"), None);
        let (name, source) = resolve_candidate_name(&c).unwrap();
        assert_eq!(name, "Juan Dela Cruz");
        assert_eq!(source, NameSource::ClaimName);
    }

    #[test]
    fn test_no_resolvable_name_skips_matching() {
        let c = claim(None, None, Some("21-1234"));
        let result = extract("JUAN DELA CRUZ 21-1234", &c, &cfg());
        assert!(result.name.is_none());
        assert!(!result.matches.name, "skipped, not matched");
        assert!(result.matches.student_id, "other fields still score");
    }

    #[test]
    fn test_student_id_digit_stream_ignores_punctuation() {
        let c = claim(None, None, Some("21-1234"));

        for doc_form in ["21-1234", "21 1234", "21123400"] {
            let text = format!("STUDENT NO {doc_form} ISSUED 2023");
            let result = extract(&text, &c, &cfg());
            if doc_form == "21123400" {
                // Extra digits change the stream: must not match.
                assert!(!result.matches.student_id, "{doc_form} should not match");
            } else {
                assert!(result.matches.student_id, "{doc_form} should match");
            }
        }
    }

    #[test]
    fn test_student_id_longer_shape_not_shadowed() {
        let c = claim(None, None, Some("21-1234-56"));
        let result = extract("ID 21-1234-56", &c, &cfg());
        assert_eq!(result.student_id.as_deref(), Some("21-1234-56"));
        assert!(result.matches.student_id);
    }

    #[test]
    fn test_student_id_eight_digit_run() {
        let c = claim(None, None, Some("2021-1234"));
        let result = extract("NO 20211234", &c, &cfg());
        assert_eq!(result.student_id.as_deref(), Some("20211234"));
        assert!(result.matches.student_id);
    }

    #[test]
    fn test_student_id_absent_from_document() {
        let c = claim(None, None, Some("21-1234"));
        let result = extract("JUAN DELA CRUZ PAMANTASAN", &c, &cfg());
        assert!(result.student_id.is_none());
        assert!(!result.matches.student_id);
    }

    #[test]
    fn test_name_requires_every_token() {
        let c = claim(Some("juan.dela.cruz@plv.edu.ph"), None, None);

        let all = extract("JUAN DELA CRUZ 21-1234", &c, &cfg());
        assert!(all.matches.name);

        let partial = extract("JUAN CRUZ 21-1234", &c, &cfg());
        assert!(!partial.matches.name, "missing middle token must fail");
    }

    #[test]
    fn test_name_token_matches_through_confusables() {
        let c = claim(Some("jose.rizal@plv.edu.ph"), None, None);
        // OCR read O as 0 and I as 1.
        let result = extract("J0SE R1ZAL", &c, &cfg());
        assert!(result.matches.name);
    }

    #[test]
    fn test_name_token_matches_through_fuzzy_window() {
        let c = claim(Some("maria.santos@plv.edu.ph"), None, None);
        // SANTOS lost its final glyph; SANTO covers 5/6 >= 80%.
        let result = extract("MARIA SANTO? 21-1234", &c, &cfg());
        assert!(result.matches.name);
    }

    #[test]
    fn test_fuzzy_window_below_coverage_fails() {
        let c = claim(Some("maria.santos@plv.edu.ph"), None, None);
        // SANT covers only 4/6 of SANTOS.
        let result = extract("MARIA SANT", &c, &cfg());
        assert!(!result.matches.name);
    }

    #[test]
    fn test_concatenated_email_matches_via_components() {
        let c = claim(Some("josephvenedicttillo@plv.edu.ph"), None, None);
        let result = extract("VENEDICT TILLO 21-5678 PAMANTASAN", &c, &cfg());
        assert!(result.matches.name, "two accepted components suffice");
    }

    #[test]
    fn test_concatenated_email_single_component_insufficient() {
        let c = claim(Some("josephvenedicttillo@plv.edu.ph"), None, None);
        let result = extract("VENEDICT 21-5678", &c, &cfg());
        assert!(!result.matches.name);
    }

    #[test]
    fn test_concatenated_repeated_word_counts_once() {
        let c = claim(Some("josephvenedicttillo@plv.edu.ph"), None, None);
        // One fragment printed twice is still a single component.
        let result = extract("TILLO TILLO", &c, &cfg());
        assert!(!result.matches.name);

        let distinct = extract("TILLO TILLO VENEDICT", &c, &cfg());
        assert!(distinct.matches.name, "two distinct components still match");
    }

    #[test]
    fn test_concatenated_scan_skips_boilerplate() {
        let c = claim(Some("josephvenedicttillo@plv.edu.ph"), None, None);
        // UNIVERSITY/COLLEGE are denylisted even if they substring-align.
        let result = extract("UNIVERSITY COLLEGE STUDENT", &c, &cfg());
        assert!(!result.matches.name);
    }

    #[test]
    fn test_institution_records_which_keyword() {
        let c = claim(Some("a.b@plv.edu.ph"), None, None);
        let result = extract("PAMANTASAN NG LUNGSOD NG VALENZUELA", &c, &cfg());
        assert!(result.matches.institution);
        assert_eq!(
            result.institution.as_deref(),
            Some("PAMANTASAN NG LUNGSOD NG VALENZUELA")
        );
    }

    #[test]
    fn test_institution_absent() {
        let c = claim(Some("a.b@plv.edu.ph"), None, None);
        let result = extract("SOME OTHER TEXT", &c, &cfg());
        assert!(!result.matches.institution);
        assert!(result.institution.is_none());
    }

    #[test]
    fn test_normalize_strips_punctuation_and_collapses() {
        assert_eq!(
            normalize_text("JUAN, DELA-CRUZ:  NO. 21"),
            "JUAN DELA CRUZ NO 21"
        );
    }
}
